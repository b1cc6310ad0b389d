use anyhow::Result;
use colored::*;
use crmql::{Record, Value};
use prettytable::{Cell, Row, Table};

use crate::formatters::Formatter;

/// Longueur maximale d'une cellule
const MAX_CELL: usize = 50;

/// Formateur au format tableau
pub struct TableFormatter {
    /// Indique si les couleurs sont activées
    colored: bool,
}

impl TableFormatter {
    /// Crée un nouveau formateur tableau
    pub fn new(colored: bool) -> Self {
        TableFormatter { colored }
    }
}

/// Colonnes dans l'ordre de première apparition
fn columns(rows: &[Record]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for key in rows.iter().flat_map(|row| row.keys()) {
        if !columns.contains(&key.as_str()) {
            columns.push(key);
        }
    }
    columns
}

fn cell_text(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => return "NULL".to_string(),
        Some(v) => v.as_text(),
    };
    // Tronquer les chaînes longues
    if text.chars().count() > MAX_CELL {
        let cut: String = text.chars().take(MAX_CELL - 3).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

impl Formatter for TableFormatter {
    fn format_rows(&self, rows: &[Record]) -> Result<String> {
        if rows.is_empty() {
            return Ok("(aucune ligne)".to_string());
        }

        let columns = columns(rows);
        let mut table = Table::new();

        // En-têtes
        table.set_titles(Row::new(columns.iter().map(|c| Cell::new(c)).collect()));

        for row in rows {
            table.add_row(Row::new(
                columns.iter().map(|c| Cell::new(&cell_text(row.get(*c)))).collect(),
            ));
        }

        Ok(table.to_string())
    }

    fn format_tables(&self, tables: &[(String, usize)]) -> Result<String> {
        let mut table = Table::new();

        table.set_titles(Row::new(vec![Cell::new("Table"), Cell::new("Lignes")]));
        for (name, rows) in tables {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&rows.to_string())]));
        }

        Ok(table.to_string())
    }

    fn format_error(&self, error: &str) -> String {
        if self.colored {
            format!("{}", error.red().bold())
        } else {
            format!("Erreur: {}", error)
        }
    }

    fn format_info(&self, info: &str) -> String {
        if self.colored {
            format!("{}", info.blue())
        } else {
            format!("Info: {}", info)
        }
    }

    fn format_success(&self, success: &str) -> String {
        if self.colored {
            format!("{}", success.green().bold())
        } else {
            format!("Succès: {}", success)
        }
    }
}
