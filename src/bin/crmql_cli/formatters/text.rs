use anyhow::Result;
use colored::*;
use crmql::{Record, Value};

use crate::formatters::Formatter;

/// Formateur au format texte
pub struct TextFormatter {
    /// Indique si les couleurs sont activées
    colored: bool,
}

impl TextFormatter {
    /// Crée un nouveau formateur texte
    pub fn new(colored: bool) -> Self {
        TextFormatter { colored }
    }

    fn key(&self, key: &str) -> String {
        if self.colored {
            key.cyan().to_string()
        } else {
            key.to_string()
        }
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Formatter for TextFormatter {
    fn format_rows(&self, rows: &[Record]) -> Result<String> {
        if rows.is_empty() {
            return Ok("(aucune ligne)".to_string());
        }

        let blocks: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let fields: Vec<String> = row
                    .iter()
                    .map(|(k, v)| format!("  {}: {}", self.key(k), display(v)))
                    .collect();
                format!("[{}]\n{}", i + 1, fields.join("\n"))
            })
            .collect();

        Ok(format!("{}\n({} ligne(s))", blocks.join("\n"), rows.len()))
    }

    fn format_tables(&self, tables: &[(String, usize)]) -> Result<String> {
        let width = tables.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        let lines: Vec<String> = tables
            .iter()
            .map(|(name, rows)| format!("{:<width$}  {}", self.key(name), rows, width = width))
            .collect();
        Ok(lines.join("\n"))
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
