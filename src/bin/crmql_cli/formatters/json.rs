use anyhow::Result;
use crmql::Record;
use serde::Serialize;
use serde_json::json;

use crate::formatters::Formatter;

/// Formateur au format JSON
pub struct JsonFormatter {
    /// Indique si l'indentation est activée
    pretty: bool,
}

impl JsonFormatter {
    /// Crée un nouveau formateur JSON
    pub fn new() -> Self {
        JsonFormatter { pretty: true }
    }

    fn render<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }

    fn message(&self, key: &str, text: &str) -> String {
        self.render(&json!({ key: text }))
            .unwrap_or_else(|_| format!("{{\"{}\":\"{}\"}}", key, text))
    }
}

impl Formatter for JsonFormatter {
    fn format_rows(&self, rows: &[Record]) -> Result<String> {
        Ok(self.render(rows)?)
    }

    fn format_tables(&self, tables: &[(String, usize)]) -> Result<String> {
        let map: serde_json::Map<String, serde_json::Value> = tables
            .iter()
            .map(|(name, rows)| (name.clone(), json!(rows)))
            .collect();
        Ok(self.render(&map)?)
    }

    fn format_error(&self, error: &str) -> String {
        self.message("error", error)
    }

    fn format_info(&self, info: &str) -> String {
        self.message("info", info)
    }

    fn format_success(&self, success: &str) -> String {
        self.message("success", success)
    }
}
