use anyhow::Result;
use crmql::Record;

/// Trait définissant un formateur de sortie
pub trait Formatter {
    /// Formate les lignes renvoyées par une lecture
    fn format_rows(&self, rows: &[Record]) -> Result<String>;

    /// Formate le nombre de lignes par table
    fn format_tables(&self, tables: &[(String, usize)]) -> Result<String>;

    /// Formate un message d'erreur
    fn format_error(&self, error: &str) -> String;

    /// Formate un message d'information
    fn format_info(&self, info: &str) -> String;

    /// Formate un message de succès
    fn format_success(&self, success: &str) -> String;
}
