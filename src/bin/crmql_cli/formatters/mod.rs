pub mod formatter;
pub mod json;
pub mod table;
pub mod text;

use clap::ValueEnum;
pub use formatter::Formatter;

/// Formats de sortie disponibles
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Format texte
    Text,

    /// Format JSON
    Json,

    /// Format tableau
    Table,
}
