//! Error types for crmql
//!
//! This module defines the various error types that can occur
//! while loading, querying and persisting the document.

use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Malformed statement: {0}")]
    MalformedStatement(String),

    #[error("Unsupported WHERE fragment: {0}")]
    UnsupportedPredicate(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

/// Result type for database operations
pub type Result<T> = std::result::Result<T, StoreError>;
