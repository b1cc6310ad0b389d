//! In-memory store for crmql
//!
//! This module provides a document store without persistence,
//! used for tests and throwaway sessions.

use std::any::Any;

use crate::core::document::Document;
use crate::core::errors::Result;
use crate::core::store::Store;

/// An in-memory store for the database
#[derive(Debug)]
pub struct MemoryStore {
    /// The document
    document: Document,
    /// Number of save requests received
    saves: usize,
}

impl MemoryStore {
    /// Create a new store holding an empty document
    pub fn new() -> Self {
        MemoryStore {
            document: Document::new(),
            saves: 0,
        }
    }

    /// Create a store around an existing document
    pub fn with_document(mut document: Document) -> Self {
        document.ensure_tables();
        MemoryStore { document, saves: 0 }
    }

    /// Number of times persistence was requested
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn save(&mut self) -> Result<()> {
        // Nothing to persist
        self.saves += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Table;

    #[test]
    fn test_new_store_has_every_table() {
        let store = MemoryStore::new();
        for table in Table::ALL {
            assert!(store.document().has_table(table.name()));
        }
    }

    #[test]
    fn test_save_is_counted() {
        let mut store = MemoryStore::new();
        store.save().unwrap();
        store.save().unwrap();
        store.flush().unwrap();
        assert_eq!(store.saves(), 2);
    }

    #[test]
    fn test_with_document_fills_missing_tables() {
        let document: Document = serde_json::from_str(r#"{"leads": []}"#).unwrap();
        let store = MemoryStore::with_document(document);
        assert!(store.document().has_table("payments"));
    }
}
