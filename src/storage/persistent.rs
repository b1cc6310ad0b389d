// src/storage/persistent.rs

use std::any::Any;
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::core::document::Document;
use crate::core::errors::{Result, StoreError};
use crate::core::store::Store;
use super::worker::{SaveStats, SaveWorker};

/// Read the document at `path`.
///
/// Returns `Ok(None)` when no file exists yet.
pub fn read_document(path: &Path) -> Result<Option<Document>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    // Tables are repaired while deserializing; only a non-object fails
    let document: Document = serde_json::from_str(&raw)
        .map_err(|e| StoreError::MalformedDocument(e.to_string()))?;
    Ok(Some(document))
}

/// Load the document at `path`, falling back to an empty one.
///
/// Read and parse failures are logged and never reach the caller.
pub fn load_document(path: &Path) -> Document {
    match read_document(path) {
        Ok(Some(document)) => document,
        Ok(None) => {
            info!("No document at {:?}, starting empty", path);
            Document::new()
        }
        Err(e) => {
            error!("Failed to load document from {:?}: {}", path, e);
            warn!("Starting from an empty document; the next save overwrites {:?}", path);
            Document::new()
        }
    }
}

/// A store persisting the whole document as one JSON file
pub struct JsonFileStore {
    /// Location of the JSON file
    path: PathBuf,
    /// The in-memory document
    document: Document,
    /// Debounced writer
    worker: SaveWorker,
}

impl JsonFileStore {
    /// Open a store at the given path with the default configuration
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        Self::open_with_config(path, &DatabaseConfig::default())
    }

    /// Open a store at the given path
    pub fn open_with_config<P: Into<PathBuf>>(path: P, config: &DatabaseConfig) -> Result<Self> {
        let path = path.into();
        let document = load_document(&path);
        let worker = SaveWorker::start(path.clone(), config.save_debounce(), config.pretty)?;

        let mut store = JsonFileStore {
            path,
            document,
            worker,
        };

        // The file exists, fully initialised, shortly after startup
        store.save()?;
        info!("JSON database ready at {:?}", store.path);

        Ok(store)
    }

    /// Location of the JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get save statistics
    pub fn save_stats(&self) -> SaveStats {
        self.worker.stats()
    }
}

impl Store for JsonFileStore {
    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn save(&mut self) -> Result<()> {
        self.worker.schedule(self.document.clone())
    }

    fn flush(&mut self) -> Result<()> {
        self.worker.flush()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::Record;
    use crate::core::table::Table;
    use crate::core::value::Value;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_starts_empty_and_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.document().total_rows(), 0);

        store.flush().unwrap();
        let reloaded = read_document(&path).unwrap().unwrap();
        for table in Table::ALL {
            assert!(reloaded.has_table(table.name()));
        }
    }

    #[test]
    fn test_malformed_file_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(read_document(&path), Err(StoreError::MalformedDocument(_))));

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.document(), &Document::new());
    }

    #[test]
    fn test_mutation_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            let mut record = Record::new();
            record.insert("id".to_string(), Value::from("u-1"));
            record.insert("name".to_string(), Value::from("Admin User"));
            store.document_mut().rows_mut(Table::Users).push(record);
            store.save().unwrap();
            // Dropped without an explicit flush
        }

        let store = JsonFileStore::open(&path).unwrap();
        let users = store.document().rows("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["name"], Value::from("Admin User"));
    }

    #[test]
    fn test_partial_document_gets_missing_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        std::fs::write(&path, r#"{"leads": [{"id": "l1", "value": 100}]}"#).unwrap();

        let document = load_document(&path);
        assert_eq!(document.rows("leads").len(), 1);
        assert!(document.has_table("email_triggers"));
    }

    #[test]
    fn test_null_table_does_not_wipe_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        std::fs::write(
            &path,
            r#"{"users": [{"id": "u1", "name": "Admin"}], "leads": null, "version": 2}"#,
        )
        .unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.document().rows("users").len(), 1);
        assert!(store.document().rows("leads").is_empty());
        store.flush().unwrap();

        let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["users"][0]["name"], "Admin");
        assert_eq!(on_disk["leads"], serde_json::json!([]));
        assert_eq!(on_disk["version"], 2);
    }

    #[test]
    fn test_non_object_document_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(matches!(read_document(&path), Err(StoreError::MalformedDocument(_))));
        assert_eq!(load_document(&path), Document::new());
    }

    #[test]
    fn test_save_stats_are_exposed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");

        let config = DatabaseConfig {
            save_debounce_ms: 60_000,
            ..DatabaseConfig::default()
        };
        let mut store = JsonFileStore::open_with_config(&path, &config).unwrap();
        store.save().unwrap();
        store.flush().unwrap();

        let stats = store.save_stats();
        assert_eq!(stats.snapshots, 2);
        assert_eq!(stats.writes, 1);
    }
}
