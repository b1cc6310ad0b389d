//! crmql: a query-string interpreter over a JSON document
//!
//! This crate evaluates the SQL-like statements a CRM backend issues
//! (inserts, updates, deletes and a fixed set of select shapes) directly
//! against in-memory tables loaded from a single JSON file. There is no
//! planner and no index; every statement is tokenized, classified and
//! evaluated with linear scans.
//!
//! ```no_run
//! use crmql::{Database, Value};
//!
//! let mut db = Database::open("crm-data.json")?;
//! db.execute(
//!     "INSERT INTO leads (id, name, status) VALUES (?, ?, ?)",
//!     &[Value::from("l1"), Value::from("Acme"), Value::from("New")],
//! )?;
//! let open = db.prepare("SELECT COUNT(*) as n FROM leads WHERE status = ?").get(&["New".into()])?;
//! println!("{:?}", open);
//! db.close()?;
//! # Ok::<(), crmql::StoreError>(())
//! ```

pub mod config;
pub mod core;
pub mod ql;
pub mod seed;
pub mod server;
pub mod storage;

use std::path::PathBuf;

use log::debug;

use crate::core::store::Store;
use crate::storage::{JsonFileStore, MemoryStore};

/// Main API for a crmql database
pub struct Database {
    store: Box<dyn Store>,
    config: DatabaseConfig,
}

impl Database {
    /// Open the JSON file database at the given path with the default configuration
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        Self::open_with_config(path, DatabaseConfig::default())
    }

    /// Open the JSON file database at the given path
    pub fn open_with_config<P: Into<PathBuf>>(path: P, config: DatabaseConfig) -> Result<Self> {
        let store = JsonFileStore::open_with_config(path, &config)?;
        Ok(Self::from_store(Box::new(store), config))
    }

    /// Create a new in-memory database instance
    pub fn new_in_memory() -> Self {
        Self::from_store(Box::new(MemoryStore::new()), DatabaseConfig::default())
    }

    /// Wrap an existing store
    pub fn from_store(store: Box<dyn Store>, config: DatabaseConfig) -> Self {
        Database { store, config }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Execute a statement with positional parameters
    ///
    /// Reads return their rows, writes an empty list.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        ql::execute(self.store.as_mut(), sql, params, &self.config)
    }

    /// Prepare a statement for repeated execution
    pub fn prepare(&mut self, sql: &str) -> Statement<'_> {
        Statement {
            database: self,
            sql: sql.to_string(),
        }
    }

    /// Accept a schema script
    ///
    /// Tables are implied by the document, so this only schedules a save.
    pub fn exec(&mut self, script: &str) -> Result<()> {
        debug!("Schema script ignored ({} bytes)", script.len());
        self.store.save()
    }

    /// The current in-memory document
    pub fn document(&self) -> &Document {
        self.store.document()
    }

    /// Write pending changes now
    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }

    /// Flush and release the database
    pub fn close(mut self) -> Result<()> {
        self.store.flush()
    }

    /// Get save statistics (only available for the JSON file store)
    pub fn save_stats(&self) -> Option<SaveStats> {
        self.store
            .as_any()
            .downcast_ref::<JsonFileStore>()
            .map(JsonFileStore::save_stats)
    }
}

/// A prepared statement bound to a database
pub struct Statement<'a> {
    database: &'a mut Database,
    sql: String,
}

impl Statement<'_> {
    /// The statement text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Execute, discarding any rows
    pub fn run(&mut self, params: &[Value]) -> Result<()> {
        self.database.execute(&self.sql, params).map(|_| ())
    }

    /// Execute and return the first row
    pub fn get(&mut self, params: &[Value]) -> Result<Option<Record>> {
        Ok(self.database.execute(&self.sql, params)?.into_iter().next())
    }

    /// Execute and return every row
    pub fn all(&mut self, params: &[Value]) -> Result<Vec<Record>> {
        self.database.execute(&self.sql, params)
    }
}

pub use crate::config::{DatabaseConfig, WhereMode};
pub use crate::core::document::{now_iso, Document, Record};
pub use crate::core::errors::{Result, StoreError};
pub use crate::core::table::Table;
pub use crate::core::value::Value;
pub use crate::storage::SaveStats;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prepared_statement_surface() {
        let mut db = Database::new_in_memory();
        {
            let mut insert = db.prepare("INSERT INTO accounts (id, name) VALUES (?, ?)");
            insert.run(&["a1".into(), "Acme".into()]).unwrap();
            insert.run(&["a2".into(), "Bluth".into()]).unwrap();
        }

        let first = db
            .prepare("SELECT * FROM accounts WHERE id = ?")
            .get(&["a2".into()])
            .unwrap()
            .unwrap();
        assert_eq!(first["name"], Value::from("Bluth"));

        let none = db.prepare("SELECT * FROM accounts WHERE id = ?").get(&["zz".into()]).unwrap();
        assert!(none.is_none());

        let all = db.prepare("SELECT * FROM accounts ORDER BY name DESC").all(&[]).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["id"], Value::from("a2"));
    }

    #[test]
    fn test_exec_is_accepted() {
        let mut db = Database::new_in_memory();
        db.exec("CREATE TABLE IF NOT EXISTS leads (id TEXT PRIMARY KEY);").unwrap();
        assert_eq!(db.document().total_rows(), 0);
        assert!(db.save_stats().is_none());
    }

    #[test]
    fn test_close_persists_last_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");
        let config = DatabaseConfig {
            save_debounce_ms: 60_000,
            ..DatabaseConfig::default()
        };

        let mut db = Database::open_with_config(&path, config.clone()).unwrap();
        db.execute("INSERT INTO payments (id, amount) VALUES (?, ?)", &["p1".into(), 250.into()])
            .unwrap();
        assert!(db.save_stats().is_some());
        db.close().unwrap();

        let mut db = Database::open_with_config(&path, config).unwrap();
        let rows = db
            .execute("SELECT COALESCE(SUM(amount), 0) as total FROM payments", &[])
            .unwrap();
        assert_eq!(rows[0]["total"], Value::Integer(250));
    }

    #[tokio::test]
    async fn test_close_inside_async_runtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crm-data.json");

        let mut db = Database::open(&path).unwrap();
        db.execute("INSERT INTO users (id, name) VALUES (?, ?)", &["u1".into(), "Admin".into()])
            .unwrap();
        db.flush().unwrap();
        db.close().unwrap();

        let reloaded = Database::open(&path).unwrap();
        assert_eq!(reloaded.document().rows("users").len(), 1);
    }

    #[test]
    fn test_independent_databases() {
        let mut a = Database::new_in_memory();
        let b = Database::new_in_memory();
        a.execute("INSERT INTO users (id) VALUES (?)", &["u1".into()]).unwrap();
        assert_eq!(a.document().rows("users").len(), 1);
        assert!(b.document().rows("users").is_empty());
    }
}
