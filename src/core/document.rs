//! The persisted document: every table and its records.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use log::warn;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Map;

use super::table::Table;
use super::value::Value;

/// A flat record, field name to scalar, in insertion order
pub type Record = IndexMap<String, Value>;

/// Current time as an ISO-8601 UTC timestamp with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The whole dataset, one ordered sequence of records per table
///
/// Any top-level JSON object loads: known tables that are missing, null or
/// not arrays come back empty, and keys that are not tables are carried
/// through to the next save untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Map<String, serde_json::Value>")]
pub struct Document {
    tables: BTreeMap<String, Vec<Record>>,
    extras: BTreeMap<String, serde_json::Value>,
}

fn record_of(item: &serde_json::Value) -> Option<Record> {
    match item {
        serde_json::Value::Object(_) => serde_json::from_value(item.clone()).ok(),
        _ => None,
    }
}

impl From<Map<String, serde_json::Value>> for Document {
    fn from(object: Map<String, serde_json::Value>) -> Self {
        let mut document = Document::default();

        for (key, value) in object {
            let known = Table::ALL.iter().any(|t| t.name() == key);
            let rows: Option<Vec<Record>> = match &value {
                serde_json::Value::Array(items) => items.iter().map(record_of).collect(),
                _ => None,
            };

            match (rows, value) {
                (Some(rows), _) => {
                    document.tables.insert(key, rows);
                }
                (None, value) if !known => {
                    document.extras.insert(key, value);
                }
                (None, serde_json::Value::Array(items)) => {
                    warn!("Table {} holds non-object entries; keeping its records only", key);
                    let rows = items.iter().filter_map(record_of).collect();
                    document.tables.insert(key, rows);
                }
                (None, serde_json::Value::Null) => {
                    document.tables.insert(key, Vec::new());
                }
                (None, _) => {
                    warn!("Table {} is not an array; starting it empty", key);
                    document.tables.insert(key, Vec::new());
                }
            }
        }

        document.ensure_tables();
        document
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len() + self.extras.len()))?;
        for (name, rows) in &self.tables {
            map.serialize_entry(name, rows)?;
        }
        for (key, value) in &self.extras {
            if !self.tables.contains_key(key) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl Document {
    /// Create a document with every known table present and empty
    pub fn new() -> Self {
        let mut document = Document::default();
        document.ensure_tables();
        document
    }

    /// Add any missing table of the closed set. Returns true if one was added.
    pub fn ensure_tables(&mut self) -> bool {
        let mut added = false;
        for table in Table::ALL {
            if !self.tables.contains_key(table.name()) {
                self.tables.insert(table.name().to_string(), Vec::new());
                added = true;
            }
        }
        added
    }

    /// Records of a table by name; empty for tables the document lacks
    pub fn rows(&self, name: &str) -> &[Record] {
        self.tables
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mutable records of a known table
    pub fn rows_mut(&mut self, table: Table) -> &mut Vec<Record> {
        self.tables.entry(table.name().to_string()).or_default()
    }

    /// Check if the document carries a table of that name
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_ascii_lowercase())
    }

    /// Row count per table, in key order
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.clone(), rows.len()))
            .collect()
    }

    /// Non-table value stored under a top-level key
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extras.get(key)
    }

    /// Total number of records across all tables
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_every_table() {
        let document = Document::new();
        for table in Table::ALL {
            assert!(document.has_table(table.name()));
            assert!(document.rows(table.name()).is_empty());
        }
        assert_eq!(document.total_rows(), 0);
    }

    #[test]
    fn test_ensure_tables_fills_gaps_and_keeps_extras() {
        let mut empty = Document::default();
        assert!(empty.ensure_tables());
        assert!(!empty.ensure_tables());

        let mut document: Document =
            serde_json::from_str(r#"{"leads": [{"id": "l1"}], "legacy": []}"#).unwrap();
        assert!(!document.ensure_tables());

        assert_eq!(document.rows("leads").len(), 1);
        assert!(document.has_table("users"));
        assert!(document.has_table("legacy"));
    }

    #[test]
    fn test_null_and_scalar_tables_are_repaired() {
        let document: Document = serde_json::from_str(
            r#"{"users": [{"id": "u1", "name": "Admin"}], "leads": null, "tasks": 3}"#,
        )
        .unwrap();

        assert_eq!(document.rows("users").len(), 1);
        assert!(document.has_table("leads"));
        assert!(document.rows("leads").is_empty());
        assert!(document.rows("tasks").is_empty());
        assert!(document.has_table("payments"));
    }

    #[test]
    fn test_non_table_keys_survive_a_round_trip() {
        let document: Document =
            serde_json::from_str(r#"{"users": [{"id": "u1"}], "version": 2, "tags": ["a", "b"]}"#).unwrap();
        assert_eq!(document.rows("users").len(), 1);
        assert_eq!(document.extra("version"), Some(&serde_json::json!(2)));
        assert!(!document.has_table("tags"));

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["version"], 2);
        assert_eq!(json["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(json["users"][0]["id"], "u1");
    }

    #[test]
    fn test_stray_entries_in_a_table_are_dropped() {
        let document: Document =
            serde_json::from_str(r#"{"leads": [{"id": "l1"}, 7, null, {"id": "l2"}]}"#).unwrap();
        let ids: Vec<_> = document.rows("leads").iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![Value::from("l1"), Value::from("l2")]);
    }

    #[test]
    fn test_record_fields_keep_insertion_order() {
        let document: Document =
            serde_json::from_str(r#"{"users": [{"name": "Admin", "id": "u1", "email": "a@b.c"}]}"#).unwrap();
        let keys: Vec<&str> = document.rows("users")[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "id", "email"]);

        let text = serde_json::to_string(&document).unwrap();
        let name = text.find("\"name\"").unwrap();
        let email = text.find("\"email\"").unwrap();
        assert!(name < email);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut document = Document::new();
        let mut record = Record::new();
        record.insert("id".to_string(), Value::from("u1"));
        document.rows_mut(Table::Users).push(record);

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["users"][0]["id"], "u1");
        assert_eq!(json["leads"], serde_json::json!([]));
    }

    #[test]
    fn test_now_iso_format() {
        let stamp = now_iso();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2024-01-31T12:00:00.000Z".len());
    }
}
