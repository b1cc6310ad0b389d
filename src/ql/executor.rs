//! Mutation executor
//!
//! Applies classified INSERT, UPDATE and DELETE statements to the store's
//! document and requests persistence. The target table is validated before
//! anything is touched.

use std::str::FromStr;

use log::debug;

use crate::core::document::Record;
use crate::core::errors::Result;
use crate::core::store::Store;
use crate::core::table::Table;
use crate::core::value::Value;
use crate::ql::ast::Condition;
use crate::ql::matcher::matches_row;

/// Append a record; with `or_ignore`, a row with the same `id` makes this a no-op
pub fn insert(store: &mut dyn Store, table: &str, record: Record, or_ignore: bool) -> Result<()> {
    let table = Table::from_str(table)?;
    let rows = store.document_mut().rows_mut(table);

    if or_ignore {
        if let Some(id) = record.get("id").filter(|id| id.is_truthy()) {
            let exists = rows
                .iter()
                .any(|row| row.get("id").is_some_and(|existing| existing.strict_eq(id)));
            if exists {
                debug!("Ignoring duplicate id {} in {}", id, table);
                return Ok(());
            }
        }
    }

    rows.push(record);
    store.save()
}

/// Overlay `assignments` on every matching row, in place
pub fn update(store: &mut dyn Store, table: &str, assignments: &Record, conditions: &[Condition]) -> Result<()> {
    let table = Table::from_str(table)?;

    let mut matched = 0;
    for row in store.document_mut().rows_mut(table).iter_mut() {
        if matches_row(row, conditions) {
            row.extend(assignments.iter().map(|(k, v)| (k.clone(), v.clone())));
            matched += 1;
        }
    }
    debug!("Updated {} row(s) in {}", matched, table);

    store.save()
}

/// Remove every matching row, keeping the order of the rest
pub fn delete(store: &mut dyn Store, table: &str, conditions: &[Condition]) -> Result<()> {
    let table = Table::from_str(table)?;

    let rows = store.document_mut().rows_mut(table);
    let before = rows.len();
    rows.retain(|row| !matches_row(row, conditions));
    debug!("Deleted {} row(s) from {}", before - rows.len(), table);

    store.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::StoreError;
    use crate::ql::ast::{CompareOp, Predicate};
    use crate::storage::MemoryStore;

    fn record(fields: &[(&str, Value)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn field_of(store: &dyn Store, table: Table, id: &Value, field: &str) -> Option<Value> {
        store
            .document()
            .rows(table.name())
            .iter()
            .find(|row| row.get("id").is_some_and(|v| v.strict_eq(id)))
            .and_then(|row| row.get(field).cloned())
    }

    fn id_is(id: &str) -> Vec<Condition> {
        vec![Condition::new(
            "id",
            Predicate::Compare { op: CompareOp::Eq, value: Value::from(id) },
        )]
    }

    #[test]
    fn test_insert_appends_and_saves() {
        let mut store = MemoryStore::new();
        insert(&mut store, "leads", record(&[("id", Value::from("l1"))]), false).unwrap();
        insert(&mut store, "leads", record(&[("id", Value::from("l2"))]), false).unwrap();

        let ids: Vec<_> = store.document().rows("leads").iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![Value::from("l1"), Value::from("l2")]);
        assert_eq!(store.saves(), 2);
    }

    #[test]
    fn test_insert_or_ignore_is_idempotent() {
        let mut store = MemoryStore::new();
        for name in ["first", "second"] {
            let row = record(&[("id", Value::from("u1")), ("name", Value::from(name))]);
            insert(&mut store, "users", row, true).unwrap();
        }

        let users = store.document().rows("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["name"], Value::from("first"));
    }

    #[test]
    fn test_unknown_table_leaves_document_unchanged() {
        let mut store = MemoryStore::new();
        let before = store.document().clone();

        let result = insert(&mut store, "invoices", record(&[("id", Value::from("i1"))]), false);
        assert!(matches!(result, Err(StoreError::UnknownTable(ref t)) if t == "invoices"));
        assert!(matches!(update(&mut store, "invoices", &Record::new(), &[]), Err(StoreError::UnknownTable(_))));
        assert!(matches!(delete(&mut store, "invoices", &[]), Err(StoreError::UnknownTable(_))));

        assert_eq!(store.document(), &before);
        assert_eq!(store.saves(), 0);
    }

    #[test]
    fn test_update_touches_only_matching_rows() {
        let mut store = MemoryStore::new();
        insert(&mut store, "tasks", record(&[("id", Value::from("t1")), ("title", Value::from("Call"))]), false).unwrap();
        insert(&mut store, "tasks", record(&[("id", Value::from("t2")), ("title", Value::from("Mail"))]), false).unwrap();

        let assignments = record(&[("done", Value::Integer(1))]);
        update(&mut store, "tasks", &assignments, &id_is("t2")).unwrap();

        assert_eq!(field_of(&store, Table::Tasks, &Value::from("t2"), "done"), Some(Value::Integer(1)));
        assert_eq!(field_of(&store, Table::Tasks, &Value::from("t2"), "title"), Some(Value::from("Mail")));
        assert_eq!(field_of(&store, Table::Tasks, &Value::from("t1"), "done"), None);
    }

    #[test]
    fn test_update_without_match_still_saves() {
        let mut store = MemoryStore::new();
        update(&mut store, "tasks", &record(&[("done", Value::Integer(1))]), &id_is("nope")).unwrap();
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_delete_keeps_order_of_the_rest() {
        let mut store = MemoryStore::new();
        for id in ["a", "b", "c", "d"] {
            insert(&mut store, "activities", record(&[("id", Value::from(id))]), false).unwrap();
        }

        delete(&mut store, "activities", &id_is("b")).unwrap();

        let ids: Vec<_> = store.document().rows("activities").iter().map(|r| r["id"].as_text()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }
}
