//! Query-string interpreter
//!
//! Evaluates SQL-like statement strings with positional parameters directly
//! against the store's document. There is no planner: the statement is
//! tokenized, classified into one of a fixed set of shapes and evaluated
//! with linear scans.

pub mod ast;
pub mod executor;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod predicate;
pub mod select;

use log::debug;

use crate::config::DatabaseConfig;
use crate::core::document::Record;
use crate::core::errors::Result;
use crate::core::store::Store;
use crate::core::value::Value;
use crate::ql::ast::Statement;

/// Execute a statement on the given store
///
/// Reads return their result rows; writes return an empty list.
pub fn execute(store: &mut dyn Store, sql: &str, params: &[Value], config: &DatabaseConfig) -> Result<Vec<Record>> {
    let statement = parser::parse_statement(sql, params, config.where_mode)?;

    match statement {
        Statement::Insert { table, record, or_ignore } => {
            debug!("INSERT into {} ({} fields, ignore={})", table, record.len(), or_ignore);
            executor::insert(store, &table, record, or_ignore)?;
            Ok(Vec::new())
        }
        Statement::Update { table, assignments, conditions } => {
            debug!("UPDATE {} with {} condition(s)", table, conditions.len());
            executor::update(store, &table, &assignments, &conditions)?;
            Ok(Vec::new())
        }
        Statement::Delete { table, conditions } => {
            debug!("DELETE from {} with {} condition(s)", table, conditions.len());
            executor::delete(store, &table, &conditions)?;
            Ok(Vec::new())
        }
        Statement::Select { raw, params } => select::evaluate(store.document(), &raw, &params, config.where_mode),
    }
}
