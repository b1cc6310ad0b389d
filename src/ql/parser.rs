//! Statement classifier
//!
//! Reduces a statement string to one of the four statement kinds. Writes are
//! parsed completely here; reads are normalised and handed to the select
//! evaluator untouched.

use crate::config::WhereMode;
use crate::core::document::{now_iso, Record};
use crate::core::errors::{Result, StoreError};
use crate::core::value::Value;
use crate::ql::ast::{CompareOp, Statement};
use crate::ql::lexer::{bare_field, closing_paren, find_top_level, render, split_top_level, tokenize, Token};
use crate::ql::predicate::{compile_where, literal_value};

/// Marker for "current server time" in assignments and VALUES lists
const CURRENT_TIMESTAMP: &str = "CURRENT_TIMESTAMP";

/// Collapse whitespace runs and trim
pub fn normalize(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify and parse a statement
pub fn parse_statement(sql: &str, params: &[Value], mode: WhereMode) -> Result<Statement> {
    let sql = normalize(sql);
    let mut tokens = tokenize(&sql)?;
    while matches!(tokens.last(), Some(Token::Semicolon)) {
        tokens.pop();
    }

    match tokens.first() {
        Some(t) if t.is_keyword("INSERT") => parse_insert(&tokens, params),
        Some(t) if t.is_keyword("UPDATE") => parse_update(&tokens, params, mode),
        Some(t) if t.is_keyword("DELETE") => parse_delete(&tokens, params, mode),
        _ => Ok(Statement::Select {
            raw: sql,
            params: params.to_vec(),
        }),
    }
}

fn malformed(tokens: &[Token], reason: &str) -> StoreError {
    StoreError::MalformedStatement(format!("{}: {}", reason, render(tokens)))
}

/// Table name at `index`, lower-cased
fn table_at(tokens: &[Token], index: usize) -> Result<String> {
    tokens
        .get(index)
        .and_then(Token::word)
        .map(|w| w.to_lowercase())
        .ok_or_else(|| malformed(tokens, "Expected a table name"))
}

/// Tokens between a `(` at `open` and its matching `)`, plus the index after it
fn parenthesised(tokens: &[Token], open: usize) -> Option<(&[Token], usize)> {
    let close = closing_paren(tokens, open)?;
    Some((&tokens[open + 1..close], close + 1))
}

/// INSERT [OR IGNORE] INTO table (cols) VALUES (items)
fn parse_insert(tokens: &[Token], params: &[Value]) -> Result<Statement> {
    let mut pos = 1;
    let mut or_ignore = false;

    if tokens.get(pos).is_some_and(|t| t.is_keyword("OR")) {
        if !tokens.get(pos + 1).is_some_and(|t| t.is_keyword("IGNORE")) {
            return Err(malformed(tokens, "Only INSERT OR IGNORE is supported"));
        }
        or_ignore = true;
        pos += 2;
    }
    if !tokens.get(pos).is_some_and(|t| t.is_keyword("INTO")) {
        return Err(malformed(tokens, "Expected INTO"));
    }
    let table = table_at(tokens, pos + 1)?;

    let (column_tokens, after_columns) =
        parenthesised(tokens, pos + 2).ok_or_else(|| malformed(tokens, "Expected a column list"))?;
    let columns = split_top_level(column_tokens, |t| matches!(t, Token::Comma))
        .into_iter()
        .map(|column| match column {
            [Token::Word(w)] => Ok(bare_field(w).to_string()),
            _ => Err(malformed(tokens, "Bad column list")),
        })
        .collect::<Result<Vec<_>>>()?;

    if !tokens.get(after_columns).is_some_and(|t| t.is_keyword("VALUES")) {
        return Err(malformed(tokens, "Expected VALUES"));
    }
    let (value_tokens, _) =
        parenthesised(tokens, after_columns + 1).ok_or_else(|| malformed(tokens, "Expected a VALUES list"))?;
    let items = split_top_level(value_tokens, |t| matches!(t, Token::Comma));

    let now = now_iso();
    let mut record = Record::new();
    match resolve_items(&items, params, &now) {
        Some(values) if values.len() == columns.len() => {
            record.extend(columns.into_iter().zip(values));
        }
        // Positional alignment of parameters with columns
        _ => {
            for (i, column) in columns.into_iter().enumerate() {
                record.insert(column, params.get(i).cloned().unwrap_or(Value::Null));
            }
        }
    }

    for stamp in ["created_at", "updated_at"] {
        if !record.get(stamp).is_some_and(Value::is_truthy) {
            record.insert(stamp.to_string(), Value::from(now.as_str()));
        }
    }

    Ok(Statement::Insert {
        table,
        record,
        or_ignore,
    })
}

/// Values of a VALUES list, or `None` if an item is not a placeholder or literal
fn resolve_items(items: &[&[Token]], params: &[Value], now: &str) -> Option<Vec<Value>> {
    let mut next = 0;
    items
        .iter()
        .map(|item| match item {
            [Token::Placeholder] => {
                let value = params.get(next).cloned().unwrap_or(Value::Null);
                next += 1;
                Some(value)
            }
            [t] if t.is_keyword(CURRENT_TIMESTAMP) => Some(Value::from(now)),
            [t] => literal_value(t),
            _ => None,
        })
        .collect()
}

/// UPDATE table SET assignments [WHERE clause]
fn parse_update(tokens: &[Token], params: &[Value], mode: WhereMode) -> Result<Statement> {
    let table = table_at(tokens, 1)?;
    if !tokens.get(2).is_some_and(|t| t.is_keyword("SET")) {
        return Err(malformed(tokens, "Expected SET"));
    }

    let where_at = find_top_level(tokens, 3, |t| t.is_keyword("WHERE"));
    let set_tokens = &tokens[3..where_at.unwrap_or(tokens.len())];
    if set_tokens.is_empty() {
        return Err(malformed(tokens, "Empty SET clause"));
    }

    let mut next = 0;
    let mut assignments = Record::new();
    for assignment in split_top_level(set_tokens, |t| matches!(t, Token::Comma)) {
        let (field, value) = match assignment {
            [Token::Word(field), Token::Op(CompareOp::Eq), value @ ..] if !value.is_empty() => (field, value),
            _ => return Err(malformed(tokens, "Bad SET assignment")),
        };
        // Stamped below regardless
        if value.iter().any(|t| t.is_keyword(CURRENT_TIMESTAMP)) {
            continue;
        }
        let value = match value {
            [Token::Placeholder] => {
                let value = params.get(next).cloned().unwrap_or(Value::Null);
                next += 1;
                value
            }
            [literal] => literal_value(literal).ok_or_else(|| malformed(tokens, "Bad SET value"))?,
            _ => return Err(malformed(tokens, "Unsupported SET expression")),
        };
        assignments.insert(bare_field(field).to_string(), value);
    }
    assignments.insert("updated_at".to_string(), Value::from(now_iso()));

    let conditions = match where_at {
        Some(at) => compile_where(&tokens[at + 1..], params, next, mode)?.conditions,
        None => Vec::new(),
    };

    Ok(Statement::Update {
        table,
        assignments,
        conditions,
    })
}

/// DELETE FROM table [WHERE clause]
fn parse_delete(tokens: &[Token], params: &[Value], mode: WhereMode) -> Result<Statement> {
    if !tokens.get(1).is_some_and(|t| t.is_keyword("FROM")) {
        return Err(malformed(tokens, "Expected FROM"));
    }
    let table = table_at(tokens, 2)?;

    let conditions = match tokens.get(3) {
        None => Vec::new(),
        Some(t) if t.is_keyword("WHERE") => compile_where(&tokens[4..], params, 0, mode)?.conditions,
        Some(_) => return Err(malformed(tokens, "Expected WHERE")),
    };

    Ok(Statement::Delete { table, conditions })
}
