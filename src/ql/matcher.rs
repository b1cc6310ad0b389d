//! Row matcher
//!
//! Evaluates compiled conditions against a single record. Equality and set
//! membership compare loose string forms; ordering compares natural values.

use std::cmp::Ordering;

use regex::Regex;

use crate::core::document::Record;
use crate::core::errors::{Result, StoreError};
use crate::core::value::Value;
use crate::ql::ast::{CompareOp, Condition, Predicate};

/// A compiled SQL LIKE pattern (`%` any run, `_` any single character)
#[derive(Debug, Clone)]
pub struct LikePattern {
    pattern: String,
    regex: Regex,
}

impl LikePattern {
    /// Compile a pattern; matching is case-insensitive and anchored
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&like_to_regex(pattern))
            .map_err(|e| StoreError::MalformedStatement(format!("Bad LIKE pattern {:?}: {}", pattern, e)))?;
        Ok(LikePattern {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

/// Convert SQL LIKE pattern to regex pattern
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::from("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

/// Check that a record satisfies every condition
pub fn matches_row(row: &Record, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| matches_condition(row, condition))
}

fn matches_condition(row: &Record, condition: &Condition) -> bool {
    let field = row.get(&condition.field);
    let text = || field.map(Value::as_text).unwrap_or_default();

    match &condition.predicate {
        Predicate::Compare { op: CompareOp::Eq, value } => text() == value.as_text(),
        Predicate::Compare { op: CompareOp::NotEq, value } => text() != value.as_text(),
        Predicate::Compare { op, value } => {
            let ordering = match field.and_then(|v| v.compare(value)) {
                Some(ordering) => ordering,
                None => return false,
            };
            match op {
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Gte => ordering != Ordering::Less,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Lte => ordering != Ordering::Greater,
                CompareOp::Eq | CompareOp::NotEq => unreachable!("handled above"),
            }
        }
        Predicate::Like(pattern) => pattern.is_match(&text()),
        Predicate::IsNull => field.map_or(true, Value::is_null),
        Predicate::IsNotNull => field.is_some_and(|v| !v.is_null()),
        Predicate::In(set) => set.contains(&text()),
        Predicate::NotIn(set) => !set.contains(&text()),
    }
}
