//! Structures produced by the statement classifier
//!
//! This module defines the tagged shapes a statement string is reduced to:
//! the four statement kinds, the compiled WHERE conditions and the
//! recognised read shapes of a SELECT.

use std::fmt;

use crate::core::document::Record;
use crate::core::value::Value;
use crate::ql::matcher::LikePattern;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        };
        f.write_str(symbol)
    }
}

/// What a condition checks on its field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Equality, inequality or ordering against a value
    Compare { op: CompareOp, value: Value },
    /// SQL wildcard pattern
    Like(LikePattern),
    /// Field absent or null
    IsNull,
    /// Field present and not null
    IsNotNull,
    /// String form of the field is one of the set
    In(Vec<String>),
    /// String form of the field is none of the set
    NotIn(Vec<String>),
}

/// A single compiled WHERE condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Bare field name (qualifier removed)
    pub field: String,
    /// The check applied to the field
    pub predicate: Predicate,
}

impl Condition {
    pub fn new<S: Into<String>>(field: S, predicate: Predicate) -> Self {
        Condition {
            field: field.into(),
            predicate,
        }
    }
}

/// Output of the predicate compiler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledWhere {
    /// Conditions, implicitly AND-ed
    pub conditions: Vec<Condition>,
    /// Parameter slots consumed by the clause
    pub consumed: usize,
}

/// A classified statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert {
        table: String,
        record: Record,
        or_ignore: bool,
    },
    Update {
        table: String,
        assignments: Record,
        conditions: Vec<Condition>,
    },
    Delete {
        table: String,
        conditions: Vec<Condition>,
    },
    Select {
        raw: String,
        params: Vec<Value>,
    },
}

/// One LEFT JOIN of a row select
#[derive(Debug, Clone, PartialEq)]
pub struct JoinEdge {
    /// Joined table name
    pub table: String,
    /// Alias of the joined table, if given
    pub alias: Option<String>,
    /// Bare field of the left side of the ON equality
    pub left_field: String,
    /// Bare field of the right side of the ON equality
    pub right_field: String,
}

/// Sort direction of an ORDER BY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Single-key ORDER BY
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// One `COALESCE(SUM(field), 0) AS alias` column
#[derive(Debug, Clone, PartialEq)]
pub struct SumColumn {
    pub field: String,
    pub alias: String,
}

/// The recognised read shapes, most specific first
#[derive(Debug, Clone, PartialEq)]
pub enum SelectShape {
    /// `COUNT(*) AS alias`
    Count { alias: String },
    /// One or two `COALESCE(SUM(field), 0) AS alias`
    Sum { sums: Vec<SumColumn> },
    /// `strftime(format, field) AS key, COUNT(*) AS count`
    Trend {
        format: String,
        field: String,
        key_alias: String,
        count_alias: String,
    },
    /// `field, COUNT(*) AS count`
    GroupCount { field: String, count_alias: String },
    /// Anything else: full rows
    Rows,
}

/// A parsed SELECT
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub shape: SelectShape,
    /// Source table, lower-cased
    pub table: String,
    pub alias: Option<String>,
    pub joins: Vec<JoinEdge>,
    pub conditions: Vec<Condition>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
