//! Predicate compiler
//!
//! Turns the tokens of a WHERE clause into an ordered list of conditions.
//! The clause is split on top-level `AND`; each fragment is matched against
//! a fixed set of shapes and consumes the positional parameters it contains,
//! left to right.

use log::warn;

use crate::config::WhereMode;
use crate::core::errors::{Result, StoreError};
use crate::core::value::Value;
use crate::ql::ast::{CompareOp, CompiledWhere, Condition, Predicate};
use crate::ql::lexer::{bare_field, count_placeholders, render, split_top_level, tokenize, Token};
use crate::ql::matcher::LikePattern;

/// Date helpers whose fragments are recognised but contribute no condition
const DATE_FUNCTIONS: [&str; 4] = ["strftime", "date", "datetime", "julianday"];

/// What one fragment compiles to
enum Fragment {
    Condition(Condition),
    /// Recognised, no condition
    Ignored,
    Unrecognized,
}

/// Compile WHERE-clause text
pub fn compile_where_text(
    text: &str,
    params: &[Value],
    start: usize,
    mode: WhereMode,
) -> Result<CompiledWhere> {
    let tokens = tokenize(text)?;
    compile_where(&tokens, params, start, mode)
}

/// Compile the tokens of a WHERE clause, consuming parameters from `start`
pub fn compile_where(
    tokens: &[Token],
    params: &[Value],
    start: usize,
    mode: WhereMode,
) -> Result<CompiledWhere> {
    let mut compiled = CompiledWhere::default();
    if tokens.is_empty() {
        return Ok(compiled);
    }

    let mut offset = start;
    for fragment in split_top_level(tokens, |t| t.is_keyword("AND")) {
        match compile_fragment(fragment, params, offset)? {
            Fragment::Condition(condition) => compiled.conditions.push(condition),
            Fragment::Ignored => {}
            Fragment::Unrecognized => {
                let text = render(fragment);
                match mode {
                    WhereMode::Strict => return Err(StoreError::UnsupportedPredicate(text)),
                    WhereMode::Lenient => warn!("Dropping unrecognised WHERE fragment: {}", text),
                }
            }
        }
        // Every fragment advances by its own placeholders, recognised or not
        offset += count_placeholders(fragment);
    }

    compiled.consumed = offset - start;
    Ok(compiled)
}

fn param(params: &[Value], index: usize) -> Value {
    params.get(index).cloned().unwrap_or(Value::Null)
}

/// Value of an inline literal token (`'text'`, `42`, `NULL`, `TRUE`, `FALSE`)
pub fn literal_value(token: &Token) -> Option<Value> {
    match token {
        Token::Str(s) => Some(Value::String(s.clone())),
        Token::Number(n) => match n.parse::<i64>() {
            Ok(i) => Some(Value::Integer(i)),
            Err(_) => n.parse::<f64>().ok().map(Value::number),
        },
        t if t.is_keyword("NULL") => Some(Value::Null),
        t if t.is_keyword("TRUE") => Some(Value::Boolean(true)),
        t if t.is_keyword("FALSE") => Some(Value::Boolean(false)),
        _ => None,
    }
}

/// A field reference: a word that is not a literal keyword
fn field_name(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if literal_value(token).is_none() => Some(bare_field(w).to_string()),
        _ => None,
    }
}

fn is_date_helper(fragment: &[Token]) -> bool {
    fragment.windows(2).any(|pair| {
        matches!(pair[1], Token::LParen)
            && DATE_FUNCTIONS.iter().any(|name| pair[0].is_keyword(name))
    })
}

fn compile_fragment(fragment: &[Token], params: &[Value], offset: usize) -> Result<Fragment> {
    if is_date_helper(fragment) {
        return Ok(Fragment::Ignored);
    }

    let field = match fragment.first().and_then(field_name) {
        Some(field) => field,
        None => return Ok(constant_fragment(fragment)),
    };
    let rest = &fragment[1..];

    let predicate = match rest {
        [is, null] if is.is_keyword("IS") && null.is_keyword("NULL") => Predicate::IsNull,
        [is, not, null] if is.is_keyword("IS") && not.is_keyword("NOT") && null.is_keyword("NULL") => {
            Predicate::IsNotNull
        }
        [like, Token::Placeholder] if like.is_keyword("LIKE") => {
            Predicate::Like(LikePattern::new(&param(params, offset).as_text())?)
        }
        [like, Token::Str(pattern)] if like.is_keyword("LIKE") => Predicate::Like(LikePattern::new(pattern)?),
        [Token::Op(op), Token::Placeholder] => Predicate::Compare {
            op: *op,
            value: param(params, offset),
        },
        [Token::Op(op), literal] => match literal_value(literal) {
            Some(value) => Predicate::Compare { op: *op, value },
            None => return Ok(Fragment::Unrecognized),
        },
        [not, in_kw, list @ ..] if not.is_keyword("NOT") && in_kw.is_keyword("IN") => {
            match value_set(list, params, offset) {
                Some(set) => Predicate::NotIn(set),
                None => return Ok(Fragment::Unrecognized),
            }
        }
        [in_kw, list @ ..] if in_kw.is_keyword("IN") => match value_set(list, params, offset) {
            Some(set) => Predicate::In(set),
            None => return Ok(Fragment::Unrecognized),
        },
        _ => return Ok(Fragment::Unrecognized),
    };

    Ok(Fragment::Condition(Condition::new(field, predicate)))
}

/// Parenthesised list of literals or placeholders, as string forms
fn value_set(list: &[Token], params: &[Value], offset: usize) -> Option<Vec<String>> {
    let inner = match list {
        [Token::LParen, inner @ .., Token::RParen] => inner,
        _ => return None,
    };

    let mut next = offset;
    let mut set = Vec::new();
    for item in split_top_level(inner, |t| matches!(t, Token::Comma)) {
        match item {
            [Token::Placeholder] => {
                set.push(param(params, next).as_text());
                next += 1;
            }
            [token] => set.push(literal_value(token)?.as_text()),
            _ => return None,
        }
    }
    Some(set)
}

/// `literal op literal`: a true constant comparison such as `1=1` is ignored
fn constant_fragment(fragment: &[Token]) -> Fragment {
    if let [left, Token::Op(op), right] = fragment {
        if let (Some(l), Some(r)) = (literal_value(left), literal_value(right)) {
            let holds = match op {
                CompareOp::Eq => l.as_text() == r.as_text(),
                CompareOp::NotEq => l.as_text() != r.as_text(),
                _ => false,
            };
            if holds {
                return Fragment::Ignored;
            }
        }
    }
    Fragment::Unrecognized
}
