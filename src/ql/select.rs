//! Select evaluator
//!
//! A SELECT is reduced to a `SelectQuery`: the source table, LEFT JOIN
//! chain, compiled WHERE conditions, ordering, pagination and one of five
//! result shapes. The shape is picked from the projection, most specific
//! first; anything that does not even have a `SELECT ... FROM table` layout
//! yields no rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};

use crate::config::WhereMode;
use crate::core::document::{now_iso, Document, Record};
use crate::core::errors::Result;
use crate::core::value::Value;
use crate::ql::ast::{CompareOp, JoinEdge, OrderBy, SelectQuery, SelectShape, SortDirection, SumColumn};
use crate::ql::lexer::{
    bare_field, closing_paren, count_placeholders, find_top_level, render, split_top_level, tokenize, Token,
};
use crate::ql::matcher::matches_row;
use crate::ql::predicate::{compile_where, literal_value};

/// Keywords that open a clause after the FROM/JOIN section
const CLAUSE_KEYWORDS: [&str; 5] = ["WHERE", "GROUP", "ORDER", "LIMIT", "OFFSET"];

/// Keywords that can never be a table alias
const RESERVED: [&str; 11] = [
    "WHERE", "GROUP", "ORDER", "LIMIT", "OFFSET", "LEFT", "INNER", "JOIN", "ON", "OUTER", "CROSS",
];

/// Bucket for rows missing the grouped field
const UNKNOWN_GROUP: &str = "Unknown";

/// Convenience aliases every grouped value is also exposed under
const GROUP_ALIASES: [&str; 3] = ["source", "type", "status"];

/// Convenience aliases of the count shape
const COUNT_ALIASES: [&str; 2] = ["c", "total"];

/// Convenience alias of the first sum
const SUM_ALIAS: &str = "v";

fn is_clause_keyword(token: &Token) -> bool {
    CLAUSE_KEYWORDS.iter().any(|k| token.is_keyword(k))
}

fn is_reserved(token: &Token) -> bool {
    RESERVED.iter().any(|k| token.is_keyword(k))
}

/// Parse and evaluate a select statement against the document
pub fn evaluate(document: &Document, raw: &str, params: &[Value], mode: WhereMode) -> Result<Vec<Record>> {
    match parse_select(raw, params, mode)? {
        Some(query) => {
            debug!("Select {:?} on {}", query.shape, query.table);
            Ok(run_select(document, &query))
        }
        None => {
            warn!("Unrecognised select shape, returning no rows: {}", raw);
            Ok(Vec::new())
        }
    }
}

/// Parse a select statement; `None` when it has no recognisable layout
pub fn parse_select(raw: &str, params: &[Value], mode: WhereMode) -> Result<Option<SelectQuery>> {
    let mut tokens = tokenize(raw)?;
    while matches!(tokens.last(), Some(Token::Semicolon)) {
        tokens.pop();
    }

    if !tokens.first().is_some_and(|t| t.is_keyword("SELECT")) {
        return Ok(None);
    }
    let from = match find_top_level(&tokens, 1, |t| t.is_keyword("FROM")) {
        Some(from) => from,
        None => return Ok(None),
    };
    let table = match tokens.get(from + 1) {
        Some(Token::Word(name)) if !is_reserved(&tokens[from + 1]) => name.to_lowercase(),
        _ => return Ok(None),
    };

    let mut pos = from + 2;
    let alias = match tokens.get(pos) {
        Some(t) if t.is_keyword("AS") => {
            pos += 2;
            tokens.get(pos - 1).and_then(Token::word).map(str::to_string)
        }
        Some(t @ Token::Word(w)) if !is_reserved(t) => {
            pos += 1;
            Some(w.clone())
        }
        _ => None,
    };

    let joins_end = find_top_level(&tokens, pos, is_clause_keyword).unwrap_or(tokens.len());
    let joins = parse_joins(&tokens[pos.min(joins_end)..joins_end]);

    let conditions = match clause(&tokens, joins_end, "WHERE") {
        Some((start, end)) => {
            let first_param = count_placeholders(&tokens[..start]);
            compile_where(&tokens[start..end], params, first_param, mode)?.conditions
        }
        None => Vec::new(),
    };

    let order_by = clause(&tokens, joins_end, "ORDER").and_then(|(start, end)| parse_order_by(&tokens[start..end]));
    let limit = clause(&tokens, joins_end, "LIMIT").and_then(|(start, _)| row_count(&tokens, start, params));
    let offset = clause(&tokens, joins_end, "OFFSET").and_then(|(start, _)| row_count(&tokens, start, params));

    Ok(Some(SelectQuery {
        shape: classify_projection(&tokens[1..from]),
        table,
        alias,
        joins,
        conditions,
        order_by,
        limit,
        offset,
    }))
}

/// Token range of a clause body, `BY` skipped
fn clause(tokens: &[Token], from: usize, keyword: &str) -> Option<(usize, usize)> {
    let at = find_top_level(tokens, from, |t| t.is_keyword(keyword))?;
    let mut start = at + 1;
    if tokens.get(start).is_some_and(|t| t.is_keyword("BY")) {
        start += 1;
    }
    let end = find_top_level(tokens, start, is_clause_keyword).unwrap_or(tokens.len());
    Some((start, end))
}

/// LIMIT/OFFSET operand; negative means unbounded
fn row_count(tokens: &[Token], at: usize, params: &[Value]) -> Option<usize> {
    let value = match tokens.get(at)? {
        Token::Placeholder => params.get(count_placeholders(&tokens[..at])).cloned()?,
        token => literal_value(token)?,
    };
    let n = value.numeric_or_zero();
    if n < 0.0 {
        None
    } else {
        Some(n as usize)
    }
}

fn parse_order_by(tokens: &[Token]) -> Option<OrderBy> {
    let key = split_top_level(tokens, |t| matches!(t, Token::Comma)).into_iter().next()?;
    let (expr, direction) = match key {
        [expr @ .., last] if last.is_keyword("DESC") => (expr, SortDirection::Desc),
        [expr @ .., last] if last.is_keyword("ASC") => (expr, SortDirection::Asc),
        expr => (expr, SortDirection::Asc),
    };
    let field = match expr {
        [] => return None,
        [Token::Word(w)] => bare_field(w).to_string(),
        other => render(other),
    };
    Some(OrderBy { field, direction })
}

fn is_join_start(tokens: &[Token], i: usize) -> bool {
    let opens = |t: &Token| t.is_keyword("LEFT") || t.is_keyword("INNER") || t.is_keyword("CROSS");
    let token = &tokens[i];
    if opens(token) {
        return true;
    }
    token.is_keyword("JOIN") && !(i > 0 && (opens(&tokens[i - 1]) || tokens[i - 1].is_keyword("OUTER")))
}

/// LEFT [OUTER] JOIN table [AS] [alias] ON a = b, repeated
fn parse_joins(tokens: &[Token]) -> Vec<JoinEdge> {
    let starts: Vec<usize> = (0..tokens.len()).filter(|&i| is_join_start(tokens, i)).collect();

    let leading = starts.first().copied().unwrap_or(tokens.len());
    if leading > 0 {
        warn!("Ignoring unsupported FROM clause text: {}", render(&tokens[..leading]));
    }

    starts
        .iter()
        .enumerate()
        .filter_map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(tokens.len());
            let segment = &tokens[start..end];
            let join = parse_join(segment);
            if join.is_none() {
                warn!("Skipping unsupported join: {}", render(segment));
            }
            join
        })
        .collect()
}

fn parse_join(segment: &[Token]) -> Option<JoinEdge> {
    let rest = match segment {
        [left, outer, join, rest @ ..]
            if left.is_keyword("LEFT") && outer.is_keyword("OUTER") && join.is_keyword("JOIN") => rest,
        [left, join, rest @ ..] if left.is_keyword("LEFT") && join.is_keyword("JOIN") => rest,
        _ => return None,
    };

    let (table, rest) = match rest {
        [Token::Word(table), rest @ ..] => (table.to_lowercase(), rest),
        _ => return None,
    };
    let (alias, rest) = match rest {
        [as_kw, Token::Word(alias), rest @ ..] if as_kw.is_keyword("AS") => (Some(alias.clone()), rest),
        [t @ Token::Word(alias), rest @ ..] if !t.is_keyword("ON") => (Some(alias.clone()), rest),
        rest => (None, rest),
    };
    match rest {
        [on, Token::Word(left), Token::Op(CompareOp::Eq), Token::Word(right), ..]
            if on.is_keyword("ON") =>
        {
            Some(JoinEdge {
                table,
                alias,
                left_field: bare_field(left).to_string(),
                right_field: bare_field(right).to_string(),
            })
        }
        _ => None,
    }
}

/// Split a projection item into its expression and `AS` alias
fn split_alias(item: &[Token]) -> (&[Token], Option<String>) {
    match item {
        [expr @ .., as_kw, Token::Word(alias)] if as_kw.is_keyword("AS") && !expr.is_empty() => {
            (expr, Some(alias.clone()))
        }
        [expr @ .., Token::RParen, Token::Word(alias)] => (&item[..expr.len() + 1], Some(alias.clone())),
        _ => (item, None),
    }
}

/// Arguments of a call `name(...)` spanning the whole expression
fn call_args<'a>(expr: &'a [Token], name: &str) -> Option<&'a [Token]> {
    match expr {
        [func, ..] if func.is_keyword(name) => {
            let close = closing_paren(expr, 1)?;
            (close == expr.len() - 1).then(|| &expr[2..close])
        }
        _ => None,
    }
}

fn is_count(expr: &[Token]) -> bool {
    call_args(expr, "COUNT").is_some_and(|args| args.len() == 1)
}

/// `COALESCE(SUM(field), 0)` or `SUM(field)`
fn sum_field(expr: &[Token]) -> Option<String> {
    let inner = match call_args(expr, "COALESCE") {
        Some(args) => match split_top_level(args, |t| matches!(t, Token::Comma)).as_slice() {
            [sum, [Token::Number(_)]] => *sum,
            _ => return None,
        },
        None => expr,
    };
    match call_args(inner, "SUM")? {
        [Token::Word(field)] => Some(bare_field(field).to_string()),
        _ => None,
    }
}

/// `strftime('format', field)`
fn trend_key(expr: &[Token]) -> Option<(String, String)> {
    match call_args(expr, "strftime")? {
        [Token::Str(format), Token::Comma, Token::Word(field)] => Some((format.clone(), bare_field(field).to_string())),
        _ => None,
    }
}

fn classify_projection(projection: &[Token]) -> SelectShape {
    let items: Vec<_> = split_top_level(projection, |t| matches!(t, Token::Comma))
        .into_iter()
        .map(split_alias)
        .collect();

    match items.as_slice() {
        [(expr, alias)] if is_count(expr) => {
            return SelectShape::Count {
                alias: alias.clone().unwrap_or_else(|| "count".to_string()),
            }
        }
        [(key, key_alias), (count, count_alias)] if is_count(count) => {
            let count_alias = count_alias.clone().unwrap_or_else(|| "count".to_string());
            if let Some((format, field)) = trend_key(key) {
                return SelectShape::Trend {
                    format,
                    field,
                    key_alias: key_alias.clone().unwrap_or_else(|| "period".to_string()),
                    count_alias,
                };
            }
            if let [Token::Word(field)] = key {
                return SelectShape::GroupCount {
                    field: bare_field(field).to_string(),
                    count_alias,
                };
            }
        }
        _ => {}
    }

    if (1..=2).contains(&items.len()) {
        let sums: Option<Vec<SumColumn>> = items
            .iter()
            .map(|(expr, alias)| {
                sum_field(expr).map(|field| SumColumn {
                    alias: alias.clone().unwrap_or_else(|| field.clone()),
                    field,
                })
            })
            .collect();
        if let Some(sums) = sums {
            return SelectShape::Sum { sums };
        }
    }

    SelectShape::Rows
}

/// Evaluate a parsed query
pub fn run_select(document: &Document, query: &SelectQuery) -> Vec<Record> {
    if !document.has_table(&query.table) {
        warn!("Select on unknown table {}", query.table);
    }
    let source = document.rows(&query.table);
    let filtered = || source.iter().filter(|r| matches_row(r, &query.conditions));

    match &query.shape {
        SelectShape::Count { alias } => {
            let count = Value::from(filtered().count());
            let mut row = Record::new();
            row.insert(alias.clone(), count.clone());
            for extra in COUNT_ALIASES {
                row.insert(extra.to_string(), count.clone());
            }
            vec![row]
        }
        SelectShape::Sum { sums } => {
            let mut row = Record::new();
            for sum in sums {
                let total: f64 = filtered()
                    .map(|r| r.get(&sum.field).map_or(0.0, Value::numeric_or_zero))
                    .sum();
                row.insert(sum.alias.clone(), Value::number(total));
            }
            if let Some(first) = sums.first().and_then(|s| row.get(&s.alias).cloned()) {
                row.insert(SUM_ALIAS.to_string(), first);
            }
            vec![row]
        }
        SelectShape::Trend {
            format,
            field,
            key_alias,
            count_alias,
        } => trend(filtered(), format, field, key_alias, count_alias, query.limit),
        SelectShape::GroupCount { field, count_alias } => group_count(filtered(), field, count_alias, query),
        SelectShape::Rows => plain_rows(document, source, query),
    }
}

/// Parse a stored timestamp or date string
fn parse_date(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn trend<'a>(
    rows: impl Iterator<Item = &'a Record>,
    format: &str,
    field: &str,
    key_alias: &str,
    count_alias: &str,
    limit: Option<usize>,
) -> Vec<Record> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        warn!("Unsupported date format in trend select: {}", format);
        return Vec::new();
    }

    let now = now_iso();
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let stamp = [row.get(field), row.get("created_at")]
            .into_iter()
            .flatten()
            .find(|v| v.is_truthy())
            .map(Value::as_text)
            .unwrap_or_else(|| now.clone());
        match parse_date(&stamp) {
            Some(date) => *groups.entry(date.format(format).to_string()).or_default() += 1,
            None => debug!("Skipping unparseable date {:?} in trend", stamp),
        }
    }

    // Ascending keys; a LIMIT keeps the most recent groups
    let skip = limit.map_or(0, |n| groups.len().saturating_sub(n));
    groups
        .into_iter()
        .skip(skip)
        .map(|(key, count)| {
            let mut row = Record::new();
            row.insert(key_alias.to_string(), Value::from(key));
            row.insert(count_alias.to_string(), Value::from(count));
            row
        })
        .collect()
}

fn group_count<'a>(
    rows: impl Iterator<Item = &'a Record>,
    field: &str,
    count_alias: &str,
    query: &SelectQuery,
) -> Vec<Record> {
    // First-seen order, keyed by string form
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, usize)> = Vec::new();
    for row in rows {
        let value = match row.get(field) {
            Some(v) if !v.is_null() => v.clone(),
            _ => Value::from(UNKNOWN_GROUP),
        };
        match index.get(&value.as_text()) {
            Some(&i) => groups[i].1 += 1,
            None => {
                index.insert(value.as_text(), groups.len());
                groups.push((value, 1));
            }
        }
    }

    if let Some(order) = &query.order_by {
        match order.direction {
            SortDirection::Asc => groups.sort_by(|a, b| a.1.cmp(&b.1)),
            SortDirection::Desc => groups.sort_by(|a, b| b.1.cmp(&a.1)),
        }
    }

    groups
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .map(|(value, count)| expand_group_aliases(field, count_alias, value, count))
        .collect()
}

/// One group row: the value under its field and the convenience aliases,
/// the count under its alias and `count`
fn expand_group_aliases(field: &str, count_alias: &str, value: Value, count: usize) -> Record {
    let mut row = Record::new();
    row.insert(field.to_string(), value.clone());
    row.insert(count_alias.to_string(), Value::from(count));
    row.insert("count".to_string(), Value::from(count));
    for alias in GROUP_ALIASES {
        row.insert(alias.to_string(), value.clone());
    }
    row
}

fn plain_rows(document: &Document, source: &[Record], query: &SelectQuery) -> Vec<Record> {
    // Owned copies; joins merge into these, never into the document
    let mut rows: Vec<Record> = source.to_vec();

    for join in &query.joins {
        let joined = document.rows(&join.table);
        for row in rows.iter_mut() {
            if let Some(target) = joined.iter().find(|j| join_matches(row, j, join)) {
                merge_joined(row, target, &join.table);
            }
        }
    }

    rows.retain(|r| matches_row(r, &query.conditions));

    if let Some(order) = &query.order_by {
        let empty = Value::String(String::new());
        let key = |r: &Record| -> Value {
            r.get(&order.field).filter(|v| !v.is_null()).unwrap_or(&empty).clone()
        };
        rows.sort_by(|a, b| {
            let ordering = sort_values(&key(a), &key(b));
            match order.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    rows.into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect()
}

fn sort_values(a: &Value, b: &Value) -> Ordering {
    a.compare(b).unwrap_or_else(|| a.as_text().cmp(&b.as_text()))
}

/// The ON equality, tried in both field orders
fn join_matches(row: &Record, joined: &Record, join: &JoinEdge) -> bool {
    let equal = |a: Option<&Value>, b: Option<&Value>| match (a, b) {
        (Some(a), Some(b)) => !a.is_null() && a.strict_eq(b),
        _ => false,
    };
    equal(joined.get(&join.right_field), row.get(&join.left_field))
        || equal(joined.get(&join.left_field), row.get(&join.right_field))
}

/// Copy a present field of the joined row onto the base row
fn copy_field(row: &mut Record, target: &Record, from: &str, to: &str) {
    if let Some(value) = target.get(from) {
        row.insert(to.to_string(), value.clone());
    }
}

fn references(row: &Record, target: &Record, foreign_key: &str) -> bool {
    match (row.get(foreign_key), target.get("id")) {
        (Some(fk), Some(id)) => fk.is_truthy() && id.strict_eq(fk),
        _ => false,
    }
}

/// Merge the display fields a joined table contributes
fn merge_joined(row: &mut Record, target: &Record, table: &str) {
    match table {
        "users" => {
            if references(row, target, "assigned_to") {
                copy_field(row, target, "name", "assigned_name");
                copy_field(row, target, "role", "assigned_role");
                copy_field(row, target, "email", "assigned_email");
            }
            if references(row, target, "performed_by") {
                copy_field(row, target, "name", "performed_by_name");
            }
        }
        "leads" => {
            copy_field(row, target, "name", "lead_name");
            if !row.get("company").is_some_and(Value::is_truthy) {
                copy_field(row, target, "company", "company");
            }
        }
        "email_templates" => copy_field(row, target, "name", "template_name"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Table;

    fn record(fields: &[(&str, Value)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn select(document: &Document, sql: &str, params: &[Value]) -> Vec<Record> {
        evaluate(document, sql, params, WhereMode::Lenient).unwrap()
    }

    fn leads_document() -> Document {
        let mut document = Document::new();
        let leads = document.rows_mut(Table::Leads);
        for (id, source, status, created) in [
            ("l1", "Web", "New", "2024-01-05T10:00:00.000Z"),
            ("l2", "Web", "Won", "2024-01-20T10:00:00.000Z"),
            ("l3", "Referral", "Lost", "2024-02-02T10:00:00.000Z"),
            ("l4", "Event", "New", "2023-11-11T10:00:00.000Z"),
            ("l5", "Web", "Won", "2024-02-28T10:00:00.000Z"),
        ] {
            leads.push(record(&[
                ("id", Value::from(id)),
                ("source", Value::from(source)),
                ("status", Value::from(status)),
                ("created_at", Value::from(created)),
            ]));
        }
        document
    }

    #[test]
    fn test_classify_shapes() {
        let shape = |sql: &str| parse_select(sql, &[], WhereMode::Lenient).unwrap().unwrap().shape;

        assert_eq!(shape("SELECT COUNT(*) as n FROM leads"), SelectShape::Count { alias: "n".to_string() });
        assert_eq!(
            shape("SELECT COALESCE(SUM(amount), 0) as paid, COALESCE(SUM(due), 0) as owed FROM payments"),
            SelectShape::Sum {
                sums: vec![
                    SumColumn { field: "amount".to_string(), alias: "paid".to_string() },
                    SumColumn { field: "due".to_string(), alias: "owed".to_string() },
                ]
            }
        );
        assert_eq!(
            shape("SELECT strftime('%Y', created_at) as year, COUNT(*) as count FROM leads GROUP BY year"),
            SelectShape::Trend {
                format: "%Y".to_string(),
                field: "created_at".to_string(),
                key_alias: "year".to_string(),
                count_alias: "count".to_string(),
            }
        );
        assert_eq!(
            shape("SELECT l.source, COUNT(*) as n FROM leads l GROUP BY l.source"),
            SelectShape::GroupCount { field: "source".to_string(), count_alias: "n".to_string() }
        );
        assert_eq!(shape("SELECT l.*, u.name FROM leads l"), SelectShape::Rows);
    }

    #[test]
    fn test_unrecognised_select_is_empty() {
        let document = leads_document();
        assert!(select(&document, "PRAGMA journal_mode = WAL", &[]).is_empty());
        assert!(select(&document, "SELECT 1", &[]).is_empty());
    }

    #[test]
    fn test_count_shape_exposes_aliases() {
        let document = leads_document();
        let rows = select(&document, "SELECT COUNT(*) as n FROM leads WHERE status = ?", &[Value::from("Won")]);
        assert_eq!(rows.len(), 1);
        for alias in ["n", "c", "total"] {
            assert_eq!(rows[0][alias], Value::Integer(2));
        }
    }

    #[test]
    fn test_count_on_unknown_table_is_zero() {
        let document = leads_document();
        let rows = select(&document, "SELECT COUNT(*) as n FROM invoices", &[]);
        assert_eq!(rows[0]["n"], Value::Integer(0));
    }

    #[test]
    fn test_sum_shape_treats_missing_as_zero() {
        let mut document = Document::new();
        let payments = document.rows_mut(Table::Payments);
        payments.push(record(&[("amount", Value::Integer(10))]));
        payments.push(record(&[("amount", Value::Null)]));
        payments.push(record(&[("amount", Value::from("5"))]));
        payments.push(record(&[("amount", Value::from("n/a"))]));

        let rows = select(&document, "SELECT COALESCE(SUM(amount), 0) as total FROM payments", &[]);
        assert_eq!(rows[0]["total"], Value::Integer(15));
        assert_eq!(rows[0]["v"], Value::Integer(15));
    }

    #[test]
    fn test_trend_shape_sorted_and_limited() {
        let document = leads_document();
        let sql = "SELECT strftime('%Y-%m', created_at) as month, COUNT(*) as count FROM leads \
                   WHERE created_at >= ? GROUP BY month ORDER BY month";
        let rows = select(&document, sql, &[Value::from("2024-01-01")]);
        assert_eq!(
            rows,
            vec![
                record(&[("month", Value::from("2024-01")), ("count", Value::Integer(2))]),
                record(&[("month", Value::from("2024-02")), ("count", Value::Integer(2))]),
            ]
        );

        let limited = select(
            &document,
            "SELECT strftime('%Y-%m', created_at) as month, COUNT(*) as count FROM leads GROUP BY month LIMIT 1",
            &[],
        );
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0]["month"], Value::from("2024-02"));
    }

    #[test]
    fn test_trend_falls_back_to_created_at() {
        let document = leads_document();
        let rows = select(
            &document,
            "SELECT strftime('%Y', closed_at) as year, COUNT(*) as count FROM leads GROUP BY year",
            &[],
        );
        assert_eq!(rows[0]["year"], Value::from("2023"));
        assert_eq!(rows[1]["count"], Value::Integer(4));
    }

    #[test]
    fn test_group_shape_sorted_by_count() {
        let document = leads_document();
        let rows = select(
            &document,
            "SELECT source, COUNT(*) as count FROM leads GROUP BY source ORDER BY count DESC LIMIT 2",
            &[],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["source"], Value::from("Web"));
        assert_eq!(rows[0]["count"], Value::Integer(3));
        assert_eq!(rows[1]["count"], Value::Integer(1));
        for alias in ["type", "status"] {
            assert_eq!(rows[0][alias], Value::from("Web"));
        }
    }

    #[test]
    fn test_group_missing_value_is_unknown() {
        let mut document = Document::new();
        document.rows_mut(Table::Tasks).push(record(&[("priority", Value::from("High"))]));
        document.rows_mut(Table::Tasks).push(Record::new());

        let rows = select(&document, "SELECT priority, COUNT(*) as n FROM tasks GROUP BY priority", &[]);
        assert_eq!(rows[1]["priority"], Value::from("Unknown"));
        assert_eq!(rows[1]["n"], Value::Integer(1));
    }

    #[test]
    fn test_left_join_merges_display_fields() {
        let mut document = Document::new();
        document.rows_mut(Table::Users).push(record(&[
            ("id", Value::from("u1")),
            ("name", Value::from("Alice")),
            ("role", Value::from("sales")),
            ("email", Value::from("alice@example.com")),
        ]));
        document.rows_mut(Table::Leads).push(record(&[
            ("id", Value::from("l1")),
            ("assigned_to", Value::from("u1")),
        ]));
        document.rows_mut(Table::Leads).push(record(&[
            ("id", Value::from("l2")),
            ("assigned_to", Value::from("u9")),
        ]));

        let rows = select(
            &document,
            "SELECT l.*, u.name as assigned_name FROM leads l LEFT JOIN users u ON l.assigned_to = u.id ORDER BY l.id",
            &[],
        );
        assert_eq!(rows[0]["assigned_name"], Value::from("Alice"));
        assert_eq!(rows[0]["assigned_email"], Value::from("alice@example.com"));
        assert_eq!(rows[1], document.rows("leads")[1]);

        // The stored rows are untouched
        assert!(!document.rows("leads")[0].contains_key("assigned_name"));
    }

    #[test]
    fn test_lead_join_backfills_company() {
        let mut document = Document::new();
        document.rows_mut(Table::Leads).push(record(&[
            ("id", Value::from("l1")),
            ("name", Value::from("Jane Roe")),
            ("company", Value::from("Acme")),
        ]));
        document.rows_mut(Table::Activities).push(record(&[
            ("id", Value::from("a1")),
            ("lead_id", Value::from("l1")),
        ]));

        let rows = select(
            &document,
            "SELECT a.*, l.name as lead_name FROM activities a LEFT OUTER JOIN leads l ON a.lead_id = l.id",
            &[],
        );
        assert_eq!(rows[0]["lead_name"], Value::from("Jane Roe"));
        assert_eq!(rows[0]["company"], Value::from("Acme"));
    }

    #[test]
    fn test_order_and_pagination() {
        let document = leads_document();
        let rows = select(&document, "SELECT * FROM leads ORDER BY id ASC LIMIT 2 OFFSET 2", &[]);
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![Value::from("l3"), Value::from("l4")]);

        let rows = select(
            &document,
            "SELECT * FROM leads WHERE source = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
            &[Value::from("Web"), Value::Integer(1), Value::Integer(1)],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], Value::from("l2"));
    }

    #[test]
    fn test_order_by_sorts_missing_as_empty() {
        let mut document = Document::new();
        document.rows_mut(Table::Tasks).push(record(&[("id", Value::from("t1")), ("due", Value::from("2024-03-01"))]));
        document.rows_mut(Table::Tasks).push(record(&[("id", Value::from("t2"))]));

        let rows = select(&document, "SELECT * FROM tasks ORDER BY due", &[]);
        assert_eq!(rows[0]["id"], Value::from("t2"));
    }

    #[test]
    fn test_unknown_table_select_is_empty() {
        let document = leads_document();
        assert!(select(&document, "SELECT * FROM invoices", &[]).is_empty());
    }
}
