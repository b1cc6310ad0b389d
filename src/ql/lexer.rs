//! Tokenizer for statement strings
//!
//! Statements are scanned once by the pest grammar in `grammar.pest` into a
//! flat token list; every classifier downstream matches on tokens rather
//! than raw text.

use std::fmt;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::core::errors::{Result, StoreError};
use crate::ql::ast::CompareOp;

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier or keyword, possibly qualified (`l.status`, `et.*`)
    Word(String),
    /// Single-quoted string literal, quotes removed
    Str(String),
    /// Numeric literal as written
    Number(String),
    /// Positional parameter `?`
    Placeholder,
    /// Comparison operator
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
    Star,
    Semicolon,
    /// Any other character
    Other(char),
}

impl Token {
    /// Check if the token is the given keyword (case-insensitive)
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// The word of a `Word` token
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "{}", w),
            Token::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::Number(n) => write!(f, "{}", n),
            Token::Placeholder => write!(f, "?"),
            Token::Op(op) => write!(f, "{}", op),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Star => write!(f, "*"),
            Token::Semicolon => write!(f, ";"),
            Token::Other(c) => write!(f, "{}", c),
        }
    }
}

#[derive(Parser)]
#[grammar = "ql/grammar.pest"]
struct StatementParser;

fn starts_operand(prev: Option<&Token>) -> bool {
    !matches!(
        prev,
        Some(Token::Word(_)) | Some(Token::Number(_)) | Some(Token::Str(_))
            | Some(Token::RParen) | Some(Token::Placeholder)
    )
}

/// Text of the single inner pair of a quoted token
fn inner_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|inner| inner.as_str().to_string())
        .unwrap_or_default()
}

/// Scan a statement into tokens
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let statement = StatementParser::parse(Rule::statement, input)
        .map_err(|e| StoreError::MalformedStatement(format!("Parse error: {}", e)))?
        .next()
        .ok_or_else(|| StoreError::MalformedStatement("Empty statement".to_string()))?;

    let mut tokens = Vec::new();
    let mut pairs = statement.into_inner().peekable();

    while let Some(pair) = pairs.next() {
        let token = match pair.as_rule() {
            Rule::string => Token::Str(inner_text(pair).replace("''", "'")),
            Rule::quoted_ident => Token::Word(inner_text(pair)),
            Rule::placeholder => Token::Placeholder,
            Rule::op_eq => Token::Op(CompareOp::Eq),
            Rule::op_ne => Token::Op(CompareOp::NotEq),
            Rule::op_lt => Token::Op(CompareOp::Lt),
            Rule::op_lte => Token::Op(CompareOp::Lte),
            Rule::op_gt => Token::Op(CompareOp::Gt),
            Rule::op_gte => Token::Op(CompareOp::Gte),
            Rule::number => Token::Number(pair.as_str().to_string()),
            Rule::word => Token::Word(pair.as_str().to_string()),
            Rule::minus => {
                // `-5` is a literal only where an operand may start
                let end = pair.as_span().end();
                let signed = starts_operand(tokens.last())
                    && pairs
                        .peek()
                        .is_some_and(|next| next.as_rule() == Rule::number && next.as_span().start() == end);
                match pairs.next_if(|_| signed) {
                    Some(number) => Token::Number(format!("-{}", number.as_str())),
                    None => Token::Other('-'),
                }
            }
            Rule::lparen => Token::LParen,
            Rule::rparen => Token::RParen,
            Rule::comma => Token::Comma,
            Rule::star => Token::Star,
            Rule::semicolon => Token::Semicolon,
            Rule::other => match pair.as_str().chars().next() {
                Some(c) => Token::Other(c),
                None => continue,
            },
            _ => continue,
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Split a token list on separators found outside parentheses
pub fn split_top_level<'a, F>(tokens: &'a [Token], is_separator: F) -> Vec<&'a [Token]>
where
    F: Fn(&Token) -> bool,
{
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            t if depth == 0 && is_separator(t) => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Position of the first token, outside parentheses, matching the predicate
pub fn find_top_level<F>(tokens: &[Token], from: usize, matches: F) -> Option<usize>
where
    F: Fn(&Token) -> bool,
{
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(from) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            t if depth == 0 && matches(t) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Index of the `)` closing the `(` at `open`
pub fn closing_paren(tokens: &[Token], open: usize) -> Option<usize> {
    if !matches!(tokens.get(open), Some(Token::LParen)) {
        return None;
    }
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Number of positional parameters in a token run
pub fn count_placeholders(tokens: &[Token]) -> usize {
    tokens.iter().filter(|t| matches!(t, Token::Placeholder)).count()
}

/// Rebuild readable text from tokens
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        let glue = i == 0
            || matches!(token, Token::Comma | Token::RParen)
            || matches!(tokens[i - 1], Token::LParen);
        if !glue {
            out.push(' ');
        }
        out.push_str(&token.to_string());
    }
    out
}

/// Field name with any table qualifier removed (`l.status` → `status`)
pub fn bare_field(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
