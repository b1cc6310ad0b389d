//! Value module for crmql
//!
//! This module defines the Value enum, the scalar stored in every
//! record field and passed as a positional statement parameter.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// The scalar values a record field or a statement parameter can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl Value {
    /// Build a number, collapsing integral floats to integers
    pub fn number(n: f64) -> Self {
        if !n.is_finite() {
            return Value::Integer(0);
        }
        if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
            Value::Integer(n as i64)
        } else {
            Value::Float(n)
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is a boolean
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// Check if the value is an integer
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    /// Check if the value is a float
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Check if the value is a number (integer or float)
    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Check if the value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Get a string representation of the value's type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    /// Borrow the inner string, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Loose string form used by equality and set membership.
    ///
    /// Null renders as the empty string, integral floats drop their
    /// fractional part so `5`, `5.0` and `"5"` all read `5`.
    pub fn as_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.clone(),
        }
    }

    /// Numeric reading of the value, zero when it has none
    pub fn numeric_or_zero(&self) -> f64 {
        let n = match self {
            Value::Null => 0.0,
            Value::Boolean(b) => if *b { 1.0 } else { 0.0 },
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(0.0)
                }
            }
        };
        if n.is_finite() { n } else { 0.0 }
    }

    /// Truthiness as the statement callers understand it
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Natural ordering without string coercion.
    ///
    /// Numbers (and booleans) order numerically, strings lexically.
    /// Mixed kinds and nulls have no ordering.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::String(_), _) | (_, Value::String(_)) => None,
            (l, r) => l.numeric_or_zero().partial_cmp(&r.numeric_or_zero()),
        }
    }

    /// Same-kind equality; integers and floats compare numerically
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(l), Value::Boolean(r)) => l == r,
            (Value::String(l), Value::String(r)) => l == r,
            (l, r) if l.is_number() && r.is_number() => {
                l.numeric_or_zero() == r.numeric_or_zero()
            }
            _ => false,
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// Format a Value as a string
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", format_float(*fl)),
            Value::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(json))
    }
}

/// Nested arrays and objects are kept as their JSON text
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            nested => Value::String(nested.to_string()),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
        }
    }
}

/// Convert from common types to Value
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Integer(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types() {
        assert!(Value::Null.is_null());
        assert!(Value::Boolean(true).is_boolean());
        assert!(Value::Integer(42).is_integer());
        assert!(Value::Float(3.14).is_float());
        assert!(Value::Integer(42).is_number());
        assert!(Value::Float(3.14).is_number());
        assert!(Value::String("Hello".to_string()).is_string());
    }

    #[test]
    fn test_value_conversion() {
        let int_value: Value = 42.into();
        let bool_value: Value = true.into();
        let string_value: Value = "Hello".into();
        let missing: Value = Option::<&str>::None.into();

        assert_eq!(int_value, Value::Integer(42));
        assert_eq!(bool_value, Value::Boolean(true));
        assert_eq!(string_value, Value::String("Hello".to_string()));
        assert_eq!(missing, Value::Null);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Float(3.14).to_string(), "3.14");
        assert_eq!(Value::String("Hello".to_string()).to_string(), "\"Hello\"");
    }

    #[test]
    fn test_loose_text_form() {
        assert_eq!(Value::Integer(5).as_text(), "5");
        assert_eq!(Value::Float(5.0).as_text(), "5");
        assert_eq!(Value::Float(1100.04).as_text(), "1100.04");
        assert_eq!(Value::Null.as_text(), "");
        assert_eq!(Value::from("5").as_text(), Value::Integer(5).as_text());
    }

    #[test]
    fn test_numeric_or_zero() {
        assert_eq!(Value::Integer(10).numeric_or_zero(), 10.0);
        assert_eq!(Value::from("12.5").numeric_or_zero(), 12.5);
        assert_eq!(Value::from("abc").numeric_or_zero(), 0.0);
        assert_eq!(Value::from("").numeric_or_zero(), 0.0);
        assert_eq!(Value::Null.numeric_or_zero(), 0.0);
        assert_eq!(Value::Boolean(true).numeric_or_zero(), 1.0);
    }

    #[test]
    fn test_compare_does_not_coerce_strings() {
        assert_eq!(Value::Integer(2).compare(&Value::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::from("10").compare(&Value::Integer(9)), None);
        assert_eq!(Value::Null.compare(&Value::Integer(0)), None);
    }

    #[test]
    fn test_strict_eq() {
        assert!(Value::Integer(1).strict_eq(&Value::Float(1.0)));
        assert!(!Value::Integer(1).strict_eq(&Value::from("1")));
        assert!(Value::from("u-1").strict_eq(&Value::from("u-1")));
    }

    #[test]
    fn test_number_collapses_integral_floats() {
        assert_eq!(Value::number(15.0), Value::Integer(15));
        assert_eq!(Value::number(2.5), Value::Float(2.5));
        assert_eq!(Value::number(f64::NAN), Value::Integer(0));
    }

    #[test]
    fn test_json_round_trip_keeps_nested_as_text() {
        let json = serde_json::json!({"a": [1, 2]});
        let value = Value::from(json["a"].clone());
        assert_eq!(value, Value::String("[1,2]".to_string()));

        let back: serde_json::Value = Value::Float(2.5).into();
        assert_eq!(back, serde_json::json!(2.5));
    }
}
