//! Scalar values carried by datasets and query parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single cell value.
///
/// Equality is numeric-aware: `Int(10)` equals `Float(10.0)`, because the
/// same number often comes back from the database with a different width
/// than it went in with. `Null` equals `Null` so that keys containing
/// missing values still join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// The type of a non-null [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
}

#[derive(PartialEq, Eq, Hash)]
enum CanonicalKey<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(&'a str),
}

impl Value {
    /// Kind of this value, `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Text(_) => Some(ValueKind::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Infer a typed value from a raw text cell.
    ///
    /// Empty cells become `Null`; integers, floats and `true`/`false` are
    /// recognised, everything else stays text. Numbers whose written form
    /// would not survive a round trip (`007`, `+5`) stay text.
    pub fn infer(raw: &str) -> Value {
        if raw.is_empty() {
            return Value::Null;
        }
        if !is_canonical_number(raw) {
            return Value::Text(raw.to_string());
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        match raw {
            "true" | "TRUE" | "True" => Value::Bool(true),
            "false" | "FALSE" | "False" => Value::Bool(false),
            _ => Value::Text(raw.to_string()),
        }
    }

    /// Convert this value to `kind` where a lossless conversion exists.
    ///
    /// Values that cannot be converted are returned unchanged, so a later
    /// comparison reports them as a mismatch instead of failing here.
    pub fn coerce_to(self, kind: ValueKind) -> Value {
        match (self, kind) {
            (Value::Int(i), ValueKind::Float) => Value::Float(i as f64),
            (Value::Int(i), ValueKind::Text) => Value::Text(i.to_string()),
            (Value::Int(i), ValueKind::Bool) if i == 0 || i == 1 => Value::Bool(i == 1),
            (Value::Float(f), ValueKind::Int) if is_integral(f) => Value::Int(f as i64),
            (Value::Float(f), ValueKind::Text) => Value::Text(f.to_string()),
            (Value::Bool(b), ValueKind::Int) => Value::Int(i64::from(b)),
            (Value::Bool(b), ValueKind::Text) => Value::Text(b.to_string()),
            (Value::Text(s), ValueKind::Int) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Text(s),
            },
            (Value::Text(s), ValueKind::Float) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => Value::Text(s),
            },
            (Value::Text(s), ValueKind::Bool) => match s.to_ascii_lowercase().as_str() {
                "true" | "t" => Value::Bool(true),
                "false" | "f" => Value::Bool(false),
                _ => Value::Text(s),
            },
            (value, _) => value,
        }
    }

    fn canonical(&self) -> CanonicalKey<'_> {
        match self {
            Value::Null => CanonicalKey::Null,
            Value::Bool(b) => CanonicalKey::Bool(*b),
            Value::Int(i) => CanonicalKey::Int(*i),
            Value::Float(f) if is_integral(*f) => CanonicalKey::Int(*f as i64),
            Value::Float(f) if f.is_nan() => CanonicalKey::Float(f64::NAN.to_bits()),
            Value::Float(f) => CanonicalKey::Float(f.to_bits()),
            Value::Text(s) => CanonicalKey::Text(s),
        }
    }
}

/// False for numeric text with a leading `+` or a zero-padded integer part.
fn is_canonical_number(raw: &str) -> bool {
    if raw.starts_with('+') {
        return false;
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw).as_bytes();
    !(digits.len() > 1 && digits[0] == b'0' && digits[1].is_ascii_digit())
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod tests;
