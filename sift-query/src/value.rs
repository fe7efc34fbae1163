//! Values carried by filter expressions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The value an expression compares its column against.
///
/// The wire shape is untagged, so a value serializes to a plain JSON boolean,
/// number, string, string array or array of string arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value (ids, counts).
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value (text, dates, enum names).
    String(String),
    /// List of strings (id lists, keyword lists).
    List(Vec<String>),
    /// List of string tuples (composite span annotation references).
    Nested(Vec<Vec<String>>),
}

impl FilterValue {
    /// An empty string list.
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// Name of the value's shape, used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Nested(_) => "nested",
        }
    }

    /// Get the string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "'{}'", s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Nested(rows) => {
                let rows: Vec<String> = rows.iter().map(|r| format!("({})", r.join(", "))).collect();
                write!(f, "[{}]", rows.join(", "))
            }
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(v: Vec<&str>) -> Self {
        Self::List(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<Vec<String>>> for FilterValue {
    fn from(v: Vec<Vec<String>>) -> Self {
        Self::Nested(v)
    }
}
