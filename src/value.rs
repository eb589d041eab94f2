use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum characters in a snapshot preview before truncation.
pub const PREVIEW_LIMIT: usize = 60;

// 値の型システム
//
// Snippet values are a closed tagged variant rather than anything
// reflective: everything a snippet can bind, persist, or print is one of
// these. Maps are ordered (BTreeMap) so rendering is deterministic.
#[derive(Clone, Debug, PartialEq, Default, Deserialize, Serialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    #[default]
    Null,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Null => "null",
        }
    }

    /// Approximate in-memory size in bytes, counting heap payloads of
    /// nested containers.
    pub fn approx_size(&self) -> usize {
        let base = std::mem::size_of::<Value>();
        match self {
            Value::Str(s) => base + s.len(),
            Value::List(items) => base + items.iter().map(Value::approx_size).sum::<usize>(),
            Value::Map(entries) => {
                base + entries
                    .iter()
                    .map(|(k, v)| k.len() + v.approx_size())
                    .sum::<usize>()
            }
            _ => base,
        }
    }

    /// Source-like rendering: strings quoted, containers in literal syntax.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s),
            _ => self.to_string(),
        }
    }

    /// Bounded printable preview for introspection, truncated with an
    /// ellipsis marker past [`PREVIEW_LIMIT`] characters.
    pub fn preview(&self) -> String {
        let repr = self.repr();
        if repr.chars().count() > PREVIEW_LIMIT {
            let head: String = repr.chars().take(PREVIEW_LIMIT - 3).collect();
            format!("{}...", head)
        } else {
            repr
        }
    }

    pub fn is_truthy(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view used by the statistics helper and comparisons.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, v.repr()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Null => write!(f, "null"),
        }
    }
}
