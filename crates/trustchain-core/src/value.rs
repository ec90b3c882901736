//! The closed value model accepted by the canonicalizer.
//!
//! Payloads arrive as arbitrary JSON. Rather than canonicalizing
//! `serde_json::Value` directly, they are lowered into [`CanonicalValue`],
//! whose object variant is an ordered map: key order is part of the type.

use std::collections::BTreeMap;

use crate::error::Result;

/// A JSON number as it was received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    /// Whether the number can be rendered (non-finite floats cannot).
    pub fn is_finite(&self) -> bool {
        match self {
            Number::Int(_) | Number::UInt(_) => true,
            Number::Float(f) => f.is_finite(),
        }
    }
}

impl From<&serde_json::Number> for Number {
    fn from(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Number::Int(i)
        } else if let Some(u) = n.as_u64() {
            Number::UInt(u)
        } else {
            Number::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

/// A structured value with deterministic key order.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<CanonicalValue>),
    Object(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Parse JSON text into a canonical value.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Ok(Self::from(&value))
    }

    /// Build an object from `(key, value)` pairs in any order.
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, CanonicalValue)>,
    {
        CanonicalValue::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<&serde_json::Value> for CanonicalValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CanonicalValue::Null,
            serde_json::Value::Bool(b) => CanonicalValue::Bool(*b),
            serde_json::Value::Number(n) => CanonicalValue::Number(n.into()),
            serde_json::Value::String(s) => CanonicalValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                CanonicalValue::Array(items.iter().map(CanonicalValue::from).collect())
            }
            serde_json::Value::Object(map) => CanonicalValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), CanonicalValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for CanonicalValue {
    fn from(value: serde_json::Value) -> Self {
        CanonicalValue::from(&value)
    }
}

impl From<bool> for CanonicalValue {
    fn from(b: bool) -> Self {
        CanonicalValue::Bool(b)
    }
}

impl From<i64> for CanonicalValue {
    fn from(i: i64) -> Self {
        CanonicalValue::Number(Number::Int(i))
    }
}

impl From<u64> for CanonicalValue {
    fn from(u: u64) -> Self {
        CanonicalValue::Number(Number::UInt(u))
    }
}

impl From<f64> for CanonicalValue {
    fn from(f: f64) -> Self {
        CanonicalValue::Number(Number::Float(f))
    }
}

impl From<&str> for CanonicalValue {
    fn from(s: &str) -> Self {
        CanonicalValue::String(s.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(s: String) -> Self {
        CanonicalValue::String(s)
    }
}

impl<T: Into<CanonicalValue>> From<Vec<T>> for CanonicalValue {
    fn from(items: Vec<T>) -> Self {
        CanonicalValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CanonicalValue>> From<Option<T>> for CanonicalValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(CanonicalValue::Null, Into::into)
    }
}
