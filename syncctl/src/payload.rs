//! Schema-less row payloads.
//!
//! A row pulled from a SQL source is stored as a [`Payload`]: column name to [`DocValue`].
//! The variant set is closed so a payload survives the trip through JSONB and back into
//! bound SQL parameters without losing whether a column held text, a number, or a boolean.
//!
//! Binary column values are stored as a single-entry mapping `{"$binary": "<base64>"}` (standard
//! alphabet, padded). `$binary` is never a valid column name, so the tag cannot collide with a
//! real nested value.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

const BINARY_TAG: &str = "$binary";

/// One row, keyed by column name.
pub type Payload = BTreeMap<String, DocValue>;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Map(BTreeMap<String, DocValue>),
}

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("arrays are not supported in record payloads")]
    ArrayValue,
    #[error("unsupported number {0}")]
    Number(String),
    #[error("record payload must be a JSON object")]
    NotAnObject,
}

impl DocValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DocValue::Null)
    }

    /// Wrap raw bytes from a binary column.
    pub fn binary(bytes: &[u8]) -> Self {
        DocValue::Map(BTreeMap::from([(BINARY_TAG.to_string(), DocValue::String(STANDARD.encode(bytes)))]))
    }

    /// The bytes of a value built by [`DocValue::binary`], if this is one.
    pub fn as_binary(&self) -> Option<Vec<u8>> {
        let DocValue::Map(map) = self else {
            return None;
        };
        match (map.len(), map.get(BINARY_TAG)) {
            (1, Some(DocValue::String(encoded))) => STANDARD.decode(encoded).ok(),
            _ => None,
        }
    }

    /// Render a scalar as the text used for record keys and equality filters.
    ///
    /// Returns `None` for nulls and nested mappings, which cannot identify a record.
    pub fn as_key(&self) -> Option<String> {
        match self {
            DocValue::Null | DocValue::Map(_) => None,
            DocValue::Bool(b) => Some(b.to_string()),
            DocValue::Integer(i) => Some(i.to_string()),
            DocValue::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Some(format!("{}", *f as i64)),
            DocValue::Float(f) => Some(f.to_string()),
            DocValue::String(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for DocValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocValue::Null => f.write_str("null"),
            DocValue::Bool(b) => write!(f, "{b}"),
            DocValue::Integer(i) => write!(f, "{i}"),
            DocValue::Float(x) => write!(f, "{x}"),
            DocValue::String(s) => f.write_str(s),
            DocValue::Map(_) => f.write_str(&serde_json::Value::from(self.clone()).to_string()),
        }
    }
}

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        DocValue::String(s.to_string())
    }
}

impl From<String> for DocValue {
    fn from(s: String) -> Self {
        DocValue::String(s)
    }
}

impl From<i64> for DocValue {
    fn from(i: i64) -> Self {
        DocValue::Integer(i)
    }
}

impl From<f64> for DocValue {
    fn from(f: f64) -> Self {
        DocValue::Float(f)
    }
}

impl From<bool> for DocValue {
    fn from(b: bool) -> Self {
        DocValue::Bool(b)
    }
}

impl From<DocValue> for serde_json::Value {
    fn from(value: DocValue) -> Self {
        match value {
            DocValue::Null => serde_json::Value::Null,
            DocValue::Bool(b) => serde_json::Value::Bool(b),
            DocValue::Integer(i) => serde_json::Value::from(i),
            // JSON has no NaN/inf; those become null
            DocValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            DocValue::String(s) => serde_json::Value::String(s),
            DocValue::Map(map) => serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl TryFrom<serde_json::Value> for DocValue {
    type Error = PayloadError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            serde_json::Value::Null => DocValue::Null,
            serde_json::Value::Bool(b) => DocValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    DocValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    DocValue::Float(f)
                } else {
                    return Err(PayloadError::Number(n.to_string()));
                }
            }
            serde_json::Value::String(s) => DocValue::String(s),
            serde_json::Value::Array(_) => return Err(PayloadError::ArrayValue),
            serde_json::Value::Object(map) => DocValue::Map(
                map.into_iter()
                    .map(|(k, v)| Ok((k, DocValue::try_from(v)?)))
                    .collect::<Result<_, PayloadError>>()?,
            ),
        })
    }
}

/// Convert a payload into the JSON object stored in the document table.
pub fn to_json(payload: &Payload) -> serde_json::Value {
    serde_json::Value::Object(payload.iter().map(|(k, v)| (k.clone(), v.clone().into())).collect())
}

/// Parse a stored JSON object back into a payload.
pub fn from_json(value: serde_json::Value) -> Result<Payload, PayloadError> {
    match DocValue::try_from(value)? {
        DocValue::Map(map) => Ok(map),
        _ => Err(PayloadError::NotAnObject),
    }
}
