//! Scalar values crossing the binding boundary
//!
//! [`BindValue`] is what callers may bind: text, numbers, null and booleans.
//! [`Value`] is what the engine hands back for one column of a result row.

use serde::Serialize;

use crate::error::{Error, Result};

/// A value accepted as a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    /// Bound as integer 0 or 1
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

/// One column value of a fetched row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Returns `true` for SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! impl_integer_bind {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BindValue {
                fn from(value: $ty) -> Self {
                    BindValue::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_integer_bind!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for BindValue {
    fn from(value: f32) -> Self {
        BindValue::Real(f64::from(value))
    }
}

impl From<f64> for BindValue {
    fn from(value: f64) -> Self {
        BindValue::Real(value)
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        BindValue::Bool(value)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::Text(value.to_string())
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::Text(value)
    }
}

impl From<&String> for BindValue {
    fn from(value: &String) -> Self {
        BindValue::Text(value.clone())
    }
}

impl From<()> for BindValue {
    fn from(_: ()) -> Self {
        BindValue::Null
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(BindValue::Null, Into::into)
    }
}

/// Converts a JSON scalar. Arrays and objects are rejected here rather than
/// being handed to the engine.
impl TryFrom<serde_json::Value> for BindValue {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(BindValue::Null),
            serde_json::Value::Bool(b) => Ok(BindValue::Bool(b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(BindValue::Integer(i)),
                None => n.as_f64().map(BindValue::Real).ok_or_else(|| {
                    Error::InvalidParameter(format!("number {n} is out of range"))
                }),
            },
            serde_json::Value::String(s) => Ok(BindValue::Text(s)),
            serde_json::Value::Array(_) => Err(Error::InvalidParameter(
                "nested arrays cannot be bound".to_string(),
            )),
            serde_json::Value::Object(_) => Err(Error::InvalidParameter(
                "nested objects cannot be bound".to_string(),
            )),
        }
    }
}
