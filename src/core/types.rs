use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Result, StoreError, Value};

/// Declared type of a key component or scalar field, named as it appears in a
/// key-definition spec (`id:uuid`, `created:timestamp`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Uuid,
    Text,
    Integer,
    BigInt,
    Float,
    Double,
    Boolean,
    Timestamp,
    Blob,
}

impl DataType {
    /// Whether a value can be stored under this declared type as-is.
    pub fn is_compatible(&self, value: &Value) -> bool {
        match self {
            Self::Uuid => matches!(value, Value::Uuid(_)),
            Self::Text => matches!(value, Value::Text(_)),
            Self::Integer | Self::BigInt => matches!(value, Value::Integer(_)),
            Self::Float | Self::Double => matches!(value, Value::Float(_)),
            Self::Boolean => matches!(value, Value::Boolean(_)),
            Self::Timestamp => matches!(value, Value::Timestamp(_)),
            Self::Blob => matches!(value, Value::Bytes(_)),
        }
    }

    /// Coerce a value into this declared type, accepting the benign widenings
    /// a store driver would accept (integer to float, text to uuid/timestamp).
    /// Null passes through untouched.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if value.is_null() || self.is_compatible(&value) {
            return Ok(value);
        }

        let coerced = match (self, &value) {
            (Self::Float | Self::Double, Value::Integer(v)) => Some(Value::Float(*v as f64)),
            (Self::Uuid, Value::Text(v)) => Uuid::parse_str(v).ok().map(Value::Uuid),
            (Self::Timestamp, Value::Text(v)) => DateTime::parse_from_rfc3339(v)
                .ok()
                .map(|ts| Value::Timestamp(ts.with_timezone(&Utc))),
            (Self::Text, Value::Uuid(v)) => Some(Value::Text(v.to_string())),
            _ => None,
        };

        coerced.ok_or_else(|| {
            StoreError::TypeMismatch(format!(
                "expected {}, got {}",
                self,
                value.type_name()
            ))
        })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uuid => "uuid",
            Self::Text => "text",
            Self::Integer => "int",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Blob => "blob",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DataType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" | "timeuuid" => Ok(Self::Uuid),
            "text" | "varchar" | "ascii" => Ok(Self::Text),
            "int" | "integer" => Ok(Self::Integer),
            "bigint" | "counter" => Ok(Self::BigInt),
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "boolean" | "bool" => Ok(Self::Boolean),
            "timestamp" => Ok(Self::Timestamp),
            "blob" => Ok(Self::Blob),
            other => Err(StoreError::KeyDefinition(format!(
                "unknown data type '{}'",
                other
            ))),
        }
    }
}
