use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{DbError, Result};

/// A scalar value as returned by the query-execution layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Extract an integer value.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Integer(i) => Ok(*i),
            other => Err(DbError::TypeMismatch(format!(
                "expected INTEGER, got {}",
                other.type_name()
            ))),
        }
    }

    /// Extract a float value. Integers are implicitly widened.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Self::Float(f) => Ok(*f),
            Self::Integer(i) => Ok(*i as f64),
            other => Err(DbError::TypeMismatch(format!(
                "expected FLOAT, got {}",
                other.type_name()
            ))),
        }
    }

    /// Extract a text value.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(DbError::TypeMismatch(format!(
                "expected TEXT, got {}",
                other.type_name()
            ))),
        }
    }

    /// Extract a boolean value.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(DbError::TypeMismatch(format!(
                "expected BOOLEAN, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}
