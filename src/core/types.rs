use serde::{Deserialize, Serialize};

use crate::core::Value;

/// A single result row.
pub type Row = Vec<Value>;

/// SQL dialect descriptor
///
/// Opaque to the balancer itself; it is handed to the connection factory for
/// each data source so the query-execution layer can generate dialect-specific
/// SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    /// Parse a dialect from its lowercase name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Dialect name as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}
