// ============================================================================
// DbBalance Library
// ============================================================================

pub mod balancer;
pub mod core;
pub mod interface;
pub mod result;

// Re-export main types for convenience
pub use crate::balancer::{BalancedStatement, Balancer, BalancerConfig};
pub use crate::core::{DbError, Dialect, Result, Row, Value};
pub use crate::result::QueryResult;

// Re-export collaborator contracts
pub use crate::interface::{
    ConnectionFactory, DatabaseConnection, PreparedStatement, QueryConnection,
};
