use std::time::Duration;

use async_trait::async_trait;

use crate::core::{DbError, Dialect, Result, Row, Value};
use crate::result::QueryResult;

/// Administrative surface of one physical database connection (pool).
///
/// This trait allows writing routing code that is agnostic to the underlying
/// driver. Wrap a real connection pool (like sqlx's `Pool` or a
/// tokio-postgres client) to implement this trait for production use, or use
/// an in-memory fake for tests.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Verify the connection is still alive, re-establishing it if the
    /// underlying driver supports that.
    async fn ping(&self) -> Result<()>;

    /// Cap the number of idle connections retained by the underlying pool.
    fn set_max_idle_conns(&self, n: usize);

    /// Cap the number of concurrently open connections.
    fn set_max_open_conns(&self, n: usize);

    /// Bound how long a physical connection may be reused. `None` reuses
    /// connections forever.
    fn set_conn_max_lifetime(&self, lifetime: Option<Duration>);

    /// Close the connection, releasing every physical resource it holds.
    async fn close(&self) -> Result<()>;

    /// Enable query tracing with the given log prefix. No-op unless the
    /// implementation supports tracing.
    fn trace_on(&self, _prefix: &str) {}

    /// Disable query tracing.
    fn trace_off(&self) {}
}

/// Query surface of a connection.
///
/// Results and errors pass through the balancer verbatim; the scalar helpers
/// have default implementations on top of [`query`](QueryConnection::query)
/// which an implementation may override with driver-native variants.
#[async_trait]
pub trait QueryConnection: DatabaseConnection {
    type Statement: PreparedStatement;

    /// Run a row-returning query.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Run a data-modifying statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Fetch a single row by primary key.
    async fn fetch_by_key(&self, table: &str, keys: &[Value]) -> Result<Option<Row>>;

    /// Prepare a statement for repeated execution on this connection.
    async fn prepare(&self, sql: &str) -> Result<Self::Statement>;

    /// Run a query expected to return at most one row.
    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut result = self.query(sql, params).await?;
        if result.rows.len() > 1 {
            return Err(DbError::ExecutionError(format!(
                "expected at most one row, got {}",
                result.rows.len()
            )));
        }
        Ok(result.rows.pop())
    }

    /// Scalar integer query; `None` on no row or NULL.
    async fn query_nullable_int(&self, sql: &str, params: &[Value]) -> Result<Option<i64>> {
        match self.query_one(sql, params).await? {
            Some(row) => match row.into_iter().next() {
                None | Some(Value::Null) => Ok(None),
                Some(value) => value.as_int().map(Some),
            },
            None => Ok(None),
        }
    }

    /// Scalar integer query; zero on no row or NULL.
    async fn query_int(&self, sql: &str, params: &[Value]) -> Result<i64> {
        Ok(self.query_nullable_int(sql, params).await?.unwrap_or(0))
    }

    /// Scalar float query; `None` on no row or NULL.
    async fn query_nullable_float(&self, sql: &str, params: &[Value]) -> Result<Option<f64>> {
        match self.query_one(sql, params).await? {
            Some(row) => match row.into_iter().next() {
                None | Some(Value::Null) => Ok(None),
                Some(value) => value.as_float().map(Some),
            },
            None => Ok(None),
        }
    }

    /// Scalar float query; zero on no row or NULL.
    async fn query_float(&self, sql: &str, params: &[Value]) -> Result<f64> {
        Ok(self.query_nullable_float(sql, params).await?.unwrap_or(0.0))
    }

    /// Scalar string query; `None` on no row or NULL.
    async fn query_nullable_str(&self, sql: &str, params: &[Value]) -> Result<Option<String>> {
        match self.query_one(sql, params).await? {
            Some(row) => match row.into_iter().next() {
                None | Some(Value::Null) => Ok(None),
                Some(Value::Text(s)) => Ok(Some(s)),
                Some(other) => Err(DbError::TypeMismatch(format!(
                    "expected TEXT, got {}",
                    other.type_name()
                ))),
            },
            None => Ok(None),
        }
    }

    /// Scalar string query; empty string on no row or NULL.
    async fn query_str(&self, sql: &str, params: &[Value]) -> Result<String> {
        Ok(self
            .query_nullable_str(sql, params)
            .await?
            .unwrap_or_default())
    }
}

/// A statement prepared on a single connection.
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    /// Run the statement as a row-returning query.
    async fn query(&self, params: &[Value]) -> Result<QueryResult>;

    /// Run the statement as a data-modifying command, returning the number of
    /// affected rows.
    async fn execute(&self, params: &[Value]) -> Result<u64>;
}

/// A factory for establishing connections.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Conn: QueryConnection;

    /// Establish a connection (pool) for a single data source.
    async fn connect(&self, driver: &str, dialect: Dialect, dsn: &str) -> Result<Self::Conn>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Connection that answers every query with the same canned rows.
    struct CannedConn {
        rows: Vec<Row>,
    }

    struct CannedStmt;

    #[async_trait]
    impl PreparedStatement for CannedStmt {
        async fn query(&self, _params: &[Value]) -> Result<QueryResult> {
            Ok(QueryResult::empty())
        }

        async fn execute(&self, _params: &[Value]) -> Result<u64> {
            Ok(0)
        }
    }

    #[async_trait]
    impl DatabaseConnection for CannedConn {
        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn set_max_idle_conns(&self, _n: usize) {}

        fn set_max_open_conns(&self, _n: usize) {}

        fn set_conn_max_lifetime(&self, _lifetime: Option<Duration>) {}

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl QueryConnection for CannedConn {
        type Statement = CannedStmt;

        async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            Ok(QueryResult::new(vec!["value".into()], self.rows.clone()))
        }

        async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<u64> {
            Ok(0)
        }

        async fn fetch_by_key(&self, _table: &str, _keys: &[Value]) -> Result<Option<Row>> {
            Ok(self.rows.first().cloned())
        }

        async fn prepare(&self, _sql: &str) -> Result<CannedStmt> {
            Ok(CannedStmt)
        }
    }

    fn conn(rows: Vec<Row>) -> CannedConn {
        CannedConn { rows }
    }

    #[test]
    fn test_query_one() {
        tokio_test::block_on(async {
            let empty = conn(vec![]);
            assert!(empty.query_one("SELECT 1", &[]).await.unwrap().is_none());

            let single = conn(vec![vec![Value::Integer(1)]]);
            assert_eq!(
                single.query_one("SELECT 1", &[]).await.unwrap(),
                Some(vec![Value::Integer(1)])
            );

            let multi = conn(vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
            assert!(matches!(
                multi.query_one("SELECT 1", &[]).await,
                Err(DbError::ExecutionError(_))
            ));
        });
    }

    #[test]
    fn test_query_int_zero_value() {
        tokio_test::block_on(async {
            let empty = conn(vec![]);
            assert_eq!(empty.query_int("SELECT 1", &[]).await.unwrap(), 0);
            assert_eq!(empty.query_nullable_int("SELECT 1", &[]).await.unwrap(), None);

            let null = conn(vec![vec![Value::Null]]);
            assert_eq!(null.query_int("SELECT 1", &[]).await.unwrap(), 0);

            let value = conn(vec![vec![Value::Integer(42)]]);
            assert_eq!(value.query_int("SELECT 1", &[]).await.unwrap(), 42);
            assert_eq!(
                value.query_nullable_int("SELECT 1", &[]).await.unwrap(),
                Some(42)
            );
        });
    }

    #[test]
    fn test_query_int_type_mismatch() {
        tokio_test::block_on(async {
            let text = conn(vec![vec![Value::Text("42".into())]]);
            assert!(matches!(
                text.query_int("SELECT 1", &[]).await,
                Err(DbError::TypeMismatch(_))
            ));
        });
    }

    #[test]
    fn test_query_float_widens_integers() {
        tokio_test::block_on(async {
            let value = conn(vec![vec![Value::Integer(3)]]);
            assert_eq!(value.query_float("SELECT 1", &[]).await.unwrap(), 3.0);

            let empty = conn(vec![]);
            assert_eq!(empty.query_float("SELECT 1", &[]).await.unwrap(), 0.0);
        });
    }

    #[test]
    fn test_query_str() {
        tokio_test::block_on(async {
            let value = conn(vec![vec![Value::Text("alice".into())]]);
            assert_eq!(value.query_str("SELECT 1", &[]).await.unwrap(), "alice");

            let null = conn(vec![vec![Value::Null]]);
            assert_eq!(null.query_str("SELECT 1", &[]).await.unwrap(), "");
            assert_eq!(null.query_nullable_str("SELECT 1", &[]).await.unwrap(), None);

            let int = conn(vec![vec![Value::Integer(1)]]);
            assert!(matches!(
                int.query_str("SELECT 1", &[]).await,
                Err(DbError::TypeMismatch(_))
            ));
        });
    }
}
