use std::sync::Arc;

use crate::core::{Result, Row, Value};
use crate::interface::{PreparedStatement, QueryConnection};
use crate::result::QueryResult;

use super::Balancer;

/// Pass-through query surface.
///
/// Each method selects a connection once and delegates entirely to the
/// query-execution layer; results and errors are returned unchanged.
impl<C: QueryConnection> Balancer<C> {
    /// Fetch a single row by primary key from the next read target.
    pub async fn fetch_by_key(&self, table: &str, keys: &[Value]) -> Result<Option<Row>> {
        self.replica().fetch_by_key(table, keys).await
    }

    /// Run a row-returning query against the next read target.
    pub async fn select(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.replica().query(sql, params).await
    }

    /// Run a query expected to return at most one row against the next read
    /// target.
    pub async fn select_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        self.replica().query_one(sql, params).await
    }

    /// Scalar integer select; zero on no row or NULL.
    pub async fn select_int(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.replica().query_int(sql, params).await
    }

    /// Scalar integer select; `None` on no row or NULL.
    pub async fn select_nullable_int(&self, sql: &str, params: &[Value]) -> Result<Option<i64>> {
        self.replica().query_nullable_int(sql, params).await
    }

    /// Scalar float select; zero on no row or NULL.
    pub async fn select_float(&self, sql: &str, params: &[Value]) -> Result<f64> {
        self.replica().query_float(sql, params).await
    }

    /// Scalar float select; `None` on no row or NULL.
    pub async fn select_nullable_float(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<f64>> {
        self.replica().query_nullable_float(sql, params).await
    }

    /// Scalar string select; empty string on no row or NULL.
    pub async fn select_str(&self, sql: &str, params: &[Value]) -> Result<String> {
        self.replica().query_str(sql, params).await
    }

    /// Scalar string select; `None` on no row or NULL.
    pub async fn select_nullable_str(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<String>> {
        self.replica().query_nullable_str(sql, params).await
    }

    /// Run a data-modifying statement on the master.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.master().execute(sql, params).await
    }

    /// Prepare `sql` on every distinct connection of the topology, so the
    /// returned statement can run against whichever connection a later
    /// selection yields. The first preparation failure aborts.
    pub async fn prepare(&self, sql: &str) -> Result<BalancedStatement<'_, C>> {
        let conns = self.distinct_connections();
        let mut statements = Vec::with_capacity(conns.len());
        for conn in conns {
            let statement = conn.prepare(sql).await?;
            statements.push((conn, statement));
        }
        Ok(BalancedStatement {
            balancer: self,
            statements,
        })
    }
}

/// A statement prepared on every connection of the topology.
///
/// Writes run on the master's statement; queries run on the statement
/// belonging to the read target the balancer selects.
pub struct BalancedStatement<'a, C: QueryConnection> {
    balancer: &'a Balancer<C>,
    /// Master's statement first, then one per replica.
    statements: Vec<(Arc<C>, C::Statement)>,
}

impl<'a, C: QueryConnection> BalancedStatement<'a, C> {
    /// Run the statement as a query against the next read target.
    pub async fn query(&self, params: &[Value]) -> Result<QueryResult> {
        let reader = self.balancer.replica();
        self.statement_for(&reader).query(params).await
    }

    /// Run the statement as a write on the master.
    pub async fn execute(&self, params: &[Value]) -> Result<u64> {
        self.statements[0].1.execute(params).await
    }

    /// Statement prepared on `conn`. Replicas are never removed from the
    /// topology, so every selectable connection was prepared; the master's
    /// statement doubles as the fallback.
    fn statement_for(&self, conn: &Arc<C>) -> &C::Statement {
        self.statements
            .iter()
            .find(|(prepared, _)| Arc::ptr_eq(prepared, conn))
            .map(|(_, statement)| statement)
            .unwrap_or(&self.statements[0].1)
    }
}
