pub mod config;
mod query;

pub use config::BalancerConfig;
pub use query::BalancedStatement;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::core::{DbError, Dialect, Result};
use crate::interface::{ConnectionFactory, QueryConnection};

/// Master/replica topology router
///
/// Owns one master connection and an ordered set of read targets, sending
/// writes to the master and distributing reads across the targets with a
/// round-robin rotation. The master can be promoted into (or demoted out of)
/// the read rotation at runtime.
///
/// Under concurrent callers the rotation is eventually uniform rather than
/// strictly fair: two racing selections may land on the same index or skip
/// one. Sequential callers cycle through the targets in insertion order.
pub struct Balancer<C: QueryConnection> {
    /// Write connection; the reference never changes after construction.
    master: Arc<C>,
    /// Dialect every connection of this topology was opened with.
    dialect: Dialect,
    /// Read rotation, replaced wholesale on reconfiguration.
    read_targets: RwLock<ReadTargets<C>>,
    /// Shared round-robin counter; only its value modulo the target count
    /// matters, wrapping is harmless.
    counter: AtomicU64,
}

/// Read-target set behind the topology lock.
///
/// `targets` is swapped for a freshly built sequence on every change, so a
/// reader that cloned the `Arc` indexes against a consistent snapshot even
/// while a reconfiguration is in flight.
struct ReadTargets<C> {
    targets: Arc<Vec<Arc<C>>>,
    master_readable: bool,
}

impl<C: QueryConnection> Balancer<C> {
    /// Open a connection for every entry of `sources`, a `;`-separated list
    /// of DSNs. The first non-empty entry becomes the master and the rest
    /// become replicas; empty entries (e.g. a trailing `;`) are skipped.
    /// With no replicas configured the master also serves reads.
    ///
    /// Fails on the first connection that cannot be established; no partial
    /// topology is returned.
    pub async fn connect<F>(
        factory: &F,
        driver: &str,
        dialect: Dialect,
        sources: &str,
    ) -> Result<Self>
    where
        F: ConnectionFactory<Conn = C>,
    {
        let mut master: Option<Arc<C>> = None;
        let mut targets: Vec<Arc<C>> = Vec::new();

        for dsn in sources.split(';') {
            if dsn.is_empty() {
                continue;
            }
            let conn = Arc::new(factory.connect(driver, dialect, dsn).await?);
            if master.is_none() {
                master = Some(conn);
            } else {
                targets.push(conn);
            }
        }

        let master =
            master.ok_or_else(|| DbError::ConfigError("empty data source list".into()))?;

        let master_readable = targets.is_empty();
        if master_readable {
            targets.push(Arc::clone(&master));
        }

        debug!(
            "balancer connected: driver={}, {} read target(s), master_readable={}",
            driver,
            targets.len(),
            master_readable
        );

        Ok(Self {
            master,
            dialect,
            read_targets: RwLock::new(ReadTargets {
                targets: Arc::new(targets),
                master_readable,
            }),
            counter: AtomicU64::new(0),
        })
    }

    /// Connect from a [`BalancerConfig`], applying its pool-tuning knobs
    /// across the topology afterwards.
    pub async fn connect_with_config<F>(factory: &F, config: &BalancerConfig) -> Result<Self>
    where
        F: ConnectionFactory<Conn = C>,
    {
        config.validate()?;

        let balancer =
            Self::connect(factory, &config.driver, config.dialect, &config.sources).await?;

        if let Some(n) = config.max_idle_conns {
            balancer.set_max_idle_conns(n);
        }
        if let Some(n) = config.max_open_conns {
            balancer.set_max_open_conns(n);
        }
        if let Some(lifetime) = config.conn_max_lifetime {
            balancer.set_conn_max_lifetime(Some(lifetime));
        }

        Ok(balancer)
    }

    /// The master connection; all writes resolve here.
    pub fn master(&self) -> Arc<C> {
        Arc::clone(&self.master)
    }

    /// The next read target, chosen round-robin.
    ///
    /// With a single read target the shared counter is left untouched.
    pub fn replica(&self) -> Arc<C> {
        let targets = Arc::clone(&self.read_targets.read().targets);
        if targets.len() == 1 {
            return Arc::clone(&targets[0]);
        }
        let turn = self.counter.fetch_add(1, Ordering::Relaxed);
        Arc::clone(&targets[(turn % targets.len() as u64) as usize])
    }

    /// Add the master to (`readable == true`) or remove it from
    /// (`readable == false`) the read rotation.
    ///
    /// Demoting the master when no replica is configured is rejected with
    /// [`DbError::TopologyError`] and leaves the topology unchanged: the
    /// read-target set must never become empty. Calls that change nothing
    /// succeed without effect.
    pub fn set_master_readable(&self, readable: bool) -> Result<()> {
        let mut state = self.read_targets.write();
        if readable == state.master_readable {
            return Ok(());
        }

        if readable {
            let mut targets = state.targets.as_ref().clone();
            targets.push(Arc::clone(&self.master));
            state.targets = Arc::new(targets);
        } else {
            let remaining: Vec<Arc<C>> = state
                .targets
                .iter()
                .filter(|conn| !Arc::ptr_eq(conn, &self.master))
                .cloned()
                .collect();
            if remaining.is_empty() {
                return Err(DbError::TopologyError(
                    "cannot demote the master: it is the only read target".into(),
                ));
            }
            state.targets = Arc::new(remaining);
        }

        state.master_readable = readable;
        debug!("master readable set to {}", readable);
        Ok(())
    }

    /// Whether the master currently serves reads.
    pub fn is_master_readable(&self) -> bool {
        self.read_targets.read().master_readable
    }

    /// Number of connections currently in the read rotation.
    pub fn read_target_count(&self) -> usize {
        self.read_targets.read().targets.len()
    }

    /// Dialect this topology was opened with.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Every connection of the topology: the master first, followed by the
    /// read targets in rotation order. The master appears a second time
    /// while it is readable; administrative fan-out uses the distinct set
    /// instead.
    pub fn get_all_dbs(&self) -> Vec<Arc<C>> {
        let targets = Arc::clone(&self.read_targets.read().targets);
        let mut all = Vec::with_capacity(targets.len() + 1);
        all.push(Arc::clone(&self.master));
        all.extend(targets.iter().cloned());
        all
    }

    /// Distinct connections of the topology, master first.
    fn distinct_connections(&self) -> Vec<Arc<C>> {
        let targets = Arc::clone(&self.read_targets.read().targets);
        let mut distinct = Vec::with_capacity(targets.len() + 1);
        distinct.push(Arc::clone(&self.master));
        distinct.extend(
            targets
                .iter()
                .filter(|conn| !Arc::ptr_eq(conn, &self.master))
                .cloned(),
        );
        distinct
    }

    /// Ping every distinct connection.
    ///
    /// Every connection is attempted even if one fails; on failure the error
    /// reported is the last one observed in master-first order. Individual
    /// failures are also logged.
    pub async fn ping(&self) -> Result<()> {
        let conns = self.distinct_connections();
        let results = join_all(conns.iter().map(|conn| conn.ping())).await;
        Self::aggregate("ping", results)
    }

    /// Cap the number of idle connections on every distinct connection.
    pub fn set_max_idle_conns(&self, n: usize) {
        for conn in self.distinct_connections() {
            conn.set_max_idle_conns(n);
        }
    }

    /// Cap the number of open connections on every distinct connection.
    pub fn set_max_open_conns(&self, n: usize) {
        for conn in self.distinct_connections() {
            conn.set_max_open_conns(n);
        }
    }

    /// Bound the connection lifetime on every distinct connection.
    pub fn set_conn_max_lifetime(&self, lifetime: Option<Duration>) {
        for conn in self.distinct_connections() {
            conn.set_conn_max_lifetime(lifetime);
        }
    }

    /// Enable query tracing on every connection, tagging replica output with
    /// `<replica>` and master output with `<master>`.
    pub fn trace_on(&self, prefix: &str) {
        let targets = Arc::clone(&self.read_targets.read().targets);
        for conn in targets.iter() {
            if !Arc::ptr_eq(conn, &self.master) {
                conn.trace_on(&format!("{} <replica>", prefix));
            }
        }
        self.master.trace_on(&format!("{} <master>", prefix));
    }

    /// Disable query tracing on every distinct connection.
    pub fn trace_off(&self) {
        for conn in self.distinct_connections() {
            conn.trace_off();
        }
    }

    /// Close every distinct connection. Every close is attempted even if an
    /// earlier one fails; the last error observed is reported. The balancer
    /// must not be used afterwards.
    pub async fn close(&self) -> Result<()> {
        let conns = self.distinct_connections();
        let results = join_all(conns.iter().map(|conn| conn.close())).await;
        Self::aggregate("close", results)
    }

    fn aggregate(op: &str, results: Vec<Result<()>>) -> Result<()> {
        let mut last_err = None;
        for result in results {
            if let Err(err) = result {
                warn!("{} failed on one connection: {}", op, err);
                last_err = Some(err);
            }
        }
        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
