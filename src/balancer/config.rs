use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{DbError, Dialect, Result};

/// Balancer configuration
///
/// Describes a full topology: the driver and dialect shared by every
/// connection, the `;`-separated DSN list (first non-empty entry is the
/// master), and optional pool-tuning knobs applied across the topology
/// after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Driver the factory opens every connection with.
    pub driver: String,

    /// Dialect handed to the factory for query generation.
    pub dialect: Dialect,

    /// `;`-separated DSN list; position 0 is the master.
    pub sources: String,

    /// Idle-connection cap, if set.
    #[serde(default)]
    pub max_idle_conns: Option<usize>,

    /// Open-connection cap, if set.
    #[serde(default)]
    pub max_open_conns: Option<usize>,

    /// Maximum connection lifetime, if set.
    #[serde(default, with = "humantime_serde")]
    pub conn_max_lifetime: Option<Duration>,
}

impl BalancerConfig {
    /// Create a configuration with no pool tuning.
    pub fn new(driver: &str, dialect: Dialect, sources: &str) -> Self {
        Self {
            driver: driver.to_string(),
            dialect,
            sources: sources.to_string(),
            max_idle_conns: None,
            max_open_conns: None,
            conn_max_lifetime: None,
        }
    }

    /// Set the idle-connection cap.
    pub fn max_idle_conns(mut self, n: usize) -> Self {
        self.max_idle_conns = Some(n);
        self
    }

    /// Set the open-connection cap.
    pub fn max_open_conns(mut self, n: usize) -> Self {
        self.max_open_conns = Some(n);
        self
    }

    /// Set the maximum connection lifetime.
    pub fn conn_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.conn_max_lifetime = Some(lifetime);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.driver.is_empty() {
            return Err(DbError::ConfigError("driver cannot be empty".into()));
        }

        if !self.sources.split(';').any(|dsn| !dsn.is_empty()) {
            return Err(DbError::ConfigError("empty data source list".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let config = BalancerConfig::new("postgres", Dialect::Postgres, "A;B")
            .max_idle_conns(5)
            .max_open_conns(20)
            .conn_max_lifetime(Duration::from_secs(1800));

        assert_eq!(config.driver, "postgres");
        assert_eq!(config.sources, "A;B");
        assert_eq!(config.max_idle_conns, Some(5));
        assert_eq!(config.max_open_conns, Some(20));
        assert_eq!(config.conn_max_lifetime, Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_validate() {
        let valid = BalancerConfig::new("postgres", Dialect::Postgres, "A;B");
        assert!(valid.validate().is_ok());

        let no_driver = BalancerConfig::new("", Dialect::Postgres, "A");
        assert!(no_driver.validate().is_err());

        let no_sources = BalancerConfig::new("postgres", Dialect::Postgres, ";;");
        assert!(no_sources.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_humantime_lifetime() {
        let config: BalancerConfig = serde_json::from_str(
            r#"{
                "driver": "mysql",
                "dialect": "mysql",
                "sources": "master-dsn;replica-dsn",
                "max_open_conns": 50,
                "conn_max_lifetime": "30m"
            }"#,
        )
        .unwrap();

        assert_eq!(config.driver, "mysql");
        assert_eq!(config.dialect, Dialect::MySql);
        assert_eq!(config.max_idle_conns, None);
        assert_eq!(config.max_open_conns, Some(50));
        assert_eq!(config.conn_max_lifetime, Some(Duration::from_secs(1800)));
        assert!(config.validate().is_ok());
    }
}
