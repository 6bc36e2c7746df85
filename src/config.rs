//! Validated, typed configuration surface. A [`Config`] is always valid by
//! construction — [`ConfigBuilder::build`] validates eagerly, so every
//! downstream component can assume its invariants hold without
//! re-checking.

use std::time::Duration;

use crate::model::ConfigSnapshot;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout_connect: Duration,
    pub timeout_read: Duration,
    pub timeout_write: Duration,
    pub timeout_pool: Duration,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub max_backoff: Duration,
    pub total_retry_budget: Duration,
}

#[derive(Debug, Clone)]
pub struct ThrottlingConfig {
    pub min_wait_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct CheckpointConfig {
    pub enabled: bool,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct TimeSeriesConfig {
    pub enable_layer_auto_partition: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub user_agent: String,
    pub transport: TransportConfig,
    pub retry: RetryConfig,
    pub throttling: ThrottlingConfig,
    pub checkpoint: CheckpointConfig,
    pub timeseries: TimeSeriesConfig,
}

impl Config {
    pub fn builder(base_url: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(base_url)
    }

    /// The subset of configuration whose change invalidates a saved
    /// checkpoint.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            max_attempts: self.retry.max_attempts,
            max_backoff_seconds: self.retry.max_backoff.as_secs_f64(),
            total_retry_budget_seconds: self.retry.total_retry_budget.as_secs_f64(),
            min_wait_interval_seconds: self.throttling.min_wait_interval.as_secs_f64(),
            enable_layer_auto_partition: self.timeseries.enable_layer_auto_partition,
            checkpoint_enabled: self.checkpoint.enabled,
            checkpoint_ttl_seconds: self.checkpoint.ttl.as_secs(),
        }
    }
}

pub struct ConfigBuilder {
    base_url: String,
    user_agent: String,
    timeout_connect: Duration,
    timeout_read: Duration,
    timeout_write: Duration,
    timeout_pool: Duration,
    max_attempts: usize,
    max_backoff: Duration,
    total_retry_budget: Duration,
    min_wait_interval: Duration,
    checkpoint_enabled: bool,
    checkpoint_ttl: Duration,
    enable_layer_auto_partition: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base_url must not be empty")]
    EmptyBaseUrl,
    #[error("user_agent must not be empty")]
    EmptyUserAgent,
    #[error("transport timeouts must be > 0")]
    InvalidTimeout,
    #[error("retry.max_attempts must be >= 1")]
    InvalidMaxAttempts,
    #[error("checkpoint.ttl_seconds must be > 0")]
    InvalidCheckpointTtl,
}

impl ConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: "boj-api-client/0.1".to_string(),
            timeout_connect: Duration::from_secs(10),
            timeout_read: Duration::from_secs(30),
            timeout_write: Duration::from_secs(30),
            timeout_pool: Duration::from_secs(30),
            max_attempts: 3,
            max_backoff: Duration::from_secs(30),
            total_retry_budget: Duration::from_secs(60),
            min_wait_interval: Duration::from_millis(200),
            checkpoint_enabled: false,
            checkpoint_ttl: Duration::from_secs(3600),
            enable_layer_auto_partition: false,
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeouts(
        mut self,
        connect: Duration,
        read: Duration,
        write: Duration,
        pool: Duration,
    ) -> Self {
        self.timeout_connect = connect;
        self.timeout_read = read;
        self.timeout_write = write;
        self.timeout_pool = pool;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn total_retry_budget(mut self, budget: Duration) -> Self {
        self.total_retry_budget = budget;
        self
    }

    pub fn min_wait_interval(mut self, interval: Duration) -> Self {
        self.min_wait_interval = interval;
        self
    }

    pub fn checkpoint(mut self, enabled: bool, ttl: Duration) -> Self {
        self.checkpoint_enabled = enabled;
        self.checkpoint_ttl = ttl;
        self
    }

    pub fn enable_layer_auto_partition(mut self, enable: bool) -> Self {
        self.enable_layer_auto_partition = enable;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }
        for timeout in [self.timeout_connect, self.timeout_read, self.timeout_write, self.timeout_pool]
        {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidTimeout);
            }
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if self.checkpoint_enabled && self.checkpoint_ttl.is_zero() {
            return Err(ConfigError::InvalidCheckpointTtl);
        }

        Ok(Config {
            base_url: self.base_url,
            user_agent: self.user_agent,
            transport: TransportConfig {
                timeout_connect: self.timeout_connect,
                timeout_read: self.timeout_read,
                timeout_write: self.timeout_write,
                timeout_pool: self.timeout_pool,
            },
            retry: RetryConfig {
                max_attempts: self.max_attempts,
                max_backoff: self.max_backoff,
                total_retry_budget: self.total_retry_budget,
            },
            throttling: ThrottlingConfig { min_wait_interval: self.min_wait_interval },
            checkpoint: CheckpointConfig { enabled: self.checkpoint_enabled, ttl: self.checkpoint_ttl },
            timeseries: TimeSeriesConfig {
                enable_layer_auto_partition: self.enable_layer_auto_partition,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_base_url_is_rejected() {
        assert_eq!(Config::builder("").build().unwrap_err(), ConfigError::EmptyBaseUrl);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Config::builder("https://example.test")
            .timeouts(Duration::from_secs(0), Duration::from_secs(1), Duration::from_secs(1), Duration::from_secs(1))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout);
    }

    #[test]
    fn valid_config_builds_and_snapshots() {
        let config = Config::builder("https://example.test")
            .max_attempts(5)
            .checkpoint(true, Duration::from_secs(120))
            .build()
            .unwrap();
        let snapshot = config.snapshot();
        assert_eq!(snapshot.max_attempts, 5);
        assert!(snapshot.checkpoint_enabled);
        assert_eq!(snapshot.checkpoint_ttl_seconds, 120);
    }

    #[test]
    fn checkpoint_enabled_with_zero_ttl_is_rejected() {
        let err = Config::builder("https://example.test")
            .checkpoint(true, Duration::from_secs(0))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidCheckpointTtl);
    }
}
