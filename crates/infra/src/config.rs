//! Ledger runtime configuration.

use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

pub const HEALTH_CHECK_INTERVAL_VAR: &str = "LEDGER_HEALTH_CHECK_INTERVAL_SECS";
pub const PROCESSOR_MAX_ATTEMPTS_VAR: &str = "LEDGER_PROCESSOR_MAX_ATTEMPTS";
pub const PROCESSOR_BASE_DELAY_VAR: &str = "LEDGER_PROCESSOR_BASE_DELAY_MS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Configuration of a running ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Interval of the supervisor's health sweep.
    pub health_check_interval: Duration,
    /// Retry policy for transient faults while processing a transfer.
    pub processor_retry: RetryPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(60),
            processor_retry: RetryPolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Load from process environment; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(HEALTH_CHECK_INTERVAL_VAR) {
            let secs = parse_positive(HEALTH_CHECK_INTERVAL_VAR, &raw)?;
            config.health_check_interval = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(PROCESSOR_MAX_ATTEMPTS_VAR) {
            let attempts = parse_positive(PROCESSOR_MAX_ATTEMPTS_VAR, &raw)?;
            config.processor_retry.max_attempts = u32::try_from(attempts)
                .map_err(|_| ConfigError::invalid(PROCESSOR_MAX_ATTEMPTS_VAR, &raw, "too large"))?;
        }

        if let Some(raw) = lookup(PROCESSOR_BASE_DELAY_VAR) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(PROCESSOR_BASE_DELAY_VAR, &raw, format!("{e}")))?;
            let retry = &mut config.processor_retry;
            retry.base_delay = Duration::from_millis(millis);
            retry.max_delay = retry.max_delay.max(retry.base_delay);
        }

        Ok(config)
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    pub fn with_processor_retry(mut self, policy: RetryPolicy) -> Self {
        self.processor_retry = policy;
        self
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ConfigError::invalid(var, raw, format!("{e}")))?;
    if value == 0 {
        return Err(ConfigError::invalid(var, raw, "must be greater than zero"));
    }
    Ok(value)
}
