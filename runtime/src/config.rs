//! Runtime configuration for the progression tracker.
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `VENUE_LADDER_PROVIDER_TIMEOUT_MS` | 5000 |
//! | `VENUE_LADDER_NOTIFY_TIMEOUT_MS` | 2000 |
//! | `VENUE_LADDER_RETRY_MAX` | 3 |
//! | `VENUE_LADDER_RETRY_INITIAL_DELAY_MS` | 100 |
//! | `VENUE_LADDER_RETRY_MAX_DELAY_MS` | 5000 |
//!
//! Absent or unparsable values fall back to the default.

use crate::retry::RetryPolicy;
use std::env;
use std::time::Duration;

/// Deadlines and retry policy for collaborator calls.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use venue_ladder_runtime::config::TrackerConfig;
/// use venue_ladder_runtime::retry::RetryPolicy;
///
/// let config = TrackerConfig::default()
///     .with_provider_timeout(Duration::from_secs(2))
///     .with_retry(RetryPolicy::none());
/// assert_eq!(config.retry.max_retries, 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Deadline for each bracket provider or venue directory call
    pub provider_timeout: Duration,
    /// Deadline for each notification; a late notification is dropped
    pub notify_timeout: Duration,
    /// Backoff for idempotent provider reads
    pub retry: RetryPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(5),
            notify_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Load from `VENUE_LADDER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .map_or(default, Duration::from_millis)
        };

        let retry = RetryPolicy::new()
            .with_max_retries(
                lookup("VENUE_LADDER_RETRY_MAX")
                    .and_then(|raw| raw.trim().parse().ok())
                    .unwrap_or(defaults.retry.max_retries),
            )
            .with_initial_delay(millis(
                "VENUE_LADDER_RETRY_INITIAL_DELAY_MS",
                defaults.retry.initial_delay,
            ))
            .with_max_delay(millis("VENUE_LADDER_RETRY_MAX_DELAY_MS", defaults.retry.max_delay));

        Self {
            provider_timeout: millis("VENUE_LADDER_PROVIDER_TIMEOUT_MS", defaults.provider_timeout),
            notify_timeout: millis("VENUE_LADDER_NOTIFY_TIMEOUT_MS", defaults.notify_timeout),
            retry,
        }
    }

    /// Set the provider call deadline
    #[must_use]
    pub const fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Set the notification deadline
    #[must_use]
    pub const fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
