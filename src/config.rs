//! # Runtime Configuration
//!
//! Settings read once when an actor is constructed. Nothing here is mutated while an actor is
//! running. Every struct derives `serde` traits with `#[serde(default)]`, so an application can
//! load a partial document from whatever format it already uses and inherit the defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 500;

/// Default tick interval in microseconds.
pub const DEFAULT_TICK_INTERVAL_US: u64 = 10_000;

/// Default number of idle messages a pool keeps.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// What happens to buffered messages when a running actor observes its close signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Exit immediately; buffered messages go back to the pool undelivered.
    #[default]
    Discard,
    /// Dispatch everything already buffered, then exit.
    Drain,
}

/// Message pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Per-actor settings.
///
/// ```rust
/// use actor_mailbox::{ClosePolicy, RuntimeConfig};
///
/// let config = RuntimeConfig::named("shop")
///     .with_mailbox_capacity(100)
///     .with_close_policy(ClosePolicy::Drain);
/// assert_eq!(config.mailbox_capacity, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Name used in log fields.
    pub name: String,
    pub mailbox_capacity: usize,
    /// Tick interval in microseconds; zero is read as one.
    pub tick_interval_us: u64,
    pub close_policy: ClosePolicy,
    pub pool: PoolConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: "actor".to_string(),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            tick_interval_us: DEFAULT_TICK_INTERVAL_US,
            close_policy: ClosePolicy::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Sets the tick interval. Resolution is one microsecond; anything finer is truncated.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_us = u64::try_from(interval.as_micros()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }

    pub fn with_pooling(mut self, enabled: bool) -> Self {
        self.pool.enabled = enabled;
        self
    }

    /// Capacity actually used for the mailbox; zero falls back to the default.
    pub fn effective_capacity(&self) -> usize {
        if self.mailbox_capacity == 0 {
            DEFAULT_MAILBOX_CAPACITY
        } else {
            self.mailbox_capacity
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(self.tick_interval_us.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "name": "chat", "close_policy": "drain" }"#).unwrap();
        assert_eq!(config.name, "chat");
        assert_eq!(config.close_policy, ClosePolicy::Drain);
        assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
        assert_eq!(config.tick_interval(), Duration::from_millis(10));
        assert!(config.pool.enabled);
    }

    #[test]
    fn zero_capacity_falls_back() {
        let config = RuntimeConfig::default().with_mailbox_capacity(0);
        assert_eq!(config.effective_capacity(), DEFAULT_MAILBOX_CAPACITY);
    }

    #[test]
    fn pooling_can_be_switched_off() {
        let config: RuntimeConfig = serde_json::from_str(r#"{ "pool": { "enabled": false } }"#).unwrap();
        assert!(!config.pool.enabled);
        assert_eq!(config.pool.capacity, DEFAULT_POOL_CAPACITY);
    }

    #[test]
    fn sub_millisecond_tick_interval_is_kept() {
        let config = RuntimeConfig::default().with_tick_interval(Duration::from_micros(250));
        assert_eq!(config.tick_interval_us, 250);
        assert_eq!(config.tick_interval(), Duration::from_micros(250));

        let config = RuntimeConfig::default().with_tick_interval(Duration::from_nanos(10));
        assert_eq!(config.tick_interval(), Duration::from_micros(1));
    }
}
