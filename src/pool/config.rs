//! Pool limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied by a [`SimulatedPool`](super::SimulatedPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum open connections (0 = unlimited).
    pub max_open: u64,
    /// Maximum idle connections kept for reuse.
    pub max_idle: u64,
    /// Time charged to the wait counters when the pool is exhausted.
    pub wait_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open: 10,
            max_idle: 2,
            wait_timeout_ms: 100,
        }
    }
}

impl PoolConfig {
    /// Creates a configuration with the given connection limits.
    pub fn with_limits(max_open: u64, max_idle: u64) -> Self {
        Self {
            max_open,
            max_idle,
            ..Default::default()
        }
    }

    /// Returns the wait timeout as a [`Duration`].
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
