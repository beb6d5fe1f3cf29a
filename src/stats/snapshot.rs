//! Point-in-time pool statistics.

use std::time::Duration;

/// Pool health at a single instant.
///
/// Gauges describe the current state of the pool. The remaining fields
/// are cumulative since the pool was created and never decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Maximum number of open connections (0 = unlimited).
    pub max_open_connections: u64,
    /// Established connections, both in use and idle.
    pub open_connections: u64,
    /// Connections currently in use.
    pub in_use: u64,
    /// Idle connections.
    pub idle: u64,
    /// Total number of connections waited for.
    pub wait_count: u64,
    /// Total time blocked waiting for a new connection.
    pub wait_duration: Duration,
    /// Connections closed because the idle limit was reached.
    pub max_idle_closed: u64,
    /// Connections closed because they sat idle for too long.
    pub max_idle_time_closed: u64,
    /// Connections closed because they exceeded their lifetime.
    pub max_lifetime_closed: u64,
}
