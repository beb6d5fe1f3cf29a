//! The statistics source capability.

use super::StatsSnapshot;
use thiserror::Error;

/// Errors raised when a snapshot cannot be taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("connection pool is closed")]
    Closed,
    #[error("pool statistics unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can report a [`StatsSnapshot`] on demand.
///
/// Implementations are expected to be cheap and non-blocking, since
/// they run inside a scrape. Snapshot consistency is the source's
/// responsibility; callers may invoke `stats` from several threads at
/// once.
pub trait StatsSource: Send + Sync {
    /// Returns the current pool statistics.
    fn stats(&self) -> Result<StatsSnapshot, StatsError>;
}

impl<F> StatsSource for F
where
    F: Fn() -> Result<StatsSnapshot, StatsError> + Send + Sync,
{
    fn stats(&self) -> Result<StatsSnapshot, StatsError> {
        self()
    }
}
