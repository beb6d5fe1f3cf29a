//! Simulated connection pool.

use super::PoolConfig;
use crate::stats::{StatsError, StatsSnapshot, StatsSource};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("connection pool is closed")]
    Closed,
    #[error("connection pool exhausted ({max_open} open)")]
    Exhausted { max_open: u64 },
    #[error("no connection is in use")]
    NothingInUse,
    #[error("pool state lock poisoned")]
    Poisoned,
}

/// Why idle connections were expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Idle longer than the idle-time limit.
    IdleTime,
    /// Older than the connection lifetime limit.
    Lifetime,
}

#[derive(Debug, Default)]
struct PoolState {
    config: PoolConfig,
    open: u64,
    in_use: u64,
    idle: u64,
    wait_count: u64,
    wait_duration: Duration,
    max_idle_closed: u64,
    max_idle_time_closed: u64,
    max_lifetime_closed: u64,
    closed: bool,
}

impl PoolState {
    /// Closes idle connections above the idle limit.
    fn shrink_idle(&mut self) -> u64 {
        let surplus = self.idle.saturating_sub(self.config.max_idle);
        self.idle -= surplus;
        self.open -= surplus;
        self.max_idle_closed += surplus;
        surplus
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            max_open_connections: self.config.max_open,
            open_connections: self.open,
            in_use: self.in_use,
            idle: self.idle,
            wait_count: self.wait_count,
            wait_duration: self.wait_duration,
            max_idle_closed: self.max_idle_closed,
            max_idle_time_closed: self.max_idle_time_closed,
            max_lifetime_closed: self.max_lifetime_closed,
        }
    }
}

/// Connection pool bookkeeping without real connections.
///
/// Every operation takes the state lock once, so each snapshot is
/// consistent even while other threads acquire and release.
#[derive(Debug)]
pub struct SimulatedPool {
    state: Mutex<PoolState>,
}

impl SimulatedPool {
    /// Creates an empty pool with the given limits.
    pub fn new(config: PoolConfig) -> Self {
        let mut state = PoolState {
            config,
            ..Default::default()
        };
        clamp_idle(&mut state.config);
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>, PoolError> {
        self.state.lock().map_err(|_| PoolError::Poisoned)
    }

    /// Checks out a connection, reusing an idle one when possible.
    ///
    /// When the pool is at its open limit the attempt is counted as a
    /// wait of `wait_timeout` and fails with [`PoolError::Exhausted`].
    pub fn acquire(&self) -> Result<(), PoolError> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(PoolError::Closed);
        }

        if state.idle > 0 {
            state.idle -= 1;
        } else if state.config.max_open == 0 || state.open < state.config.max_open {
            state.open += 1;
        } else {
            state.wait_count += 1;
            let waited = state.config.wait_timeout();
            state.wait_duration += waited;
            tracing::trace!(
                wait_count = state.wait_count,
                max_open = state.config.max_open,
                "Pool exhausted"
            );
            return Err(PoolError::Exhausted {
                max_open: state.config.max_open,
            });
        }

        state.in_use += 1;
        tracing::trace!(in_use = state.in_use, open = state.open, "Acquired connection");
        Ok(())
    }

    /// Returns a connection to the pool.
    ///
    /// The connection is kept idle if there is room, otherwise it is
    /// closed and counted against the idle limit. After [`close`] the
    /// connection is simply dropped.
    ///
    /// [`close`]: SimulatedPool::close
    pub fn release(&self) -> Result<(), PoolError> {
        let mut state = self.lock()?;
        if state.in_use == 0 {
            return Err(PoolError::NothingInUse);
        }
        state.in_use -= 1;

        if state.closed {
            state.open -= 1;
        } else if state.idle < state.config.max_idle {
            state.idle += 1;
        } else {
            state.open -= 1;
            state.max_idle_closed += 1;
        }

        tracing::trace!(in_use = state.in_use, idle = state.idle, "Released connection");
        Ok(())
    }

    /// Closes every idle connection, crediting the given limit.
    ///
    /// Returns the number of connections closed.
    pub fn expire_idle(&self, reason: CloseReason) -> Result<u64, PoolError> {
        let mut state = self.lock()?;
        let expired = state.idle;
        state.idle = 0;
        state.open -= expired;
        match reason {
            CloseReason::IdleTime => state.max_idle_time_closed += expired,
            CloseReason::Lifetime => state.max_lifetime_closed += expired,
        }
        Ok(expired)
    }

    /// Changes the open limit (0 = unlimited).
    ///
    /// The idle limit is lowered to match if it would exceed the new
    /// open limit.
    pub fn set_max_open(&self, max_open: u64) -> Result<(), PoolError> {
        let mut state = self.lock()?;
        state.config.max_open = max_open;
        clamp_idle(&mut state.config);
        state.shrink_idle();
        Ok(())
    }

    /// Changes the idle limit, closing surplus idle connections.
    pub fn set_max_idle(&self, max_idle: u64) -> Result<(), PoolError> {
        let mut state = self.lock()?;
        state.config.max_idle = max_idle;
        clamp_idle(&mut state.config);
        state.shrink_idle();
        Ok(())
    }

    /// Closes the pool. Idle connections are dropped immediately and
    /// stats are no longer available.
    pub fn close(&self) -> Result<(), PoolError> {
        let mut state = self.lock()?;
        state.closed = true;
        state.open -= state.idle;
        state.idle = 0;
        tracing::debug!(in_use = state.in_use, "Pool closed");
        Ok(())
    }

    /// Returns true once [`close`](SimulatedPool::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().map(|s| s.closed).unwrap_or(true)
    }
}

impl StatsSource for SimulatedPool {
    fn stats(&self) -> Result<StatsSnapshot, StatsError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StatsError::Unavailable("pool state lock poisoned".into()))?;
        if state.closed {
            return Err(StatsError::Closed);
        }
        Ok(state.snapshot())
    }
}

fn clamp_idle(config: &mut PoolConfig) {
    if config.max_open > 0 && config.max_idle > config.max_open {
        config.max_idle = config.max_open;
    }
}
