//! In-memory connection pool bookkeeping.
//!
//! [`SimulatedPool`] tracks the same counters a real database pool
//! reports without opening any connections. It drives the demo binary and
//! stands in for a live pool in tests.

mod config;
mod simulated;

pub use config::PoolConfig;
pub use simulated::{CloseReason, PoolError, SimulatedPool};
