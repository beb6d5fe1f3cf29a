//! Connection pool statistics.
//!
//! The collector never talks to a pool directly. It asks a
//! [`StatsSource`] for a [`StatsSnapshot`] once per scrape, so a real
//! pool, the in-memory [`SimulatedPool`](crate::pool::SimulatedPool)
//! or a test closure can all stand behind it.

mod snapshot;
mod source;

pub use snapshot::StatsSnapshot;
pub use source::{StatsError, StatsSource};
