//! Prometheus export of connection pool statistics.
//!
//! [`StatsCollector`] implements [`prometheus::core::Collector`] and can be
//! registered with any [`prometheus::Registry`]. [`Exporter`] wraps a
//! registry so that a pool which cannot report its stats fails the scrape
//! instead of silently dropping series.
//!
//! # Metrics Exposed
//!
//! The prefix `P` is `go_db_stats_`, or `go_<driver>_db_stats_` when a
//! driver name is configured. All series are unlabeled.
//!
//! ## Gauges
//! - `P max_open_connections` - Maximum number of open connections
//! - `P open_connections` - Established connections, in use and idle
//! - `P in_use` - Connections currently in use
//! - `P idle` - Idle connections
//!
//! ## Counters
//! - `P wait_count` - Total connections waited for
//! - `P wait_duration` - Total time blocked waiting, in nanoseconds
//! - `P max_idle_closed` - Connections closed by the idle limit
//! - `P max_idle_time_closed` - Connections closed by the idle-time limit
//! - `P max_lifetime_closed` - Connections closed by the lifetime limit
//!
//! `open_connections` is collected but not described; see
//! [`StatsCollector::describe`].
//!
//! # Example
//!
//! ```
//! use pool_stats_exporter::metrics::{CollectorOpts, Exporter, StatsCollector};
//! use pool_stats_exporter::pool::{PoolConfig, SimulatedPool};
//! use std::sync::Arc;
//!
//! let pool = Arc::new(SimulatedPool::new(PoolConfig::default()));
//! let collector = StatsCollector::new(pool.clone(), &CollectorOpts::with_driver("mysql"))
//!     .expect("valid driver name");
//!
//! let mut exporter = Exporter::new();
//! exporter.register_stats(collector).expect("unique metric names");
//!
//! pool.acquire().expect("pool has capacity");
//! let output = exporter.encode().expect("pool is open");
//! assert!(output.contains("go_mysql_db_stats_in_use 1"));
//! ```

mod collector;
mod exporter;
#[cfg(feature = "server")]
mod server;

pub use collector::{CollectorError, CollectorOpts, MetricKind, StatsCollector};
pub use exporter::{ExportError, Exporter};
#[cfg(feature = "server")]
pub use server::{MetricsServer, ServerError};
