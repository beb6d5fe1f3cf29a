//! Pool Stats Exporter Library
//!
//! Exports database connection pool statistics as Prometheus metrics.
//! Values are pulled from the pool on every scrape; nothing is cached,
//! averaged or stored between scrapes.
//!
//! # Architecture
//!
//! ```text
//! StatsSource ──stats()──▶ StatsCollector ──▶ Registry / Exporter ──▶ /metrics
//!  (pool, fake)              (9 series)
//! ```
//!
//! # Example
//!
//! ```
//! use pool_stats_exporter::{CollectorOpts, StatsCollector, StatsError, StatsSnapshot};
//! use prometheus::Registry;
//! use std::time::Duration;
//!
//! let source = || -> Result<StatsSnapshot, StatsError> {
//!     Ok(StatsSnapshot {
//!         max_open_connections: 10,
//!         open_connections: 3,
//!         in_use: 2,
//!         idle: 1,
//!         wait_count: 5,
//!         wait_duration: Duration::from_millis(2500),
//!         ..Default::default()
//!     })
//! };
//!
//! let collector = StatsCollector::from_source(source, &CollectorOpts::with_driver("mysql"))
//!     .expect("valid driver name");
//!
//! let registry = Registry::new();
//! registry.register(Box::new(collector)).expect("unique metric names");
//!
//! let families = registry.gather();
//! assert!(families
//!     .iter()
//!     .any(|f| f.get_name() == "go_mysql_db_stats_in_use"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod pool;
pub mod stats;

// Re-export commonly used types at crate root
pub use config::{ConfigError, FileConfig, ServerConfig};
pub use metrics::{CollectorError, CollectorOpts, ExportError, Exporter, MetricKind, StatsCollector};
pub use pool::{PoolConfig, SimulatedPool};
pub use stats::{StatsError, StatsSnapshot, StatsSource};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
