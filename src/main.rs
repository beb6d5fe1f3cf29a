//! Pool Stats Exporter demo
//!
//! Serves the stats of a simulated connection pool on `/metrics` while a
//! background task checks connections in and out.

use clap::Parser;
use pool_stats_exporter::{
    config::FileConfig,
    metrics::{Exporter, MetricsServer, StatsCollector},
    pool::{CloseReason, PoolError, SimulatedPool},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serve simulated connection pool stats as Prometheus metrics.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Driver name inserted into metric names.
    #[arg(long)]
    driver_name: Option<String>,

    /// Port for the metrics endpoint.
    #[arg(long)]
    port: Option<u16>,

    /// Maximum open connections (0 = unlimited).
    #[arg(long)]
    max_open: Option<u64>,

    /// Maximum idle connections.
    #[arg(long)]
    max_idle: Option<u64>,

    /// Interval between simulated workload steps, in milliseconds.
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

impl Args {
    fn load_config(&self) -> Result<FileConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        if let Some(driver_name) = &self.driver_name {
            config.collector.driver_name = driver_name.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(max_open) = self.max_open {
            config.pool.max_open = max_open;
        }
        if let Some(max_idle) = self.max_idle {
            config.pool.max_idle = max_idle;
        }
        Ok(config)
    }
}

/// Builds the log filter from `RUST_LOG`, falling back to `info`.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    info!("Pool Stats Exporter v{}", pool_stats_exporter::VERSION);

    let args = Args::parse();
    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = Arc::new(SimulatedPool::new(config.pool.clone()));
    let collector = match StatsCollector::new(pool.clone(), &config.collector) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("Invalid driver name {:?}: {}", config.collector.driver_name, e);
            std::process::exit(1);
        }
    };

    let mut exporter = Exporter::new();
    if let Err(e) = exporter.register_stats(collector) {
        eprintln!("Failed to register collector: {}", e);
        std::process::exit(1);
    }

    tokio::spawn(simulate_workload(
        pool.clone(),
        Duration::from_millis(args.tick_ms.max(1)),
    ));

    let server = MetricsServer::new(config.server.clone(), exporter);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
        }
    };

    if let Err(e) = server.run(shutdown).await {
        eprintln!("Metrics server failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = pool.close() {
        warn!("Failed to close pool: {}", e);
    }
    info!("Done.");
}

/// Ramps load up until the pool is exhausted, drains it, and
/// periodically expires idle connections.
async fn simulate_workload(pool: Arc<SimulatedPool>, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    let mut step: u64 = 0;
    let mut held: u64 = 0;

    loop {
        interval.tick().await;
        step += 1;

        // Alternate eight steps of load with eight steps of release.
        let result = if step % 16 < 8 {
            pool.acquire().map(|()| held += 1)
        } else if held > 0 {
            pool.release().map(|()| held -= 1)
        } else {
            Ok(())
        };

        match result {
            Ok(()) | Err(PoolError::Exhausted { .. }) => {}
            Err(PoolError::Closed) => break,
            Err(e) => warn!("Simulated workload step failed: {}", e),
        }

        if step % 64 == 0 {
            let reason = if step % 128 == 0 {
                CloseReason::Lifetime
            } else {
                CloseReason::IdleTime
            };
            if let Ok(expired) = pool.expire_idle(reason) {
                info!(expired, ?reason, "Expired idle connections");
            }
        }
    }
}
