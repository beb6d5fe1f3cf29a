//! Registry wrapper that fails scrapes when pool stats are unavailable.

use super::StatsCollector;
use crate::stats::{StatsError, StatsSource};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during metrics export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("pool stats unavailable: {0}")]
    Stats(#[from] StatsError),
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A collector whose scrape can fail as a whole.
trait FallibleCollector: Send + Sync {
    fn try_collect(&self) -> Result<Vec<MetricFamily>, StatsError>;
}

impl<S: StatsSource + ?Sized> FallibleCollector for StatsCollector<S> {
    fn try_collect(&self) -> Result<Vec<MetricFamily>, StatsError> {
        StatsCollector::try_collect(self)
    }
}

/// Prometheus registry for pool stats collectors.
///
/// Stats collectors are registered with the inner [`Registry`] so name
/// collisions are rejected up front. They are gathered separately,
/// though: [`Registry::gather`] cannot fail, while a scrape through
/// [`Exporter::gather`] fails if any pool cannot report its stats.
pub struct Exporter {
    registry: Registry,
    stats: Vec<Arc<dyn FallibleCollector>>,
}

impl Exporter {
    /// Creates an exporter with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Creates an exporter around an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            stats: Vec::new(),
        }
    }

    /// Registers a pool stats collector.
    ///
    /// Fails with [`prometheus::Error::AlreadyReg`] if another collector
    /// already describes the same metric names.
    pub fn register_stats<S>(&mut self, collector: StatsCollector<S>) -> Result<(), ExportError>
    where
        S: StatsSource + ?Sized + 'static,
    {
        self.registry.register(Box::new(Unexposed(collector.clone())))?;
        self.stats.push(Arc::new(collector));
        Ok(())
    }

    /// Registers any other collector. Its families are gathered as-is.
    pub fn register(&mut self, collector: Box<dyn Collector>) -> Result<(), ExportError> {
        self.registry.register(collector)?;
        Ok(())
    }

    /// Gathers every registered collector.
    ///
    /// Each stats collector takes exactly one snapshot. If any snapshot
    /// fails the whole scrape fails; no partial set is returned.
    pub fn gather(&self) -> Result<Vec<MetricFamily>, ExportError> {
        let mut families = self.registry.gather();
        for collector in &self.stats {
            families.extend(collector.try_collect()?);
        }
        families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        Ok(families)
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, ExportError> {
        let encoder = TextEncoder::new();
        let metric_families = self.gather()?;
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("stats_collectors", &self.stats.len())
            .finish_non_exhaustive()
    }
}

/// Registers a stats collector's descriptors without letting the
/// registry collect it, so [`Exporter::gather`] stays the only place a
/// snapshot is taken. All nine names are reserved, including
/// `open_connections`, so no other collector can emit them.
struct Unexposed<S: ?Sized>(StatsCollector<S>);

impl<S: StatsSource + ?Sized> Collector for Unexposed<S> {
    fn desc(&self) -> Vec<&prometheus::core::Desc> {
        self.0.descriptors().iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        Vec::new()
    }
}
