//! Prometheus collector for connection pool statistics.

use crate::stats::{StatsError, StatsSnapshot, StatsSource};
use prometheus::core::{Collector, Desc};
use prometheus::proto::{self, MetricFamily, MetricType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building a collector.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("invalid metric descriptor: {0}")]
    Descriptor(#[from] prometheus::Error),
}

/// How a series behaves over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Current state; may go up or down.
    Gauge,
    /// Accumulated total; never decreases.
    Counter,
}

impl MetricKind {
    /// Returns the matching Prometheus metric type.
    pub fn metric_type(self) -> MetricType {
        match self {
            MetricKind::Gauge => MetricType::GAUGE,
            MetricKind::Counter => MetricType::COUNTER,
        }
    }

    fn metric(self, value: f64) -> proto::Metric {
        let mut metric = proto::Metric::default();
        match self {
            MetricKind::Gauge => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(value);
                metric.set_gauge(gauge);
            }
            MetricKind::Counter => {
                let mut counter = proto::Counter::default();
                counter.set_value(value);
                metric.set_counter(counter);
            }
        }
        metric
    }
}

/// One row of the exported metric table.
struct MetricSpec {
    suffix: &'static str,
    help: &'static str,
    kind: MetricKind,
    value: fn(&StatsSnapshot) -> f64,
}

static METRICS: [MetricSpec; 9] = [
    MetricSpec {
        suffix: "max_open_connections",
        help: "Maximum number of open connections to the database.",
        kind: MetricKind::Gauge,
        value: |s| s.max_open_connections as f64,
    },
    MetricSpec {
        suffix: "open_connections",
        help: "The number of established connections both in use and idle.",
        kind: MetricKind::Gauge,
        value: |s| s.open_connections as f64,
    },
    MetricSpec {
        suffix: "in_use",
        help: "The number of connections currently in use.",
        kind: MetricKind::Gauge,
        value: |s| s.in_use as f64,
    },
    MetricSpec {
        suffix: "idle",
        help: "The number of idle connections.",
        kind: MetricKind::Gauge,
        value: |s| s.idle as f64,
    },
    MetricSpec {
        suffix: "wait_count",
        help: "The total number of connections waited for.",
        kind: MetricKind::Counter,
        value: |s| s.wait_count as f64,
    },
    MetricSpec {
        suffix: "wait_duration",
        help: "The total time blocked waiting for a new connection.",
        kind: MetricKind::Counter,
        // Nanoseconds, the raw resolution of the pool's duration.
        value: |s| s.wait_duration.as_nanos() as f64,
    },
    MetricSpec {
        suffix: "max_idle_closed",
        help: "The total number of connections closed due to SetMaxIdleConns.",
        kind: MetricKind::Counter,
        value: |s| s.max_idle_closed as f64,
    },
    MetricSpec {
        suffix: "max_idle_time_closed",
        help: "The total number of connections closed due to SetConnMaxIdleTime.",
        kind: MetricKind::Counter,
        value: |s| s.max_idle_time_closed as f64,
    },
    MetricSpec {
        suffix: "max_lifetime_closed",
        help: "The total number of connections closed due to SetConnMaxLifetime.",
        kind: MetricKind::Counter,
        value: |s| s.max_lifetime_closed as f64,
    },
];

/// Position of `open_connections` in `METRICS`. It is collected but
/// never described.
const OPEN_CONNECTIONS: usize = 1;

/// Options for [`StatsCollector`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorOpts {
    /// Driver name inserted into every metric name. Ignored when empty.
    ///
    /// Not validated here, but every generated name goes through
    /// Prometheus' metric-name check when the collector is built: a name
    /// outside `[a-zA-Z0-9_:]` makes [`StatsCollector::new`] fail with
    /// [`CollectorError::Descriptor`].
    pub driver_name: String,
}

impl CollectorOpts {
    /// Creates options for the given driver name.
    pub fn with_driver(driver_name: impl Into<String>) -> Self {
        Self {
            driver_name: driver_name.into(),
        }
    }

    /// Returns the fully-qualified name for a metric suffix.
    pub fn fq_name(&self, suffix: &str) -> String {
        if self.driver_name.is_empty() {
            format!("go_db_stats_{suffix}")
        } else {
            format!("go_{}_db_stats_{suffix}", self.driver_name)
        }
    }
}

/// Exports a [`StatsSource`] as nine unlabeled Prometheus series.
///
/// Descriptors are built once in [`StatsCollector::new`]. Every call to
/// [`Collector::collect`] takes exactly one fresh snapshot from the
/// source; nothing is cached between scrapes. Clones share both the
/// source and the descriptors.
pub struct StatsCollector<S: ?Sized = dyn StatsSource> {
    source: Arc<S>,
    /// Parallel to `METRICS`.
    descs: Arc<[Desc]>,
}

impl<S: StatsSource> StatsCollector<S> {
    /// Creates a collector that takes ownership of `source`.
    pub fn from_source(source: S, opts: &CollectorOpts) -> Result<Self, CollectorError> {
        Self::new(Arc::new(source), opts)
    }
}

impl<S: StatsSource + ?Sized> StatsCollector<S> {
    /// Creates a collector reading from a shared source.
    ///
    /// Fails only if Prometheus rejects a generated metric name, which
    /// can happen when `driver_name` contains characters outside
    /// `[a-zA-Z0-9_:]`.
    pub fn new(source: Arc<S>, opts: &CollectorOpts) -> Result<Self, CollectorError> {
        let descs = METRICS
            .iter()
            .map(|spec| {
                Desc::new(
                    opts.fq_name(spec.suffix),
                    spec.help.to_owned(),
                    Vec::new(),
                    HashMap::new(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            driver = %opts.driver_name,
            metrics = descs.len(),
            "Built pool stats collector"
        );

        Ok(Self {
            source,
            descs: descs.into(),
        })
    }

    /// Returns the descriptors announced to a registry.
    ///
    /// `open_connections` is left out even though [`try_collect`]
    /// emits it; registries accept undescribed series at gather time.
    ///
    /// [`try_collect`]: StatsCollector::try_collect
    pub fn describe(&self) -> Vec<&Desc> {
        self.descs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != OPEN_CONNECTIONS)
            .map(|(_, desc)| desc)
            .collect()
    }

    /// Returns all nine descriptors in collection order.
    pub fn descriptors(&self) -> &[Desc] {
        &self.descs
    }

    /// Returns the kind of every collected series, in collection order.
    pub fn kinds(&self) -> impl Iterator<Item = MetricKind> {
        METRICS.iter().map(|spec| spec.kind)
    }

    /// Returns the shared statistics source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Takes one snapshot and converts it into metric families.
    ///
    /// A failing source fails the whole pass; no partial set is built.
    pub fn try_collect(&self) -> Result<Vec<MetricFamily>, StatsError> {
        let snapshot = self.source.stats()?;
        let families = self.encode(&snapshot);

        tracing::debug!(
            open = snapshot.open_connections,
            in_use = snapshot.in_use,
            idle = snapshot.idle,
            wait_count = snapshot.wait_count,
            "Collected pool stats"
        );

        Ok(families)
    }

    /// Converts a snapshot into one family per descriptor.
    pub fn encode(&self, snapshot: &StatsSnapshot) -> Vec<MetricFamily> {
        METRICS
            .iter()
            .zip(self.descs.iter())
            .map(|(spec, desc)| {
                let mut family = MetricFamily::default();
                family.set_name(desc.fq_name.clone());
                family.set_help(desc.help.clone());
                family.set_field_type(spec.kind.metric_type());
                family.mut_metric().push(spec.kind.metric((spec.value)(snapshot)));
                family
            })
            .collect()
    }
}

impl<S: ?Sized> Clone for StatsCollector<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            descs: Arc::clone(&self.descs),
        }
    }
}

impl<S: ?Sized> fmt::Debug for StatsCollector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsCollector")
            .field(
                "metrics",
                &self.descs.iter().map(|d| d.fq_name.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl<S: StatsSource + ?Sized> Collector for StatsCollector<S> {
    fn desc(&self) -> Vec<&Desc> {
        self.describe()
    }

    /// Emits nothing when the source fails, so a registry never exposes a
    /// partial or zero-filled set. Use [`StatsCollector::try_collect`] to
    /// observe the failure.
    fn collect(&self) -> Vec<MetricFamily> {
        match self.try_collect() {
            Ok(families) => families,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read pool stats");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    const SUFFIXES: [&str; 9] = [
        "max_open_connections",
        "open_connections",
        "in_use",
        "idle",
        "wait_count",
        "wait_duration",
        "max_idle_closed",
        "max_idle_time_closed",
        "max_lifetime_closed",
    ];

    fn sample_snapshot() -> StatsSnapshot {
        StatsSnapshot {
            max_open_connections: 10,
            open_connections: 3,
            in_use: 2,
            idle: 1,
            wait_count: 5,
            wait_duration: Duration::from_millis(2500),
            max_idle_closed: 1,
            max_idle_time_closed: 0,
            max_lifetime_closed: 0,
        }
    }

    fn fixed(snapshot: StatsSnapshot) -> impl StatsSource {
        move || -> Result<StatsSnapshot, StatsError> { Ok(snapshot) }
    }

    fn value_of(families: &[MetricFamily], name: &str) -> f64 {
        let family = families
            .iter()
            .find(|f| f.get_name() == name)
            .unwrap_or_else(|| panic!("{name} not collected"));
        let metric = &family.get_metric()[0];
        match family.get_field_type() {
            MetricType::COUNTER => metric.get_counter().get_value(),
            _ => metric.get_gauge().get_value(),
        }
    }

    #[test]
    fn test_default_prefix() {
        let collector =
            StatsCollector::from_source(fixed(sample_snapshot()), &CollectorOpts::default())
                .unwrap();

        let names: Vec<_> = collector
            .descriptors()
            .iter()
            .map(|d| d.fq_name.clone())
            .collect();
        let expected: Vec<_> = SUFFIXES
            .iter()
            .map(|s| format!("go_db_stats_{s}"))
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_driver_prefix() {
        let opts = CollectorOpts::with_driver("mysql");
        let collector = StatsCollector::from_source(fixed(sample_snapshot()), &opts).unwrap();

        for (desc, suffix) in collector.descriptors().iter().zip(SUFFIXES) {
            assert_eq!(desc.fq_name, format!("go_mysql_db_stats_{suffix}"));
            assert!(desc.variable_labels.is_empty());
            assert!(desc.const_label_pairs.is_empty());
        }
    }

    #[test]
    fn test_describe_omits_open_connections() {
        let collector =
            StatsCollector::from_source(fixed(sample_snapshot()), &CollectorOpts::default())
                .unwrap();

        let described: Vec<_> = collector
            .describe()
            .iter()
            .map(|d| d.fq_name.clone())
            .collect();
        assert_eq!(
            described,
            vec![
                "go_db_stats_max_open_connections",
                "go_db_stats_in_use",
                "go_db_stats_idle",
                "go_db_stats_wait_count",
                "go_db_stats_wait_duration",
                "go_db_stats_max_idle_closed",
                "go_db_stats_max_idle_time_closed",
                "go_db_stats_max_lifetime_closed",
            ]
        );

        let collected = collector.try_collect().unwrap();
        assert_eq!(collected.len(), 9);
        assert!(collected
            .iter()
            .any(|f| f.get_name() == "go_db_stats_open_connections"));
    }

    #[test]
    fn test_describe_is_idempotent() {
        let collector =
            StatsCollector::from_source(fixed(sample_snapshot()), &CollectorOpts::default())
                .unwrap();

        let first: Vec<_> = collector.desc().iter().map(|d| d.id).collect();
        let second: Vec<_> = collector.desc().iter().map(|d| d.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_collect_values() {
        let opts = CollectorOpts::with_driver("pg");
        let collector = StatsCollector::from_source(fixed(sample_snapshot()), &opts).unwrap();
        let families = collector.collect();

        assert_eq!(value_of(&families, "go_pg_db_stats_max_open_connections"), 10.0);
        assert_eq!(value_of(&families, "go_pg_db_stats_open_connections"), 3.0);
        assert_eq!(value_of(&families, "go_pg_db_stats_in_use"), 2.0);
        assert_eq!(value_of(&families, "go_pg_db_stats_idle"), 1.0);
        assert_eq!(value_of(&families, "go_pg_db_stats_wait_count"), 5.0);
        assert_eq!(value_of(&families, "go_pg_db_stats_wait_duration"), 2.5e9);
        assert_eq!(value_of(&families, "go_pg_db_stats_max_idle_closed"), 1.0);
        assert_eq!(value_of(&families, "go_pg_db_stats_max_idle_time_closed"), 0.0);
        assert_eq!(value_of(&families, "go_pg_db_stats_max_lifetime_closed"), 0.0);
    }

    #[test]
    fn test_collect_kinds() {
        let collector =
            StatsCollector::from_source(fixed(sample_snapshot()), &CollectorOpts::default())
                .unwrap();
        let families = collector.try_collect().unwrap();

        let types: Vec<_> = families.iter().map(|f| f.get_field_type()).collect();
        let mut expected = vec![MetricType::GAUGE; 4];
        expected.extend(vec![MetricType::COUNTER; 5]);
        assert_eq!(types, expected);
        assert!(families.iter().all(|f| f.get_metric().len() == 1));
        assert!(families
            .iter()
            .all(|f| f.get_metric()[0].get_label().is_empty()));
    }

    #[test]
    fn test_collect_is_fresh() {
        let in_use = Arc::new(AtomicU64::new(2));
        let calls = Arc::new(AtomicU64::new(0));
        let source = {
            let in_use = Arc::clone(&in_use);
            let calls = Arc::clone(&calls);
            move || -> Result<StatsSnapshot, StatsError> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(StatsSnapshot {
                    in_use: in_use.load(Ordering::SeqCst),
                    ..Default::default()
                })
            }
        };
        let collector = StatsCollector::from_source(source, &CollectorOpts::default()).unwrap();

        let first = collector.collect();
        in_use.store(5, Ordering::SeqCst);
        let second = collector.collect();

        assert_eq!(value_of(&first, "go_db_stats_in_use"), 2.0);
        assert_eq!(value_of(&second, "go_db_stats_in_use"), 5.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failing_source() {
        let source = || -> Result<StatsSnapshot, StatsError> { Err(StatsError::Closed) };
        let collector = StatsCollector::from_source(source, &CollectorOpts::default()).unwrap();

        assert_eq!(collector.try_collect(), Err(StatsError::Closed));
        assert!(collector.collect().is_empty());
        assert_eq!(collector.desc().len(), 8);
    }

    #[test]
    fn test_invalid_driver_name_rejected() {
        let opts = CollectorOpts::with_driver("my-sql");
        let result = StatsCollector::from_source(fixed(sample_snapshot()), &opts);
        assert!(matches!(result, Err(CollectorError::Descriptor(_))));
    }

    #[test]
    fn test_clone_shares_source() {
        let collector =
            StatsCollector::from_source(fixed(sample_snapshot()), &CollectorOpts::default())
                .unwrap();
        let clone = collector.clone();
        assert!(Arc::ptr_eq(collector.source(), clone.source()));
        assert_eq!(collector.kinds().count(), 9);
    }

    proptest! {
        #[test]
        fn prop_names_follow_driver(driver in "[a-z][a-z0-9_]{0,15}") {
            let opts = CollectorOpts::with_driver(driver.clone());
            let collector = StatsCollector::from_source(fixed(StatsSnapshot::default()), &opts)
                .unwrap();

            for (desc, suffix) in collector.descriptors().iter().zip(SUFFIXES) {
                prop_assert_eq!(&desc.fq_name, &format!("go_{driver}_db_stats_{suffix}"));
            }
        }

        #[test]
        fn prop_drivers_never_collide(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            prop_assume!(a != b);
            let first = StatsCollector::from_source(
                fixed(StatsSnapshot::default()),
                &CollectorOpts::with_driver(a.clone()),
            )
            .unwrap();
            let second = StatsCollector::from_source(
                fixed(StatsSnapshot::default()),
                &CollectorOpts::with_driver(b.clone()),
            )
            .unwrap();

            let prefix = format!("go_{a}_db_stats_");
            for family in first.collect() {
                prop_assert!(family.get_name().starts_with(&prefix));
                prop_assert!(second
                    .descriptors()
                    .iter()
                    .all(|d| d.fq_name != family.get_name()));
            }
        }
    }
}
