// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Self-telemetry of the forwarder.
//!
//! The delivery path only sees the write-only [`MetricsSink`] trait. [`PrometheusSink`] backs
//! it with a `prometheus_client` registry that the embedding service can expose.

use std::time::Duration;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

/// Value of the `remote` label on every metric.
pub const REMOTE_NAME: &str = "kairosdb";

/// Default Prometheus histogram buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Receives sample counts and batch durations. Implementations must be safe to share
/// across concurrent batches.
pub trait MetricsSink: Send + Sync {
    fn add_sent(&self, count: u64);
    fn add_failed(&self, count: u64);
    fn add_unknown(&self, count: u64);
    fn add_filtered(&self, count: u64);
    fn observe_duration(&self, duration: Duration);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn add_sent(&self, _count: u64) {}
    fn add_failed(&self, _count: u64) {}
    fn add_unknown(&self, _count: u64) {}
    fn add_filtered(&self, _count: u64) {}
    fn observe_duration(&self, _duration: Duration) {}
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RemoteLabels {
    pub remote: String,
}

impl Default for RemoteLabels {
    fn default() -> Self {
        RemoteLabels {
            remote: REMOTE_NAME.to_string(),
        }
    }
}

pub struct PrometheusSink {
    registry: Registry,
    labels: RemoteLabels,

    /// Samples accepted by KairosDB.
    pub sent_samples: Family<RemoteLabels, Counter>,

    /// Samples rejected by KairosDB or lost to a transport error.
    pub failed_samples: Family<RemoteLabels, Counter>,

    /// Samples whose fate could not be determined from the response.
    pub unknown_status_samples: Family<RemoteLabels, Counter>,

    /// Samples dropped by relabeling or for having a non-finite value.
    pub filtered_samples: Family<RemoteLabels, Counter>,

    pub sent_batch_duration_seconds: Family<RemoteLabels, Histogram>,
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusSink {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        // Counter names get the `_total` suffix when encoded
        let sent_samples = Family::<RemoteLabels, Counter>::default();
        registry.register(
            "sent_samples",
            "Total number of processed samples sent to remote storage",
            sent_samples.clone(),
        );

        let failed_samples = Family::<RemoteLabels, Counter>::default();
        registry.register(
            "failed_samples",
            "Total number of processed samples which failed on send to remote storage",
            failed_samples.clone(),
        );

        let unknown_status_samples = Family::<RemoteLabels, Counter>::default();
        registry.register(
            "unknown_status_samples",
            "Total number of processed samples whose send status to remote storage is unknown",
            unknown_status_samples.clone(),
        );

        let filtered_samples = Family::<RemoteLabels, Counter>::default();
        registry.register(
            "filtered_samples",
            "Total number of samples filtered out before sending to remote storage",
            filtered_samples.clone(),
        );

        let sent_batch_duration_seconds =
            Family::<RemoteLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DEFAULT_BUCKETS.into_iter())
            });
        registry.register(
            "sent_batch_duration_seconds",
            "Duration of sample batch send calls to the remote storage",
            sent_batch_duration_seconds.clone(),
        );

        Self {
            registry,
            labels: RemoteLabels::default(),
            sent_samples,
            failed_samples,
            unknown_status_samples,
            filtered_samples,
            sent_batch_duration_seconds,
        }
    }

    /// Returns a mutable reference to the underlying registry, to register further metrics
    /// before the sink is shared.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Encodes all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl MetricsSink for PrometheusSink {
    fn add_sent(&self, count: u64) {
        self.sent_samples.get_or_create(&self.labels).inc_by(count);
    }

    fn add_failed(&self, count: u64) {
        self.failed_samples.get_or_create(&self.labels).inc_by(count);
    }

    fn add_unknown(&self, count: u64) {
        self.unknown_status_samples
            .get_or_create(&self.labels)
            .inc_by(count);
    }

    fn add_filtered(&self, count: u64) {
        self.filtered_samples.get_or_create(&self.labels).inc_by(count);
    }

    fn observe_duration(&self, duration: Duration) {
        self.sent_batch_duration_seconds
            .get_or_create(&self.labels)
            .observe(duration.as_secs_f64());
    }
}
