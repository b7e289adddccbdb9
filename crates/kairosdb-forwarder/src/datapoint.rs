// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use tracing::trace;

use crate::relabel::{process, RelabelRule};
use crate::sample::{LabelSet, Sample, METRIC_NAME_LABEL};
use crate::telemetry::MetricsSink;

/// A KairosDB datapoint as posted to `/api/v1/datapoints`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataPoint {
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(serialize_with = "serialize_finite")]
    pub value: f64,
    pub tags: BTreeMap<String, String>,
}

/// NaN and infinities cannot be stored by KairosDB.
pub fn valid_value(value: f64) -> bool {
    value.is_finite()
}

/// Non-finite values fail serialization instead of being written as `null`.
fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !valid_value(*value) {
        return Err(S::Error::custom(format!("unsupported value: {value}")));
    }
    serializer.serialize_f64(*value)
}

/// Every label except the metric name, skipping empty values.
pub fn tags_from_labels(labels: &LabelSet) -> BTreeMap<String, String> {
    labels
        .iter()
        .filter(|(name, value)| name.as_str() != METRIC_NAME_LABEL && !value.is_empty())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Relabels `samples` and converts the survivors with a storable value into datapoints,
/// preserving input order.
pub fn filter_and_process_samples(samples: &[Sample], rules: &[RelabelRule]) -> Vec<DataPoint> {
    samples
        .iter()
        .filter_map(|sample| {
            let mut labels = process(sample.labels.clone(), rules)?;
            if !valid_value(sample.value) {
                trace!(
                    "skipping sample {} with value {}",
                    sample.name(),
                    sample.value
                );
                return None;
            }
            let tags = tags_from_labels(&labels);
            let name = labels.remove(METRIC_NAME_LABEL).unwrap_or_default();
            Some(DataPoint {
                name,
                timestamp: sample.timestamp_millis,
                value: sample.value,
                tags,
            })
        })
        .collect()
}

/// Applies the relabel chain to batches and accounts for the samples it filters out.
#[derive(Clone)]
pub struct SampleTransformer {
    rules: Arc<[RelabelRule]>,
    sink: Arc<dyn MetricsSink>,
}

impl SampleTransformer {
    pub fn new(rules: Arc<[RelabelRule]>, sink: Arc<dyn MetricsSink>) -> Self {
        SampleTransformer { rules, sink }
    }

    pub fn rules(&self) -> &[RelabelRule] {
        &self.rules
    }

    /// Converts `samples` and reports how many were dropped to the sink.
    pub fn transform(&self, samples: &[Sample]) -> Vec<DataPoint> {
        let datapoints = filter_and_process_samples(samples, &self.rules);
        let filtered = samples.len() - datapoints.len();
        self.sink.add_filtered(filtered as u64);
        datapoints
    }
}
