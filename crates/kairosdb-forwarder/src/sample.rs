// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

/// Reserved label holding the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Label name to label value. Ordered so that relabel output and serialized tags are stable.
pub type LabelSet = BTreeMap<String, String>;

/// One observed reading as received from the metrics source.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub labels: LabelSet,
    pub value: f64,
    pub timestamp_millis: i64,
}

impl Sample {
    pub fn new(labels: LabelSet, value: f64, timestamp_millis: i64) -> Self {
        Sample {
            labels,
            value,
            timestamp_millis,
        }
    }

    /// Builds a sample from `(name, value)` label pairs.
    pub fn from_pairs<'a, I>(pairs: I, value: f64, timestamp_millis: i64) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let labels = pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Sample::new(labels, value, timestamp_millis)
    }

    /// Metric name, empty when the `__name__` label is absent.
    pub fn name(&self) -> &str {
        self.labels
            .get(METRIC_NAME_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }
}
