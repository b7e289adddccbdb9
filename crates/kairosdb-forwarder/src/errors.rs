// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

use crate::config::relabel_config::Action;

/// Raised while loading configuration or compiling relabel rules, never during evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {0} not found")]
    FileNotFound(PathBuf),
    #[error("config file {0} is empty")]
    EmptyFile(PathBuf),
    #[error("failed to parse config: {0}")]
    Parse(#[from] Box<figment::Error>),
    #[error("kairosdb_url is mandatory")]
    MissingUrl,
    #[error("invalid kairosdb_url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("timeout {timeout:?} is out of range, it should be between {min:?} and {max:?}")]
    TimeoutOutOfRange {
        timeout: Duration,
        min: Duration,
        max: Duration,
    },
    #[error("invalid regex {pattern}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("addprefix action requires prefix")]
    MissingPrefix,
    #[error("with action=={0} only regex is needed")]
    LabelActionWithSourceLabels(Action),
}

/// Terminal error of one batch delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to serialize datapoints: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("failed to push datapoints to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read response from remote storage: {0}")]
    ResponseRead(#[source] reqwest::Error),
    #[error("unparsable response from remote storage: {0}")]
    ResponseFormat(#[source] serde_json::Error),
    #[error("unexpected status {0} from remote storage")]
    UnexpectedStatus(StatusCode),
    #[error("failed to write [{failed}] samples of [{total}]")]
    PartialFailure { failed: usize, total: usize },
    #[error("number of failed datapoints [{failed}] is greater than total datapoints [{total}]")]
    InvariantViolation { failed: usize, total: usize },
}

impl DeliveryError {
    /// True when the request timed out before a response arrived.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeliveryError::Transport { source, .. } if source.is_timeout())
    }
}
