// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwarder configuration.
//!
//! Configuration is read from a YAML file and then overridden by environment variables
//! prefixed with `KAIROSDB_FORWARDER_` (e.g. `KAIROSDB_FORWARDER_DRYRUN=true`).
//!
//! ```yaml
//! kairosdb_url: http://kairosdb:8080
//! metricname_prefix: "prom."
//! timeout: 10
//! metric_relabel_configs:
//!   - source_labels: [job]
//!     regex: node
//!     action: keep
//! ```
//!
//! Loading validates everything up front: a [`Config`] always holds a parsed URL, a timeout
//! within bounds and compiled relabel rules.

pub mod log_level;
pub mod relabel_config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::relabel::RelabelRule;
use crate::sample::METRIC_NAME_LABEL;
use log_level::LogLevel;
use relabel_config::{Action, RelabelConfig};

pub const ENV_PREFIX: &str = "KAIROSDB_FORWARDER_";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

/// Raw shape of the config file before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    kairosdb_url: Option<String>,
    metricname_prefix: Option<String>,
    /// Seconds. Zero or absent means [`DEFAULT_TIMEOUT`].
    timeout: Option<u64>,
    metric_relabel_configs: Vec<RelabelConfig>,
    dryrun: bool,
    debug: bool,
    log_level: LogLevel,
    https_proxy: Option<String>,
}

/// Validated forwarder configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the KairosDB server, without the API path.
    pub kairosdb_url: Url,
    /// Deadline of one push request.
    pub timeout: Duration,
    /// Compiled `metric_relabel_configs`, followed by the metric name prefix rule if any.
    pub metric_relabel_configs: Arc<[RelabelRule]>,
    /// Build and serialize batches but never send them.
    pub dry_run: bool,
    pub log_level: LogLevel,
    pub https_proxy: Option<String>,
}

impl Config {
    /// Loads the YAML file at `path`, applies environment overrides and validates the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        validate_file(path)?;
        debug!("Loading configuration from {}", path.display());

        Config::from_figment(
            Figment::new()
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Config, ConfigError> {
        let file: FileConfig = figment.extract().map_err(Box::new)?;
        file.validate()
    }
}

impl FileConfig {
    fn validate(self) -> Result<Config, ConfigError> {
        let kairosdb_url = match self.kairosdb_url {
            Some(url) if !url.trim().is_empty() => {
                Url::parse(url.trim()).map_err(|e| ConfigError::InvalidUrl {
                    reason: e.to_string(),
                    url,
                })?
            }
            _ => return Err(ConfigError::MissingUrl),
        };

        let mut relabel_configs = self.metric_relabel_configs;
        if let Some(prefix) = self.metricname_prefix.filter(|p| !p.is_empty()) {
            relabel_configs.push(
                RelabelConfig::new(Action::AddPrefix)
                    .source_labels([METRIC_NAME_LABEL])
                    .regex(".*")
                    .prefix(prefix),
            );
        }
        let rules = relabel_configs
            .iter()
            .map(RelabelRule::new)
            .collect::<Result<Vec<_>, _>>()?;

        let timeout = match self.timeout {
            None | Some(0) => {
                info!("timeout not provided, using default of {DEFAULT_TIMEOUT:?}");
                DEFAULT_TIMEOUT
            }
            Some(secs) => Duration::from_secs(secs),
        };
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
            return Err(ConfigError::TimeoutOutOfRange {
                timeout,
                min: MIN_TIMEOUT,
                max: MAX_TIMEOUT,
            });
        }

        let log_level = if self.debug {
            LogLevel::Debug
        } else {
            self.log_level
        };

        Ok(Config {
            kairosdb_url,
            timeout,
            metric_relabel_configs: rules.into(),
            dry_run: self.dryrun,
            log_level,
            https_proxy: self.https_proxy.filter(|p| !p.is_empty()),
        })
    }
}

fn validate_file(path: &Path) -> Result<(), ConfigError> {
    let metadata =
        std::fs::metadata(path).map_err(|_| ConfigError::FileNotFound(path.to_path_buf()))?;
    if metadata.is_dir() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    if metadata.len() == 0 {
        return Err(ConfigError::EmptyFile(path.to_path_buf()));
    }
    Ok(())
}
