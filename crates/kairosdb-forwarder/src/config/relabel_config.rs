// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metric relabel configuration as written in the config file.
//!
//! Each entry is compiled into a [`crate::relabel::RelabelRule`] when the configuration is
//! loaded. Rules run in the order they are listed.
//!
//! ```yaml
//! metric_relabel_configs:
//!   # Only forward samples from the node job
//!   - source_labels: [job]
//!     regex: node
//!     action: keep
//!
//!   # Strip every label starting with tmp_
//!   - regex: "tmp_.*"
//!     action: labeldrop
//!
//!   # Prefix metric names of the production environment
//!   - source_labels: [env]
//!     regex: prod
//!     action: addprefix
//!     prefix: "prod."
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Action applied by a relabel rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Drop the sample when the source label values do not match.
    Keep,
    /// Drop the sample when the source label values match.
    Drop,
    /// Remove every label whose name matches.
    LabelDrop,
    /// Remove every label whose name does not match.
    LabelKeep,
    /// Prepend `prefix` to the metric name when the source label values match.
    AddPrefix,
    /// Any other action name, including a missing one. Loads fine but does nothing at
    /// evaluation time.
    Unknown(String),
}

impl Default for Action {
    fn default() -> Self {
        Action::Unknown(String::new())
    }
}

impl Action {
    /// Label-name actions match against label names rather than source label values.
    pub fn matches_label_names(&self) -> bool {
        matches!(self, Action::LabelDrop | Action::LabelKeep)
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "keep" => Action::Keep,
            "drop" => Action::Drop,
            "labeldrop" => Action::LabelDrop,
            "labelkeep" => Action::LabelKeep,
            "addprefix" => Action::AddPrefix,
            _ => Action::Unknown(s.to_string()),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Keep => write!(f, "keep"),
            Action::Drop => write!(f, "drop"),
            Action::LabelDrop => write!(f, "labeldrop"),
            Action::LabelKeep => write!(f, "labelkeep"),
            Action::AddPrefix => write!(f, "addprefix"),
            Action::Unknown(action) => write!(f, "{action}"),
        }
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match Action::from_str(&s) {
            Ok(action) => Ok(action),
            Err(never) => match never {},
        }
    }
}

/// One entry of `metric_relabel_configs`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RelabelConfig {
    /// Labels whose values are concatenated to build the match subject.
    #[serde(default)]
    pub source_labels: Vec<String>,
    /// Joins the source label values. Empty when unset.
    #[serde(default)]
    pub separator: Option<String>,
    /// Pattern matched against the whole subject. Defaults to `(.*)`.
    #[serde(default)]
    pub regex: Option<String>,
    /// Names are matched exactly, `DROP` is not `drop`.
    #[serde(default)]
    pub action: Action,
    /// Required by `addprefix`, ignored otherwise.
    #[serde(default)]
    pub prefix: Option<String>,
}

impl RelabelConfig {
    pub fn new(action: Action) -> Self {
        RelabelConfig {
            source_labels: Vec::new(),
            separator: None,
            regex: None,
            action,
            prefix: None,
        }
    }

    #[must_use]
    pub fn source_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    #[must_use]
    pub fn regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}
