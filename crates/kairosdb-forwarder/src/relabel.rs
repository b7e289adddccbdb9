// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metric relabeling.
//!
//! A [`RelabelRule`] is the compiled form of a [`RelabelConfig`]. Rules are applied in order
//! to a sample's label set by [`process`]; the first rule that drops the sample ends the chain.
//!
//! For value-matching actions (`keep`, `drop`, `addprefix`) the match subject is the values
//! of `source_labels` joined by `separator`, a missing label contributing an empty string.
//! Label-name actions (`labeldrop`, `labelkeep`) match the regex against every label name.
//!
//! Regexes are fully anchored: `v1` matches the subject `v1` but not `xv1y`.

use regex::Regex;
use tracing::{debug, warn};

use crate::config::relabel_config::{Action, RelabelConfig};
use crate::errors::ConfigError;
use crate::sample::{LabelSet, METRIC_NAME_LABEL};

const DEFAULT_REGEX: &str = "(.*)";

/// A regex that only matches whole strings.
#[derive(Clone, Debug)]
pub struct AnchoredRegex {
    regex: Regex,
    pattern: String,
}

impl AnchoredRegex {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let regex =
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(AnchoredRegex {
            regex,
            pattern: pattern.to_string(),
        })
    }

    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.is_match(subject)
    }

    /// The pattern as configured, without anchors.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

#[derive(Clone, Debug)]
pub struct RelabelRule {
    source_labels: Vec<String>,
    separator: String,
    regex: AnchoredRegex,
    action: Action,
    prefix: String,
}

impl RelabelRule {
    /// Compiles and validates a relabel config.
    pub fn new(config: &RelabelConfig) -> Result<Self, ConfigError> {
        if config.action.matches_label_names()
            && (!config.source_labels.is_empty() || config.separator.is_some())
        {
            return Err(ConfigError::LabelActionWithSourceLabels(config.action.clone()));
        }

        let prefix = config.prefix.clone().unwrap_or_default();
        if config.action == Action::AddPrefix && prefix.is_empty() {
            return Err(ConfigError::MissingPrefix);
        }

        let regex = AnchoredRegex::new(config.regex.as_deref().unwrap_or(DEFAULT_REGEX))?;

        Ok(RelabelRule {
            source_labels: config.source_labels.clone(),
            separator: config.separator.clone().unwrap_or_default(),
            regex,
            action: config.action.clone(),
            prefix,
        })
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn regex(&self) -> &AnchoredRegex {
        &self.regex
    }

    fn subject(&self, labels: &LabelSet) -> String {
        self.source_labels
            .iter()
            .map(|name| labels.get(name).map(String::as_str).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

impl TryFrom<&RelabelConfig> for RelabelRule {
    type Error = ConfigError;

    fn try_from(config: &RelabelConfig) -> Result<Self, Self::Error> {
        RelabelRule::new(config)
    }
}

/// Applies `rules` in order. Returns `None` as soon as one of them drops the sample.
pub fn process(labels: LabelSet, rules: &[RelabelRule]) -> Option<LabelSet> {
    rules
        .iter()
        .try_fold(labels, |labels, rule| relabel(labels, rule))
}

/// Applies a single rule. Returns `None` when the sample is dropped.
pub fn relabel(mut labels: LabelSet, rule: &RelabelRule) -> Option<LabelSet> {
    match &rule.action {
        Action::Drop => {
            let subject = rule.subject(&labels);
            if rule.regex.is_match(&subject) {
                debug!("dropping metric with values: {subject}");
                return None;
            }
        }
        Action::Keep => {
            let subject = rule.subject(&labels);
            if !rule.regex.is_match(&subject) {
                debug!("dropping metric with values: {subject}");
                return None;
            }
        }
        Action::AddPrefix => {
            if rule.regex.is_match(&rule.subject(&labels)) {
                let name = labels.entry(METRIC_NAME_LABEL.to_string()).or_default();
                name.insert_str(0, &rule.prefix);
                debug!("added prefix [{}]: {}", rule.prefix, name);
            }
        }
        Action::LabelDrop => {
            labels.retain(|name, _| {
                let matched = rule.regex.is_match(name);
                if matched {
                    debug!("dropping label [{name}]");
                }
                !matched
            });
        }
        Action::LabelKeep => {
            labels.retain(|name, _| {
                let matched = rule.regex.is_match(name);
                if !matched {
                    debug!("dropping label [{name}]");
                }
                matched
            });
        }
        Action::Unknown(action) => {
            warn!("unknown relabel action type {action}");
        }
    }
    Some(labels)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn rule(config: RelabelConfig) -> RelabelRule {
        RelabelRule::new(&config).unwrap()
    }

    fn input() -> LabelSet {
        labels(&[("a1", "v1"), ("a2", "v2"), ("__name__", "metricname")])
    }

    #[test]
    fn test_no_relabel_config() {
        assert_eq!(process(input(), &[]), Some(input()));
    }

    #[test]
    fn test_add_prefix() {
        let rules = [rule(
            RelabelConfig::new(Action::AddPrefix)
                .source_labels(["a1"])
                .regex("v1")
                .prefix("validprefix."),
        )];
        assert_eq!(
            process(input(), &rules),
            Some(labels(&[
                ("a1", "v1"),
                ("a2", "v2"),
                ("__name__", "validprefix.metricname")
            ]))
        );
    }

    #[test]
    fn test_add_prefix_no_match() {
        let rules = [rule(
            RelabelConfig::new(Action::AddPrefix)
                .source_labels(["a1"])
                .regex("v2")
                .prefix("validprefix."),
        )];
        assert_eq!(process(input(), &rules), Some(input()));
    }

    #[test]
    fn test_drop_match() {
        let rules = [rule(
            RelabelConfig::new(Action::Drop)
                .source_labels(["a1"])
                .regex("v1"),
        )];
        assert_eq!(process(input(), &rules), None);
    }

    #[test]
    fn test_drop_mismatch() {
        let rules = [rule(
            RelabelConfig::new(Action::Drop)
                .source_labels(["a1"])
                .regex("v2"),
        )];
        assert_eq!(process(input(), &rules), Some(input()));
    }

    #[test]
    fn test_keep_match() {
        let rules = [rule(
            RelabelConfig::new(Action::Keep)
                .source_labels(["a1"])
                .regex("v1"),
        )];
        assert_eq!(process(input(), &rules), Some(input()));
    }

    #[test]
    fn test_keep_multiple_source_labels() {
        let rules = [rule(
            RelabelConfig::new(Action::Keep)
                .source_labels(["a1", "a2"])
                .regex("v1v2"),
        )];
        assert_eq!(process(input(), &rules), Some(input()));
    }

    #[test]
    fn test_keep_multiple_source_labels_with_separator() {
        let rules = [rule(
            RelabelConfig::new(Action::Keep)
                .source_labels(["a1", "a2"])
                .separator(";")
                .regex("v1;v2"),
        )];
        assert_eq!(process(input(), &rules), Some(input()));

        let rules = [rule(
            RelabelConfig::new(Action::Keep)
                .source_labels(["a1", "a2"])
                .separator(";")
                .regex("v1v2"),
        )];
        assert_eq!(process(input(), &rules), None);
    }

    #[test]
    fn test_keep_missing_source_label_is_empty() {
        let rules = [rule(
            RelabelConfig::new(Action::Keep)
                .source_labels(["a1", "missing"])
                .separator("-")
                .regex("v1-"),
        )];
        assert_eq!(process(input(), &rules), Some(input()));
    }

    #[test]
    fn test_keep_requires_full_match() {
        let rules = [rule(
            RelabelConfig::new(Action::Keep)
                .source_labels(["a1"])
                .regex("v1"),
        )];
        let partial = labels(&[("a1", "xv1y"), ("__name__", "m")]);
        assert_eq!(process(partial, &rules), None);
    }

    #[test]
    fn test_drop_requires_full_match() {
        let rules = [rule(
            RelabelConfig::new(Action::Drop)
                .source_labels(["a1"])
                .regex("v"),
        )];
        assert_eq!(process(input(), &rules), Some(input()));
    }

    #[test]
    fn test_empty_source_labels_match_empty_subject() {
        let rules = [rule(RelabelConfig::new(Action::Drop).regex(""))];
        assert_eq!(process(input(), &rules), None);

        let rules = [rule(RelabelConfig::new(Action::Keep).regex(".+"))];
        assert_eq!(process(input(), &rules), None);
    }

    #[test]
    fn test_labeldrop() {
        let rules = [rule(RelabelConfig::new(Action::LabelDrop).regex("a.*"))];
        assert_eq!(
            process(input(), &rules),
            Some(labels(&[("__name__", "metricname")]))
        );
    }

    #[test]
    fn test_labelkeep() {
        let rules = [rule(RelabelConfig::new(Action::LabelKeep).regex("__name__|a1"))];
        assert_eq!(
            process(input(), &rules),
            Some(labels(&[("a1", "v1"), ("__name__", "metricname")]))
        );
    }

    #[test]
    fn test_labelkeep_anchored() {
        let rules = [rule(RelabelConfig::new(Action::LabelKeep).regex("a"))];
        assert_eq!(process(input(), &rules), Some(LabelSet::new()));
    }

    #[test]
    fn test_mutations_visible_downstream() {
        let rules = [
            rule(RelabelConfig::new(Action::LabelDrop).regex("a1")),
            rule(
                RelabelConfig::new(Action::Keep)
                    .source_labels(["a1"])
                    .regex(""),
            ),
            rule(
                RelabelConfig::new(Action::AddPrefix)
                    .source_labels(["__name__"])
                    .regex("metricname")
                    .prefix("p."),
            ),
            rule(
                RelabelConfig::new(Action::Keep)
                    .source_labels(["__name__"])
                    .regex("p\\.metricname"),
            ),
        ];
        assert_eq!(
            process(input(), &rules),
            Some(labels(&[("a2", "v2"), ("__name__", "p.metricname")]))
        );
    }

    #[test]
    fn test_add_prefix_without_name_label() {
        let rules = [rule(RelabelConfig::new(Action::AddPrefix).prefix("p."))];
        assert_eq!(
            process(labels(&[("a1", "v1")]), &rules),
            Some(labels(&[("a1", "v1"), ("__name__", "p.")]))
        );
    }

    #[test]
    #[traced_test]
    fn test_unknown_action_is_noop() {
        let rules = [rule(RelabelConfig::new(Action::Unknown("replace".to_string())))];
        assert_eq!(process(input(), &rules), Some(input()));
        assert!(logs_contain("unknown relabel action type replace"));
    }

    #[test]
    #[traced_test]
    fn test_drop_short_circuits() {
        let rules = [
            rule(
                RelabelConfig::new(Action::Drop)
                    .source_labels(["a1"])
                    .regex("v1"),
            ),
            rule(RelabelConfig::new(Action::Unknown("after_drop".to_string()))),
        ];
        assert_eq!(process(input(), &rules), None);
        assert!(!logs_contain("unknown relabel action type after_drop"));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let result = RelabelRule::new(&RelabelConfig::new(Action::AddPrefix));
        assert!(matches!(result, Err(ConfigError::MissingPrefix)));

        let result = RelabelRule::new(&RelabelConfig::new(Action::AddPrefix).prefix(""));
        assert!(matches!(result, Err(ConfigError::MissingPrefix)));

        for action in [Action::LabelDrop, Action::LabelKeep] {
            let result =
                RelabelRule::new(&RelabelConfig::new(action.clone()).source_labels(["a1"]));
            assert!(matches!(
                result,
                Err(ConfigError::LabelActionWithSourceLabels(_))
            ));

            let result = RelabelRule::new(&RelabelConfig::new(action).separator(";"));
            assert!(matches!(
                result,
                Err(ConfigError::LabelActionWithSourceLabels(_))
            ));
        }

        let result = RelabelRule::new(&RelabelConfig::new(Action::Drop).regex("("));
        assert!(matches!(result, Err(ConfigError::InvalidRegex { .. })));
    }

    #[test]
    fn test_default_regex_matches_everything() {
        let rule = rule(RelabelConfig::new(Action::Keep).source_labels(["a1"]));
        assert_eq!(rule.regex().as_str(), "(.*)");
        assert_eq!(process(input(), &[rule]), Some(input()));
    }

    fn name_prefix_rule() -> RelabelRule {
        rule(
            RelabelConfig::new(Action::AddPrefix)
                .source_labels([METRIC_NAME_LABEL])
                .regex(".*")
                .prefix("prom."),
        )
    }

    proptest! {
        #[test]
        fn prop_empty_rules_identity(
            pairs in prop::collection::btree_map("[a-z_]{1,8}", "[a-z0-9]{0,8}", 0..8)
        ) {
            prop_assert_eq!(process(pairs.clone(), &[]), Some(pairs));
        }

        #[test]
        fn prop_name_prefixed_once(name in "[a-z_]{1,16}") {
            let rules = [name_prefix_rule()];
            let labels = labels(&[(METRIC_NAME_LABEL, name.as_str())]);
            let relabeled = process(labels, &rules).unwrap();
            prop_assert_eq!(
                relabeled.get(METRIC_NAME_LABEL).cloned(),
                Some(format!("prom.{name}"))
            );
        }
    }
}
