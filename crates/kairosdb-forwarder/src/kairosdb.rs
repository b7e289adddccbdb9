// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! KairosDB delivery client.
//!
//! A batch is posted once to `/api/v1/datapoints`. KairosDB answers `204 No Content` when
//! every datapoint was stored, and `400 Bad Request` with `{"errors": [...]}` listing one
//! entry per rejected datapoint otherwise. The outcome is split into sent, failed and unknown
//! counts which are also reported to the [`MetricsSink`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::datapoint::{DataPoint, SampleTransformer};
use crate::errors::DeliveryError;
use crate::http::get_client;
use crate::relabel::RelabelRule;
use crate::sample::Sample;
use crate::telemetry::MetricsSink;

pub const POST_ENDPOINT: &str = "/api/v1/datapoints";
const CONTENT_TYPE_JSON: &str = "application/json";

/// Result of one batch delivery. `error` is set whenever not every datapoint was stored.
#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    pub sent: usize,
    pub failed: usize,
    pub unknown: usize,
    pub error: Option<DeliveryError>,
}

impl DeliveryOutcome {
    fn all_sent(sent: usize) -> Self {
        DeliveryOutcome {
            sent,
            ..Default::default()
        }
    }

    fn all_failed(failed: usize, error: DeliveryError) -> Self {
        DeliveryOutcome {
            failed,
            error: Some(error),
            ..Default::default()
        }
    }

    fn all_unknown(unknown: usize, error: DeliveryError) -> Self {
        DeliveryOutcome {
            unknown,
            error: Some(error),
            ..Default::default()
        }
    }

    fn errored(error: DeliveryError) -> Self {
        DeliveryOutcome {
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    errors: Vec<serde_json::Value>,
}

pub struct KairosDbClientConfig {
    pub client: reqwest::Client,
    /// Base URL; its path is replaced by [`POST_ENDPOINT`].
    pub kairosdb_url: Url,
    pub timeout: Duration,
    pub dry_run: bool,
    pub rules: Arc<[RelabelRule]>,
    pub sink: Arc<dyn MetricsSink>,
}

#[derive(Clone)]
pub struct KairosDbClient {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
    dry_run: bool,
    transformer: SampleTransformer,
    sink: Arc<dyn MetricsSink>,
}

impl KairosDbClient {
    pub fn new(config: KairosDbClientConfig) -> Self {
        let mut url = config.kairosdb_url;
        url.set_path(POST_ENDPOINT);
        KairosDbClient {
            client: config.client,
            url,
            timeout: config.timeout,
            dry_run: config.dry_run,
            transformer: SampleTransformer::new(config.rules, Arc::clone(&config.sink)),
            sink: config.sink,
        }
    }

    pub fn from_config(config: &Config, sink: Arc<dyn MetricsSink>) -> Self {
        KairosDbClient::new(KairosDbClientConfig {
            client: get_client(config),
            kairosdb_url: config.kairosdb_url.clone(),
            timeout: config.timeout,
            dry_run: config.dry_run,
            rules: Arc::clone(&config.metric_relabel_configs),
            sink,
        })
    }

    /// Full endpoint datapoints are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Relabels and filters `samples`, then delivers the resulting datapoints.
    pub async fn send(&self, samples: &[Sample]) -> DeliveryOutcome {
        let datapoints = self.transformer.transform(samples);
        let outcome = self.deliver(&datapoints).await;
        if let Some(e) = &outcome.error {
            error!("failed writing metrics to downstream. error: {e}");
        }
        outcome
    }

    /// Posts `datapoints` as a single batch and classifies the response.
    pub async fn deliver(&self, datapoints: &[DataPoint]) -> DeliveryOutcome {
        if datapoints.is_empty() {
            debug!("No datapoints to push");
            return DeliveryOutcome::default();
        }

        let start = Instant::now();
        let outcome = self.write(datapoints).await;
        self.sink.observe_duration(start.elapsed());

        if outcome.sent > 0 {
            self.sink.add_sent(outcome.sent as u64);
        }
        if outcome.failed > 0 {
            self.sink.add_failed(outcome.failed as u64);
        }
        if outcome.unknown > 0 {
            self.sink.add_unknown(outcome.unknown as u64);
        }
        outcome
    }

    async fn write(&self, datapoints: &[DataPoint]) -> DeliveryOutcome {
        let total = datapoints.len();

        let body = match serde_json::to_vec(datapoints) {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::errored(DeliveryError::Serialization(e)),
        };

        debug!("Pushing {total} datapoints to {}", self.url);
        if self.dry_run {
            return DeliveryOutcome::default();
        }

        let response = match self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(source) => {
                return DeliveryOutcome::all_failed(
                    total,
                    DeliveryError::Transport {
                        url: self.url.to_string(),
                        source,
                    },
                )
            }
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!("Pushed {total} datapoints successfully");
            return DeliveryOutcome::all_sent(total);
        }
        if status != StatusCode::BAD_REQUEST {
            return DeliveryOutcome::all_unknown(total, DeliveryError::UnexpectedStatus(status));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return DeliveryOutcome::all_unknown(total, DeliveryError::ResponseRead(e)),
        };
        let rejected = match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(response) => response.errors.len(),
            Err(e) => {
                error!("Response received is: {}", String::from_utf8_lossy(&body));
                return DeliveryOutcome::all_unknown(total, DeliveryError::ResponseFormat(e));
            }
        };

        if rejected > total {
            error!("Response from kairosdb: {}", String::from_utf8_lossy(&body));
            return DeliveryOutcome::errored(DeliveryError::InvariantViolation {
                failed: rejected,
                total,
            });
        }

        DeliveryOutcome {
            sent: total - rejected,
            failed: rejected,
            unknown: 0,
            error: Some(DeliveryError::PartialFailure {
                failed: rejected,
                total,
            }),
        }
    }
}
