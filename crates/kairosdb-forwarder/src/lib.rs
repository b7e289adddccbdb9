// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Relabels Prometheus samples and forwards them to KairosDB.
//!
//! A batch flows through three stages:
//! - [`relabel`]: the configured rule chain rewrites or drops each sample's label set
//! - [`datapoint`]: surviving samples with finite values become KairosDB datapoints
//! - [`kairosdb`]: the batch is posted once and the response is classified into
//!   sent, failed and unknown counts
//!
//! Counts and batch durations are reported to an injected [`telemetry::MetricsSink`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod datapoint;
pub mod errors;
pub mod http;
pub mod kairosdb;
pub mod logger;
pub mod relabel;
pub mod sample;
pub mod telemetry;
