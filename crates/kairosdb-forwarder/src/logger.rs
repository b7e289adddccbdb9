// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::log_level::LogLevel;

/// Filter directives for `level`, with HTTP stack internals silenced.
pub fn env_filter_directives(level: LogLevel) -> String {
    format!("h2=off,hyper=off,rustls=off,{}", level.as_ref())
}

/// Installs the global fmt subscriber. Fails if one is already installed or the filter
/// cannot be parsed.
pub fn init(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(env_filter_directives(level))?;

    tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .try_init()?;

    debug!("Logging subsystem enabled");
    Ok(())
}
