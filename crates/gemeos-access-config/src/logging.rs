// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ConfigError;
use crate::sections::{LogFormat, LoggingConfig};

/// Builds the filter: `RUST_LOG` wins, the configured level is the fallback.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global tracing subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
	let registry = tracing_subscriber::registry().with(env_filter(config));

	let result = match config.format {
		LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
		LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
	};

	result.map_err(|e| ConfigError::Logging(e.to_string()))
}

/// Checks that `level` is a valid `EnvFilter` directive.
pub(crate) fn validate_level(level: &str) -> Result<(), ConfigError> {
	EnvFilter::try_new(level)
		.map(|_| ())
		.map_err(|e| ConfigError::validation(format!("invalid log level '{level}': {e}")))
}
