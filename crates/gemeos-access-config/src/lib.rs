// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for Gemeos access control.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`GEMEOS_ACCESS_*`)
//! - Tracing subscriber setup driven by the `logging` section
//!
//! # Usage
//!
//! ```ignore
//! use gemeos_access_config::{init_tracing, load_config};
//!
//! let config = load_config()?;
//! init_tracing(&config.logging)?;
//! ```

pub mod error;
pub mod layer;
pub mod logging;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AccessConfigLayer;
pub use logging::{env_filter, init_tracing};
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved access-control configuration.
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
	pub policy: PolicyConfig,
	pub routing: RoutingConfig,
	pub evaluation: EvaluationConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`GEMEOS_ACCESS_*`)
/// 2. Config file (`/etc/gemeos/access.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<AccessConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<AccessConfig, ConfigError> {
	let mut merged = AccessConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<AccessConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and finalize.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<AccessConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AccessConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: AccessConfigLayer) -> Result<AccessConfig, ConfigError> {
	let policy = layer.policy.unwrap_or_default().finalize();
	let routing = layer.routing.unwrap_or_default().finalize();
	let evaluation = layer.evaluation.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&routing, &logging)?;

	info!(
		policy_file = ?policy.file,
		login_path = %routing.login_path,
		unauthorized_path = %routing.unauthorized_path,
		lookup_timeout = ?evaluation.lookup_timeout,
		log_level = %logging.level,
		"Access control configuration loaded"
	);

	Ok(AccessConfig {
		policy,
		routing,
		evaluation,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(routing: &RoutingConfig, logging: &LoggingConfig) -> Result<(), ConfigError> {
	for (key, path) in [
		("routing.login_path", &routing.login_path),
		("routing.unauthorized_path", &routing.unauthorized_path),
	] {
		if !path.starts_with('/') {
			return Err(ConfigError::validation(format!(
				"{key} must be an absolute path, got '{path}'"
			)));
		}
	}

	if routing.login_path == routing.unauthorized_path {
		return Err(ConfigError::validation(format!(
			"routing.login_path and routing.unauthorized_path must differ (both '{}')",
			routing.login_path
		)));
	}

	logging::validate_level(&logging.level)
}
