// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::AccessConfigLayer;
use crate::sections::{
	EvaluationConfigLayer, LogFormat, LoggingConfigLayer, PolicyConfigLayer, RoutingConfigLayer,
};

/// Default location of the system configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/gemeos/access.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<AccessConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<AccessConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(AccessConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<AccessConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AccessConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: AccessConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: GEMEOS_ACCESS_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<AccessConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(AccessConfigLayer {
			policy: Some(load_policy_from_env()),
			routing: Some(load_routing_from_env()),
			evaluation: Some(load_evaluation_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_policy_from_env() -> PolicyConfigLayer {
	PolicyConfigLayer {
		file: env_var("GEMEOS_ACCESS_POLICY_FILE").map(PathBuf::from),
	}
}

fn load_routing_from_env() -> RoutingConfigLayer {
	RoutingConfigLayer {
		login_path: env_var("GEMEOS_ACCESS_LOGIN_PATH"),
		unauthorized_path: env_var("GEMEOS_ACCESS_UNAUTHORIZED_PATH"),
	}
}

fn load_evaluation_from_env() -> Result<EvaluationConfigLayer, ConfigError> {
	Ok(EvaluationConfigLayer {
		lookup_timeout_ms: env_u64("GEMEOS_ACCESS_LOOKUP_TIMEOUT_MS")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("GEMEOS_ACCESS_LOG_FORMAT") {
		Some(v) => Some(
			v.parse::<LogFormat>()
				.map_err(|message| ConfigError::InvalidValue {
					key: "GEMEOS_ACCESS_LOG_FORMAT".to_string(),
					message,
				})?,
		),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("GEMEOS_ACCESS_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.policy.is_none());
		assert!(layer.routing.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let source = TomlSource::new("/nonexistent/gemeos/access.toml");
		let layer = source.load().unwrap();
		assert!(layer.routing.is_none());
	}

	#[test]
	fn test_toml_source_reads_sections() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(
			file,
			"[routing]\nlogin_path = \"/sign-in\"\n\n[evaluation]\nlookup_timeout_ms = 500"
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(
			layer.routing.unwrap().login_path.as_deref(),
			Some("/sign-in")
		);
		assert_eq!(layer.evaluation.unwrap().lookup_timeout_ms, Some(500));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "[routing\nlogin_path = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_system_source_path() {
		assert_eq!(TomlSource::system().path, PathBuf::from(SYSTEM_CONFIG_PATH));
	}
}
