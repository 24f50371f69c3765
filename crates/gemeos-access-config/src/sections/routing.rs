// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route guard redirect targets.

use serde::Deserialize;

const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Routing configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
	/// Where unauthenticated users are sent.
	pub login_path: String,
	/// Where denied users are sent, including paths no rule covers.
	pub unauthorized_path: String,
}

impl Default for RoutingConfig {
	fn default() -> Self {
		Self {
			login_path: DEFAULT_LOGIN_PATH.to_string(),
			unauthorized_path: DEFAULT_UNAUTHORIZED_PATH.to_string(),
		}
	}
}

/// Routing configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutingConfigLayer {
	#[serde(default)]
	pub login_path: Option<String>,
	#[serde(default)]
	pub unauthorized_path: Option<String>,
}

impl RoutingConfigLayer {
	pub fn merge(&mut self, other: RoutingConfigLayer) {
		if other.login_path.is_some() {
			self.login_path = other.login_path;
		}
		if other.unauthorized_path.is_some() {
			self.unauthorized_path = other.unauthorized_path;
		}
	}

	pub fn finalize(self) -> RoutingConfig {
		RoutingConfig {
			login_path: self
				.login_path
				.unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
			unauthorized_path: self
				.unauthorized_path
				.unwrap_or_else(|| DEFAULT_UNAUTHORIZED_PATH.to_string()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_paths() {
		let config = RoutingConfigLayer::default().finalize();
		assert_eq!(config, RoutingConfig::default());
		assert_eq!(config.login_path, "/login");
		assert_eq!(config.unauthorized_path, "/unauthorized");
	}

	#[test]
	fn test_partial_override() {
		let mut layer = RoutingConfigLayer::default();
		layer.merge(RoutingConfigLayer {
			login_path: Some("/sign-in".to_string()),
			unauthorized_path: None,
		});
		let config = layer.finalize();
		assert_eq!(config.login_path, "/sign-in");
		assert_eq!(config.unauthorized_path, "/unauthorized");
	}
}
