// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy document location.

use std::path::PathBuf;

use serde::Deserialize;

/// Policy configuration (runtime, fully resolved).
///
/// `file` is `None` when the built-in policy should be used.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
	pub file: Option<PathBuf>,
}

/// Policy configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyConfigLayer {
	#[serde(default)]
	pub file: Option<PathBuf>,
}

impl PolicyConfigLayer {
	pub fn merge(&mut self, other: PolicyConfigLayer) {
		if other.file.is_some() {
			self.file = other.file;
		}
	}

	pub fn finalize(self) -> PolicyConfig {
		PolicyConfig { file: self.file }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builtin_policy_by_default() {
		let config = PolicyConfigLayer::default().finalize();
		assert!(config.file.is_none());
	}

	#[test]
	fn test_merge_overrides_file() {
		let mut layer = PolicyConfigLayer {
			file: Some(PathBuf::from("/etc/gemeos/policy.toml")),
		};
		layer.merge(PolicyConfigLayer {
			file: Some(PathBuf::from("/srv/policy.toml")),
		});
		layer.merge(PolicyConfigLayer::default());
		assert_eq!(layer.finalize().file, Some(PathBuf::from("/srv/policy.toml")));
	}
}
