// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for loading and validating a policy document.

use thiserror::Error;

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// A policy document that cannot be turned into a registry.
///
/// These are startup-time configuration faults. Once a registry exists, every
/// lookup is total and never returns an error.
#[derive(Debug, Error)]
pub enum PolicyError {
	#[error("failed to parse policy document: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("unsupported policy document version {0}")]
	UnsupportedVersion(u32),

	#[error("duplicate role: {0}")]
	DuplicateRole(String),

	#[error("duplicate resource: {0}")]
	DuplicateResource(String),

	#[error("{context} references unknown role '{role}'")]
	UnknownRole { context: String, role: String },

	#[error("{context} references unknown resource '{resource}'")]
	UnknownResource { context: String, resource: String },

	#[error("{context} references action '{action}' not declared by resource '{resource}'")]
	UnknownAction {
		context: String,
		resource: String,
		action: String,
	},

	#[error("role inheritance cycle through '{0}'")]
	InheritanceCycle(String),

	#[error("role '{role}' inherits from '{parent}', which is not less privileged")]
	InheritanceLevel { role: String, parent: String },

	#[error("resource '{0}' declares no actions")]
	EmptyActions(String),

	#[error("resource '{resource}' declares action '{action}' more than once")]
	DuplicateAction { resource: String, action: String },

	#[error("route rule #{index}: {message}")]
	InvalidRoute { index: usize, message: String },

	#[error("route rule #{index}: invalid pattern '{pattern}': {source}")]
	InvalidPattern {
		index: usize,
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("invalid sensitive operation '{0}', expected 'resource.action'")]
	InvalidSensitiveOperation(String),

	#[error("{tier} session_timeout.{key} must be a non-negative duration in range, got {value}")]
	InvalidSessionTimeout {
		tier: String,
		key: String,
		value: String,
	},

	#[error("failed to read policy file {path}: {source}")]
	Io {
		path: std::path::PathBuf,
		#[source]
		source: std::io::Error,
	},
}
