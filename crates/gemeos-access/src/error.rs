// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for evaluation and setup.
//!
//! Denials are never errors. These types cover the cases where no decision
//! could be reached (a failed instance lookup) or the access layer could not
//! be built at all.

use std::time::Duration;

use gemeos_access_config::ConfigError;
use gemeos_access_core::{InstanceId, PolicyError};
use thiserror::Error;

/// Failure reported by an [`crate::InstanceLookup`] implementation.
#[derive(Debug, Error)]
pub enum LookupError {
	#[error("instance store unavailable: {0}")]
	Unavailable(String),

	#[error("instance lookup failed: {0}")]
	Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// An evaluation that could not reach a decision. Callers may retry.
#[derive(Debug, Error)]
pub enum EvaluationError {
	#[error("failed to look up {resource} {instance_id}: {source}")]
	Lookup {
		resource: String,
		instance_id: InstanceId,
		#[source]
		source: LookupError,
	},

	#[error("lookup of {resource} {instance_id} timed out after {timeout:?}")]
	LookupTimeout {
		resource: String,
		instance_id: InstanceId,
		timeout: Duration,
	},
}

/// Failure building the access-control layer.
#[derive(Debug, Error)]
pub enum AccessError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Policy(#[from] PolicyError),
}

pub type Result<T> = std::result::Result<T, EvaluationError>;
