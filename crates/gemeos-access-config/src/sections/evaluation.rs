// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Evaluator tuning.

use std::time::Duration;

use serde::Deserialize;

/// Evaluation configuration (runtime, fully resolved).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationConfig {
	/// Upper bound on a single instance lookup. `None` leaves timeouts to the
	/// data layer.
	pub lookup_timeout: Option<Duration>,
}

/// Evaluation configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationConfigLayer {
	#[serde(default)]
	pub lookup_timeout_ms: Option<u64>,
}

impl EvaluationConfigLayer {
	pub fn merge(&mut self, other: EvaluationConfigLayer) {
		if other.lookup_timeout_ms.is_some() {
			self.lookup_timeout_ms = other.lookup_timeout_ms;
		}
	}

	/// A zero timeout means no timeout.
	pub fn finalize(self) -> EvaluationConfig {
		EvaluationConfig {
			lookup_timeout: self
				.lookup_timeout_ms
				.filter(|ms| *ms > 0)
				.map(Duration::from_millis),
		}
	}
}
