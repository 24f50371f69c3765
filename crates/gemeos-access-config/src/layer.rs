// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration as produced by a single source.

use serde::Deserialize;

use crate::sections::{
	EvaluationConfigLayer, LoggingConfigLayer, PolicyConfigLayer, RoutingConfigLayer,
};

/// One source's view of the configuration. Unset sections and fields are `None`
/// and leave lower-precedence values in place when merged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessConfigLayer {
	#[serde(default)]
	pub policy: Option<PolicyConfigLayer>,
	#[serde(default)]
	pub routing: Option<RoutingConfigLayer>,
	#[serde(default)]
	pub evaluation: Option<EvaluationConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

macro_rules! merge_section {
	($self:ident, $other:ident, $field:ident) => {
		if let Some(incoming) = $other.$field {
			match $self.$field.as_mut() {
				Some(existing) => existing.merge(incoming),
				None => $self.$field = Some(incoming),
			}
		}
	};
}

impl AccessConfigLayer {
	/// Overlays `other` on top of `self`.
	pub fn merge(&mut self, other: AccessConfigLayer) {
		merge_section!(self, other, policy);
		merge_section!(self, other, routing);
		merge_section!(self, other, evaluation);
		merge_section!(self, other, logging);
	}
}
