// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Serde model of the policy document.
//!
//! The document is the versioned configuration surface consumed by every other part
//! of the platform. It is deliberately plain data; [`crate::PolicyRegistry`] is the
//! validated, indexed form used at runtime.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::security::SecurityPolicy;
use crate::types::PermissionRef;

/// The only document version this crate understands.
pub const POLICY_DOCUMENT_VERSION: u32 = 1;

/// Top-level policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
	pub version: u32,
	#[serde(default)]
	pub roles: Vec<RoleDefinition>,
	#[serde(default)]
	pub resources: Vec<ResourceDefinition>,
	/// role -> resource (or `*`) -> actions (or `*`).
	#[serde(default)]
	pub matrix: BTreeMap<String, BTreeMap<String, Vec<String>>>,
	/// Route rules in precedence order.
	#[serde(default)]
	pub routes: Vec<RouteRuleDocument>,
	#[serde(default)]
	pub security: SecurityDocument,
	#[serde(default)]
	pub special: SpecialAccessRules,
}

/// A role and its place in the hierarchy.
///
/// Lower `hierarchy_level` means more privileged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
	pub name: String,
	pub display_name: String,
	#[serde(default)]
	pub description: String,
	pub hierarchy_level: u32,
	#[serde(default)]
	pub inherits_from: Vec<String>,
}

/// A category of protected object and the actions it supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
	pub name: String,
	pub actions: Vec<String>,
	#[serde(default)]
	pub description: String,
}

impl ResourceDefinition {
	pub fn has_action(&self, action: &str) -> bool {
		self.actions.iter().any(|a| a == action)
	}
}

/// Route rule as authored. Exactly one of `path`, `pattern` or `regex` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRuleDocument {
	/// Exact path, compared with string equality.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	/// Path with `:param` segments, e.g. `/admin/domain/:id/concepts`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pattern: Option<String>,
	/// Raw regular expression; must be anchored with `^`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub regex: Option<String>,
	#[serde(default)]
	pub public: bool,
	#[serde(default)]
	pub roles: Vec<String>,
	#[serde(default)]
	pub permissions: Vec<PermissionRef>,
}

/// Security policy section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityDocument {
	/// `resource.action` strings that need elevated verification.
	#[serde(default)]
	pub sensitive_operations: Vec<String>,
	#[serde(default)]
	pub platform_admin: BTreeMap<String, SecurityPolicy>,
	#[serde(default)]
	pub general_users: BTreeMap<String, SecurityPolicy>,
}

/// Switches for the behaviours that sit outside the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialAccessRules {
	/// Users may always read and update their own `user` record.
	#[serde(default = "default_true")]
	pub own_profile_access: bool,
	/// Roles inherit the grants of the roles listed in `inherits_from`.
	#[serde(default = "default_true")]
	pub hierarchical_inheritance: bool,
}

impl Default for SpecialAccessRules {
	fn default() -> Self {
		Self {
			own_profile_access: true,
			hierarchical_inheritance: true,
		}
	}
}

fn default_true() -> bool {
	true
}
