// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization decisions.
//!
//! A denial is a value, not an error. [`DecisionReason`] keeps the categories
//! callers need to tell apart: a plain lack of privilege, a security-policy
//! violation the user can fix, and a configuration fault.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::security::SecurityViolation;
use crate::types::InstanceId;

/// Why a decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
	/// Granted because the principal is a platform admin.
	PlatformAdminBypass,
	/// Granted because the principal is acting on their own user record.
	OwnProfile,
	/// The principal lacks the required role(s).
	MissingRole { roles: Vec<String>, require_all: bool },
	/// No role held by the principal grants the action.
	MissingPermission { resource: String, action: String },
	/// None of the alternative permissions were granted.
	MissingAnyPermission,
	/// The instance belongs to another tenant, or the principal has no tenant.
	TenantMismatch,
	/// Ownership was required and the principal is not the owner.
	NotOwner,
	InstanceNotFound {
		resource: String,
		instance_id: InstanceId,
	},
	/// A security requirement such as 2FA was not met.
	SecurityPolicy { violation: SecurityViolation },
	NoMatchingRoute { path: String },
	Unauthenticated,
	/// The request or the principal references something the registry does not
	/// know. Denied, but indicates a configuration bug.
	ConfigurationFault { message: String },
}

impl fmt::Display for DecisionReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DecisionReason::PlatformAdminBypass => write!(f, "Platform administrator access"),
			DecisionReason::OwnProfile => write!(f, "Own profile access"),
			DecisionReason::MissingRole { roles, require_all } => {
				let joiner = if *require_all { " and " } else { " or " };
				write!(f, "Requires role {}", roles.join(joiner))
			}
			DecisionReason::MissingPermission { resource, action } => {
				write!(f, "Requires {action} permission on {resource}")
			}
			DecisionReason::MissingAnyPermission => {
				write!(f, "Requires at least one of the listed permissions")
			}
			DecisionReason::TenantMismatch => write!(f, "Resource belongs to a different tenant"),
			DecisionReason::NotOwner => write!(f, "Only the owner may perform this action"),
			DecisionReason::InstanceNotFound {
				resource,
				instance_id,
			} => write!(f, "{resource} {instance_id} not found"),
			DecisionReason::SecurityPolicy { violation } => write!(f, "{violation}"),
			DecisionReason::NoMatchingRoute { path } => write!(f, "No access rule for {path}"),
			DecisionReason::Unauthenticated => write!(f, "Authentication required"),
			DecisionReason::ConfigurationFault { message } => {
				write!(f, "Access configuration error: {message}")
			}
		}
	}
}

/// Result of one authorization evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
	pub allowed: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<DecisionReason>,
}

impl AuthorizationDecision {
	pub fn allow() -> Self {
		Self {
			allowed: true,
			reason: None,
		}
	}

	pub fn allow_because(reason: DecisionReason) -> Self {
		Self {
			allowed: true,
			reason: Some(reason),
		}
	}

	pub fn deny(reason: DecisionReason) -> Self {
		Self {
			allowed: false,
			reason: Some(reason),
		}
	}

	pub fn is_allowed(&self) -> bool {
		self.allowed
	}

	/// True when the denial is something the user can fix, such as enrolling in 2FA.
	pub fn is_security_violation(&self) -> bool {
		!self.allowed && matches!(self.reason, Some(DecisionReason::SecurityPolicy { .. }))
	}

	pub fn is_configuration_fault(&self) -> bool {
		matches!(self.reason, Some(DecisionReason::ConfigurationFault { .. }))
	}

	/// Message suitable for showing to the user.
	pub fn message(&self) -> Option<String> {
		self.reason.as_ref().map(ToString::to_string)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_permission_message() {
		let decision = AuthorizationDecision::deny(DecisionReason::MissingPermission {
			resource: "concept".to_string(),
			action: "delete".to_string(),
		});
		assert!(!decision.is_allowed());
		assert_eq!(
			decision.message().as_deref(),
			Some("Requires delete permission on concept")
		);
	}

	#[test]
	fn security_violation_is_distinct() {
		let decision = AuthorizationDecision::deny(DecisionReason::SecurityPolicy {
			violation: SecurityViolation::TwoFactorRequired,
		});
		assert!(decision.is_security_violation());
		assert!(!decision.is_configuration_fault());
		assert_eq!(
			decision.message().as_deref(),
			Some("Two-factor authentication required for this operation")
		);
	}

	#[test]
	fn plain_allow_has_no_reason() {
		let decision = AuthorizationDecision::allow();
		assert!(decision.allowed);
		assert!(decision.message().is_none());
		assert!(!decision.is_security_violation());
	}

	#[test]
	fn serializes_with_tagged_reason() {
		let decision = AuthorizationDecision::deny(DecisionReason::TenantMismatch);
		let json = serde_json::to_value(&decision).unwrap();
		assert_eq!(json["allowed"], false);
		assert_eq!(json["reason"]["kind"], "tenant_mismatch");
	}

	#[test]
	fn role_reason_joins_names() {
		let any = DecisionReason::MissingRole {
			roles: vec!["teacher".to_string(), "tenant_admin".to_string()],
			require_all: false,
		};
		assert_eq!(any.to_string(), "Requires role teacher or tenant_admin");
	}
}
