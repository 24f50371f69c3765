// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Security policies layered on top of the permission matrix.
//!
//! This is a separate system from role grants. The platform-admin bypass applies to
//! the matrix only; platform admins are still subject to every check here.
//!
//! - [`SecurityPolicies`]: sensitive operations plus the per-tier policy tables
//! - [`SecurityCheck`]: result of [`SecurityPolicies::validate_security_requirements`]
//! - [`SessionTimeoutPolicy`]: typed view over the `session_timeout` policy

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::SecurityDocument;
use crate::error::{PolicyError, Result};
use crate::principal::Principal;
use crate::types::{PermissionRef, PLATFORM_ADMIN};

/// Policy requiring two-factor authentication.
pub const REQUIRE_2FA: &str = "require_2fa";

/// Policy bounding session lifetime.
pub const SESSION_TIMEOUT: &str = "session_timeout";

const DEFAULT_INACTIVITY_MINUTES: i64 = 120;
const DEFAULT_ABSOLUTE_HOURS: i64 = 24;
const DEFAULT_WARNING_MINUTES: i64 = 10;

/// `session_timeout` config keys and how each converts to a duration.
const SESSION_TIMEOUT_KEYS: [(&str, fn(i64) -> Option<Duration>); 3] = [
	("inactivity_minutes", Duration::try_minutes),
	("absolute_hours", Duration::try_hours),
	("warning_minutes", Duration::try_minutes),
];

/// A named policy: an on/off switch plus free-form settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
	pub enabled: bool,
	#[serde(default)]
	pub config: serde_json::Map<String, serde_json::Value>,
}

/// Which policy table applies to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTier {
	PlatformAdmin,
	GeneralUsers,
}

impl fmt::Display for PolicyTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PolicyTier::PlatformAdmin => write!(f, "platform_admin"),
			PolicyTier::GeneralUsers => write!(f, "general_users"),
		}
	}
}

/// Why a security requirement was not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityViolation {
	/// The operation is sensitive and the user has no 2FA.
	TwoFactorRequired,
	/// Platform admins must have 2FA regardless of the operation.
	PlatformAdminTwoFactorRequired,
}

impl fmt::Display for SecurityViolation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SecurityViolation::TwoFactorRequired => {
				write!(f, "Two-factor authentication required for this operation")
			}
			SecurityViolation::PlatformAdminTwoFactorRequired => {
				write!(f, "Platform administrators must enable two-factor authentication")
			}
		}
	}
}

/// Outcome of a security requirement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCheck {
	pub valid: bool,
	pub violation: Option<SecurityViolation>,
}

impl SecurityCheck {
	pub fn passed() -> Self {
		Self {
			valid: true,
			violation: None,
		}
	}

	pub fn failed(violation: SecurityViolation) -> Self {
		Self {
			valid: false,
			violation: Some(violation),
		}
	}

	/// User-facing reason, present only when the check failed.
	pub fn reason(&self) -> Option<String> {
		self.violation.map(|v| v.to_string())
	}
}

/// Validated security section of the policy document.
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicies {
	sensitive: BTreeSet<PermissionRef>,
	platform_admin: BTreeMap<String, SecurityPolicy>,
	general_users: BTreeMap<String, SecurityPolicy>,
}

impl SecurityPolicies {
	pub(crate) fn from_document(doc: &SecurityDocument) -> Result<Self> {
		let mut sensitive = BTreeSet::new();
		for operation in &doc.sensitive_operations {
			sensitive.insert(parse_operation(operation)?);
		}

		for (tier, table) in [
			(PolicyTier::PlatformAdmin, &doc.platform_admin),
			(PolicyTier::GeneralUsers, &doc.general_users),
		] {
			if let Some(policy) = table.get(SESSION_TIMEOUT) {
				validate_session_timeout(tier, policy)?;
			}
		}

		debug!(
			sensitive_operations = sensitive.len(),
			platform_admin_policies = doc.platform_admin.len(),
			general_user_policies = doc.general_users.len(),
			"security policies loaded"
		);

		Ok(Self {
			sensitive,
			platform_admin: doc.platform_admin.clone(),
			general_users: doc.general_users.clone(),
		})
	}

	/// Returns true if `resource.action` is on the sensitive-operation list.
	pub fn is_sensitive_operation(&self, resource: &str, action: &str) -> bool {
		self
			.sensitive
			.iter()
			.any(|op| op.resource == resource && op.action == action)
	}

	pub fn sensitive_operations(&self) -> impl Iterator<Item = &PermissionRef> {
		self.sensitive.iter()
	}

	/// The policy table for a tier.
	pub fn tier(&self, tier: PolicyTier) -> &BTreeMap<String, SecurityPolicy> {
		match tier {
			PolicyTier::PlatformAdmin => &self.platform_admin,
			PolicyTier::GeneralUsers => &self.general_users,
		}
	}

	/// The tier that applies to a role name.
	pub fn tier_for_role(role: &str) -> PolicyTier {
		if role == PLATFORM_ADMIN {
			PolicyTier::PlatformAdmin
		} else {
			PolicyTier::GeneralUsers
		}
	}

	/// The tier that applies to a principal. Holding `platform_admin` at all selects
	/// the stricter table.
	pub fn tier_for_principal(principal: &Principal) -> PolicyTier {
		if principal.is_platform_admin() {
			PolicyTier::PlatformAdmin
		} else {
			PolicyTier::GeneralUsers
		}
	}

	/// The policy table for a role name.
	pub fn security_policy_for_role(&self, role: &str) -> &BTreeMap<String, SecurityPolicy> {
		self.tier(Self::tier_for_role(role))
	}

	/// Looks up a single policy in a tier.
	pub fn policy(&self, tier: PolicyTier, name: &str) -> Option<&SecurityPolicy> {
		self.tier(tier).get(name)
	}

	/// Checks the security requirements for performing `action` on `resource`.
	///
	/// 1. Sensitive operations require 2FA.
	/// 2. Platform admins require 2FA whenever their tier enables `require_2fa`.
	pub fn validate_security_requirements(
		&self,
		principal: &Principal,
		resource: &str,
		action: &str,
	) -> SecurityCheck {
		if self.is_sensitive_operation(resource, action) && !principal.has_2fa {
			return SecurityCheck::failed(SecurityViolation::TwoFactorRequired);
		}

		if principal.is_platform_admin() && !principal.has_2fa {
			let required = self
				.policy(PolicyTier::PlatformAdmin, REQUIRE_2FA)
				.map(|p| p.enabled)
				.unwrap_or(false);
			if required {
				return SecurityCheck::failed(SecurityViolation::PlatformAdminTwoFactorRequired);
			}
		}

		SecurityCheck::passed()
	}

	/// Session timeout settings for a principal's tier.
	pub fn session_timeout(&self, principal: &Principal) -> SessionTimeoutPolicy {
		let tier = Self::tier_for_principal(principal);
		match self.policy(tier, SESSION_TIMEOUT) {
			Some(policy) => SessionTimeoutPolicy::from_policy(policy),
			None => SessionTimeoutPolicy::disabled(),
		}
	}
}

fn parse_operation(operation: &str) -> Result<PermissionRef> {
	match operation.split_once('.') {
		Some((resource, action))
			if !resource.is_empty() && !action.is_empty() && !action.contains('.') =>
		{
			Ok(PermissionRef::new(resource, action))
		}
		_ => Err(PolicyError::InvalidSensitiveOperation(operation.to_string())),
	}
}

// =============================================================================
// Session timeout
// =============================================================================

/// Why a session expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
	Inactivity,
	Absolute,
}

/// Where a session stands relative to its timeout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
	Active,
	/// The session expires within the warning window.
	Warning { expires_in_secs: i64 },
	Expired { reason: ExpiryReason },
}

/// Typed view of the `session_timeout` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeoutPolicy {
	pub enabled: bool,
	pub inactivity: Duration,
	pub absolute: Duration,
	pub warning: Duration,
}

impl SessionTimeoutPolicy {
	/// Values that are missing or out of range fall back to the defaults. Registry
	/// loading rejects out-of-range values, so that only happens for hand-built policies.
	pub fn from_policy(policy: &SecurityPolicy) -> Self {
		let disabled = Self::disabled();
		let [inactivity, absolute, warning] = SESSION_TIMEOUT_KEYS
			.map(|(key, to_duration)| session_duration(policy, key, to_duration).and_then(|d| d.ok()));
		Self {
			enabled: policy.enabled,
			inactivity: inactivity.unwrap_or(disabled.inactivity),
			absolute: absolute.unwrap_or(disabled.absolute),
			warning: warning.unwrap_or(disabled.warning),
		}
	}

	pub fn disabled() -> Self {
		Self {
			enabled: false,
			inactivity: Duration::minutes(DEFAULT_INACTIVITY_MINUTES),
			absolute: Duration::hours(DEFAULT_ABSOLUTE_HOURS),
			warning: Duration::minutes(DEFAULT_WARNING_MINUTES),
		}
	}

	/// Classifies a session at `now`. A disabled policy never expires sessions.
	pub fn status(
		&self,
		started_at: DateTime<Utc>,
		last_activity_at: DateTime<Utc>,
		now: DateTime<Utc>,
	) -> SessionStatus {
		if !self.enabled {
			return SessionStatus::Active;
		}

		// A deadline past the representable range is never reached.
		let absolute_deadline = started_at
			.checked_add_signed(self.absolute)
			.unwrap_or(DateTime::<Utc>::MAX_UTC);
		let inactivity_deadline = last_activity_at
			.checked_add_signed(self.inactivity)
			.unwrap_or(DateTime::<Utc>::MAX_UTC);

		if now >= absolute_deadline {
			return SessionStatus::Expired {
				reason: ExpiryReason::Absolute,
			};
		}
		if now >= inactivity_deadline {
			return SessionStatus::Expired {
				reason: ExpiryReason::Inactivity,
			};
		}

		let remaining = absolute_deadline.min(inactivity_deadline) - now;
		if remaining <= self.warning {
			SessionStatus::Warning {
				expires_in_secs: remaining.num_seconds(),
			}
		} else {
			SessionStatus::Active
		}
	}
}

/// Reads one `session_timeout` value. `None` when the key is absent, `Some(Err)`
/// carrying the raw value when it is not a non-negative, representable count.
fn session_duration(
	policy: &SecurityPolicy,
	key: &str,
	to_duration: fn(i64) -> Option<Duration>,
) -> Option<std::result::Result<Duration, String>> {
	let value = policy.config.get(key)?;
	Some(
		value
			.as_i64()
			.filter(|count| *count >= 0)
			.and_then(to_duration)
			.ok_or_else(|| value.to_string()),
	)
}

fn validate_session_timeout(tier: PolicyTier, policy: &SecurityPolicy) -> Result<()> {
	for (key, to_duration) in SESSION_TIMEOUT_KEYS {
		if let Some(Err(value)) = session_duration(policy, key, to_duration) {
			return Err(PolicyError::InvalidSessionTimeout {
				tier: tier.to_string(),
				key: key.to_string(),
				value,
			});
		}
	}
	Ok(())
}
