// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission evaluation.
//!
//! [`PermissionEvaluator::evaluate`] answers an [`AccessRequest`] in four phases:
//!
//! 1. **Security gate**: sensitive operations need 2FA. The single permission
//!    and all-of entries are gated up front; an any-of list only fails when
//!    every usable alternative is blocked. Platform admins are not exempt.
//! 2. **Platform-admin bypass**: grants everything else before any lookup runs.
//! 3. **Configuration check**: unknown roles, resources or actions deny and are
//!    logged as configuration faults.
//! 4. **Accumulator**: the requested role, permission and instance checks are
//!    ANDed. The instance lookup is the only suspension point and is skipped once
//!    the result is already a denial.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use gemeos_access_core::{
	AuthorizationDecision, DecisionReason, InstanceId, PermissionRef, PolicyRegistry, Principal,
	SecurityViolation,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{EvaluationError, Result};
use crate::lookup::{InstanceLookup, InstanceRecord};
use crate::request::AccessRequest;

/// Resource name for user accounts; subject to own-profile access.
const USER_RESOURCE: &str = "user";
const OWN_PROFILE_ACTIONS: [&str; 2] = ["read", "update"];

/// Whether a control should be enabled, and why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
	pub disabled: bool,
	pub reason: Option<String>,
}

/// Evaluates access requests against a policy registry.
///
/// Cheap to share: wrap it in an `Arc` and hand it to every gate and guard.
pub struct PermissionEvaluator {
	registry: Arc<PolicyRegistry>,
	lookup: Arc<dyn InstanceLookup>,
	lookup_timeout: Option<Duration>,
}

impl PermissionEvaluator {
	pub fn new(registry: Arc<PolicyRegistry>, lookup: Arc<dyn InstanceLookup>) -> Self {
		Self {
			registry,
			lookup,
			lookup_timeout: None,
		}
	}

	/// Bounds each instance lookup. `None` waits as long as the lookup does.
	pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.lookup_timeout = timeout;
		self
	}

	pub fn registry(&self) -> &Arc<PolicyRegistry> {
		&self.registry
	}

	/// Evaluates a composite request.
	///
	/// Returns `Err` only when the instance lookup fails; every denial is an
	/// `Ok` decision with `allowed == false`.
	#[instrument(
		level = "debug",
		skip(self, principal, request),
		fields(
			user_id = %principal.user_id,
			permission = ?request.permission,
			resource_id = ?request.resource_id,
		)
	)]
	pub async fn evaluate(
		&self,
		principal: &Principal,
		request: &AccessRequest,
	) -> Result<AuthorizationDecision> {
		if let Some(denied) = self.security_gate(principal, gated_operations(request)) {
			return Ok(denied);
		}

		if principal.is_platform_admin() {
			if let Some(reason) = self.any_of_denial(principal, request, |_| true) {
				debug!(reason = %reason, "access denied");
				return Ok(AuthorizationDecision::deny(reason));
			}
			debug!("platform admin bypass");
			return Ok(AuthorizationDecision::allow_because(
				DecisionReason::PlatformAdminBypass,
			));
		}

		if let Some(message) = self.principal_fault(principal).or_else(|| self.request_fault(request)) {
			return Ok(configuration_fault(message));
		}

		if let Some(reason) = self.static_denial(principal, request) {
			debug!(reason = %reason, "access denied");
			return Ok(AuthorizationDecision::deny(reason));
		}

		let decision = match request.instance_check() {
			Some((permission, instance_id)) => {
				self
					.instance_decision(principal, permission, instance_id, request.check_ownership)
					.await?
			}
			None => AuthorizationDecision::allow(),
		};

		debug!(allowed = decision.allowed, "access evaluated");
		Ok(decision)
	}

	/// Checks a single `(resource, action)` without an instance.
	pub fn can(&self, principal: &Principal, resource: &str, action: &str) -> AuthorizationDecision {
		let operation = PermissionRef::new(resource, action);

		if let Some(denied) = self.security_gate(principal, std::iter::once(&operation)) {
			return denied;
		}
		if principal.is_platform_admin() {
			return AuthorizationDecision::allow_because(DecisionReason::PlatformAdminBypass);
		}
		if let Some(message) = self
			.principal_fault(principal)
			.or_else(|| self.operation_fault(&operation))
		{
			return configuration_fault(message);
		}

		if self.grants(principal, &operation) {
			AuthorizationDecision::allow()
		} else {
			AuthorizationDecision::deny(missing_permission(&operation))
		}
	}

	/// Checks several permissions independently.
	///
	/// Keys are `resource:action`.
	pub fn check_batch(&self, principal: &Principal, checks: &[PermissionRef]) -> BTreeMap<String, bool> {
		checks
			.iter()
			.map(|check| {
				let allowed = self.can(principal, &check.resource, &check.action).allowed;
				(check.key(), allowed)
			})
			.collect()
	}

	/// Checks `action` on one instance, including the tenant check.
	pub async fn can_access_instance(
		&self,
		principal: &Principal,
		resource: &str,
		action: &str,
		instance_id: impl Into<InstanceId>,
	) -> Result<AuthorizationDecision> {
		let request = AccessRequest::for_permission(resource, action).on_instance(instance_id);
		self.evaluate(principal, &request).await
	}

	/// Returns true if the principal is the recorded owner of the instance.
	///
	/// A missing instance has no owner. A user always owns their own user record.
	pub async fn is_resource_owner(
		&self,
		principal: &Principal,
		resource: &str,
		instance_id: &InstanceId,
	) -> Result<bool> {
		if resource == USER_RESOURCE && is_own_record(principal, instance_id) {
			return Ok(true);
		}
		let record = self.fetch_instance(resource, instance_id).await?;
		Ok(record.and_then(|r| r.owner_id) == Some(principal.user_id))
	}

	/// Whether a control for `action` on `resource` should be disabled.
	///
	/// Security-policy denials keep their own message so the user knows what to fix.
	pub fn can_interact(&self, principal: &Principal, resource: &str, action: &str) -> Interaction {
		let decision = self.can(principal, resource, action);
		if decision.allowed {
			return Interaction {
				disabled: false,
				reason: None,
			};
		}

		let reason = if decision.is_security_violation() {
			decision.message()
		} else {
			Some(format!("Requires {action} permission on {resource}"))
		};
		Interaction {
			disabled: true,
			reason,
		}
	}

	// -------------------------------------------------------------------------
	// Phases
	// -------------------------------------------------------------------------

	/// Denies on the first operation whose security requirements are not met.
	fn security_gate<'a>(
		&self,
		principal: &Principal,
		mut operations: impl Iterator<Item = &'a PermissionRef>,
	) -> Option<AuthorizationDecision> {
		operations
			.find_map(|operation| self.security_violation(principal, operation))
			.map(|violation| AuthorizationDecision::deny(DecisionReason::SecurityPolicy { violation }))
	}

	fn security_violation(
		&self,
		principal: &Principal,
		operation: &PermissionRef,
	) -> Option<SecurityViolation> {
		let security = self.registry.security();
		if !security.is_sensitive_operation(&operation.resource, &operation.action) {
			return None;
		}
		let violation = security
			.validate_security_requirements(principal, &operation.resource, &operation.action)
			.violation;
		if let Some(violation) = &violation {
			debug!(operation = %operation, violation = %violation, "security requirement not met");
		}
		violation
	}

	/// Any-of alternatives. The list is satisfied by one alternative that is both
	/// granted and clear of security requirements. When every granted alternative
	/// is blocked the denial carries the security violation.
	fn any_of_denial(
		&self,
		principal: &Principal,
		request: &AccessRequest,
		granted: impl Fn(&PermissionRef) -> bool,
	) -> Option<DecisionReason> {
		if request.require_all || request.resources.is_empty() {
			return None;
		}

		let mut blocked = None;
		for alternative in request.resources.iter().filter(|&p| granted(p)) {
			match self.security_violation(principal, alternative) {
				None => return None,
				Some(violation) => {
					blocked.get_or_insert(violation);
				}
			}
		}

		Some(match blocked {
			Some(violation) => DecisionReason::SecurityPolicy { violation },
			None => DecisionReason::MissingAnyPermission,
		})
	}

	fn principal_fault(&self, principal: &Principal) -> Option<String> {
		principal
			.roles
			.iter()
			.find(|role| !self.registry.has_role(role))
			.map(|role| format!("principal holds unknown role '{role}'"))
	}

	fn request_fault(&self, request: &AccessRequest) -> Option<String> {
		if let Some(role) = request.role_names().find(|role| !self.registry.has_role(role)) {
			return Some(format!("request names unknown role '{role}'"));
		}
		request
			.operations()
			.find_map(|operation| self.operation_fault(operation))
	}

	fn operation_fault(&self, operation: &PermissionRef) -> Option<String> {
		match self.registry.resource(&operation.resource) {
			None => Some(format!("unknown resource '{}'", operation.resource)),
			Some(resource) if !resource.has_action(&operation.action) => Some(format!(
				"resource '{}' has no action '{}'",
				operation.resource, operation.action
			)),
			Some(_) => None,
		}
	}

	/// Role checks, the plain permission grant and the resource list. Returns the
	/// first failing check.
	fn static_denial(&self, principal: &Principal, request: &AccessRequest) -> Option<DecisionReason> {
		if let Some(role) = &request.role {
			if !principal.has_role(role) {
				return Some(DecisionReason::MissingRole {
					roles: vec![role.clone()],
					require_all: true,
				});
			}
		}

		if !request.roles.is_empty() {
			let satisfied = if request.require_all_roles {
				principal.has_all_roles(&request.roles)
			} else {
				principal.has_any_role(&request.roles)
			};
			if !satisfied {
				return Some(DecisionReason::MissingRole {
					roles: request.roles.clone(),
					require_all: request.require_all_roles,
				});
			}
		}

		if let Some(permission) = &request.permission {
			let own_profile = request
				.resource_id
				.as_ref()
				.map(|id| self.is_own_profile_access(principal, permission, id))
				.unwrap_or(false);
			if !own_profile && !self.grants(principal, permission) {
				return Some(missing_permission(permission));
			}
		}

		if request.require_all {
			if let Some(missing) = request.resources.iter().find(|p| !self.grants(principal, p)) {
				return Some(missing_permission(missing));
			}
		}

		self.any_of_denial(principal, request, |p| self.grants(principal, p))
	}

	async fn instance_decision(
		&self,
		principal: &Principal,
		permission: &PermissionRef,
		instance_id: &InstanceId,
		check_ownership: bool,
	) -> Result<AuthorizationDecision> {
		if self.is_own_profile_access(principal, permission, instance_id) {
			debug!("own profile access");
			return Ok(AuthorizationDecision::allow_because(DecisionReason::OwnProfile));
		}

		let Some(record) = self.fetch_instance(&permission.resource, instance_id).await? else {
			return Ok(AuthorizationDecision::deny(DecisionReason::InstanceNotFound {
				resource: permission.resource.clone(),
				instance_id: instance_id.clone(),
			}));
		};

		Ok(instance_access(principal, &record, check_ownership))
	}

	async fn fetch_instance(
		&self,
		resource: &str,
		instance_id: &InstanceId,
	) -> Result<Option<InstanceRecord>> {
		debug!(resource, instance_id = %instance_id, "fetching instance");
		let lookup = self.lookup.find_instance(resource, instance_id);
		let result = match self.lookup_timeout {
			Some(timeout) => tokio::time::timeout(timeout, lookup).await.map_err(|_| {
				EvaluationError::LookupTimeout {
					resource: resource.to_string(),
					instance_id: instance_id.clone(),
					timeout,
				}
			})?,
			None => lookup.await,
		};
		result.map_err(|source| EvaluationError::Lookup {
			resource: resource.to_string(),
			instance_id: instance_id.clone(),
			source,
		})
	}

	// -------------------------------------------------------------------------
	// Helpers
	// -------------------------------------------------------------------------

	/// True if any role held by the principal grants the operation, directly or
	/// through inheritance.
	fn grants(&self, principal: &Principal, operation: &PermissionRef) -> bool {
		principal
			.roles
			.iter()
			.any(|role| self.registry.role_grants(role, &operation.resource, &operation.action))
	}

	fn is_own_profile_access(
		&self,
		principal: &Principal,
		permission: &PermissionRef,
		instance_id: &InstanceId,
	) -> bool {
		self.registry.special().own_profile_access
			&& permission.resource == USER_RESOURCE
			&& OWN_PROFILE_ACTIONS.contains(&permission.action.as_str())
			&& is_own_record(principal, instance_id)
	}
}

/// Operations gated up front: the single permission and every all-of entry.
/// Any-of alternatives are gated one by one.
fn gated_operations(request: &AccessRequest) -> impl Iterator<Item = &PermissionRef> {
	let all_of: &[PermissionRef] = if request.require_all {
		&request.resources
	} else {
		&[]
	};
	request.permission.iter().chain(all_of)
}

/// Tenant isolation, then ownership.
fn instance_access(
	principal: &Principal,
	record: &InstanceRecord,
	check_ownership: bool,
) -> AuthorizationDecision {
	if principal.tenant_id != Some(record.tenant_id) {
		debug!(instance_tenant = %record.tenant_id, "tenant mismatch");
		return AuthorizationDecision::deny(DecisionReason::TenantMismatch);
	}
	if check_ownership && record.owner_id != Some(principal.user_id) {
		return AuthorizationDecision::deny(DecisionReason::NotOwner);
	}
	AuthorizationDecision::allow()
}

fn is_own_record(principal: &Principal, instance_id: &InstanceId) -> bool {
	instance_id.as_str() == principal.user_id.to_string()
}

fn missing_permission(operation: &PermissionRef) -> DecisionReason {
	DecisionReason::MissingPermission {
		resource: operation.resource.clone(),
		action: operation.action.clone(),
	}
}

fn configuration_fault(message: String) -> AuthorizationDecision {
	warn!(config_fault = true, %message, "access configuration fault, denying");
	AuthorizationDecision::deny(DecisionReason::ConfigurationFault { message })
}
