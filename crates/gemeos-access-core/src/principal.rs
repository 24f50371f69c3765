// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The current user as seen by access control.
//!
//! A [`Principal`] is built by the authentication layer from the active session and
//! tenant context. It carries only what decisions need: who the user is, which
//! tenant they are acting in, the role names they hold there, and whether they have
//! completed two-factor enrolment.

use crate::types::{TenantId, UserId, PLATFORM_ADMIN};
use serde::{Deserialize, Serialize};

/// Attributes describing the user requesting access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	pub user_id: UserId,
	pub tenant_id: Option<TenantId>,
	pub roles: Vec<String>,
	pub has_2fa: bool,
}

impl Principal {
	/// Creates a principal with no tenant context, no roles and no 2FA.
	pub fn new(user_id: UserId) -> Self {
		Self {
			user_id,
			tenant_id: None,
			roles: Vec::new(),
			has_2fa: false,
		}
	}

	/// Builder: set the tenant the principal is acting in.
	pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
		self.tenant_id = Some(tenant_id);
		self
	}

	/// Builder: add a role.
	pub fn with_role(mut self, role: impl Into<String>) -> Self {
		self.roles.push(role.into());
		self
	}

	/// Builder: set two-factor status.
	pub fn with_2fa(mut self, has_2fa: bool) -> Self {
		self.has_2fa = has_2fa;
		self
	}

	/// Returns true if the principal holds the given role.
	pub fn has_role(&self, role: &str) -> bool {
		self.roles.iter().any(|r| r == role)
	}

	/// Returns true if the principal holds at least one of the roles.
	pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
		roles.iter().any(|r| self.has_role(r.as_ref()))
	}

	/// Returns true if the principal holds every one of the roles.
	pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
		roles.iter().all(|r| self.has_role(r.as_ref()))
	}

	pub fn is_platform_admin(&self) -> bool {
		self.has_role(PLATFORM_ADMIN)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_principal_has_no_roles() {
		let principal = Principal::new(UserId::generate());
		assert!(principal.roles.is_empty());
		assert!(principal.tenant_id.is_none());
		assert!(!principal.has_2fa);
		assert!(!principal.is_platform_admin());
	}

	#[test]
	fn role_queries() {
		let principal = Principal::new(UserId::generate())
			.with_role("teacher")
			.with_role("student");

		assert!(principal.has_role("teacher"));
		assert!(!principal.has_role("tenant_admin"));
		assert!(principal.has_any_role(&["tenant_admin", "teacher"]));
		assert!(!principal.has_any_role(&["tenant_admin", "platform_admin"]));
		assert!(principal.has_all_roles(&["teacher", "student"]));
		assert!(!principal.has_all_roles(&["teacher", "tenant_admin"]));
	}

	#[test]
	fn empty_role_lists() {
		let principal = Principal::new(UserId::generate()).with_role("teacher");
		let none: [&str; 0] = [];
		assert!(!principal.has_any_role(&none));
		assert!(principal.has_all_roles(&none));
	}

	#[test]
	fn platform_admin_detection() {
		let principal = Principal::new(UserId::generate()).with_role(PLATFORM_ADMIN);
		assert!(principal.is_platform_admin());
	}
}
