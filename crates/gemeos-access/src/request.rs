// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! What a caller wants checked.
//!
//! Every part of an [`AccessRequest`] is optional. The evaluator ANDs together the
//! parts that are present; absent parts are vacuously satisfied.

use gemeos_access_core::{InstanceId, PermissionRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
	/// A single role the principal must hold.
	pub role: Option<String>,
	/// Roles checked as any-of, or all-of when `require_all_roles` is set.
	pub roles: Vec<String>,
	pub require_all_roles: bool,
	/// A single `(resource, action)` grant.
	pub permission: Option<PermissionRef>,
	/// Narrows `permission` to one instance, enabling the tenant check.
	pub resource_id: Option<InstanceId>,
	/// With `resource_id`, also require the principal to own the instance.
	pub check_ownership: bool,
	/// Grants checked as any-of, or all-of when `require_all` is set.
	pub resources: Vec<PermissionRef>,
	pub require_all: bool,
}

impl AccessRequest {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn for_permission(resource: impl Into<String>, action: impl Into<String>) -> Self {
		Self::new().permission(resource, action)
	}

	pub fn role(mut self, role: impl Into<String>) -> Self {
		self.role = Some(role.into());
		self
	}

	pub fn any_role<I, S>(mut self, roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.roles = roles.into_iter().map(Into::into).collect();
		self.require_all_roles = false;
		self
	}

	pub fn all_roles<I, S>(mut self, roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.roles = roles.into_iter().map(Into::into).collect();
		self.require_all_roles = true;
		self
	}

	pub fn permission(mut self, resource: impl Into<String>, action: impl Into<String>) -> Self {
		self.permission = Some(PermissionRef::new(resource, action));
		self
	}

	pub fn on_instance(mut self, instance_id: impl Into<InstanceId>) -> Self {
		self.resource_id = Some(instance_id.into());
		self
	}

	pub fn require_ownership(mut self) -> Self {
		self.check_ownership = true;
		self
	}

	pub fn any_of(mut self, permissions: impl IntoIterator<Item = PermissionRef>) -> Self {
		self.resources = permissions.into_iter().collect();
		self.require_all = false;
		self
	}

	pub fn all_of(mut self, permissions: impl IntoIterator<Item = PermissionRef>) -> Self {
		self.resources = permissions.into_iter().collect();
		self.require_all = true;
		self
	}

	/// True when nothing is requested.
	pub fn is_empty(&self) -> bool {
		self.role.is_none()
			&& self.roles.is_empty()
			&& self.permission.is_none()
			&& self.resources.is_empty()
	}

	/// Every `(resource, action)` the request mentions.
	pub fn operations(&self) -> impl Iterator<Item = &PermissionRef> {
		self.permission.iter().chain(self.resources.iter())
	}

	/// Every role name the request mentions.
	pub fn role_names(&self) -> impl Iterator<Item = &str> {
		self
			.role
			.iter()
			.chain(self.roles.iter())
			.map(String::as_str)
	}

	/// The instance part, present only when both a permission and an instance id
	/// were given.
	pub(crate) fn instance_check(&self) -> Option<(&PermissionRef, &InstanceId)> {
		match (&self.permission, &self.resource_id) {
			(Some(permission), Some(id)) => Some((permission, id)),
			_ => None,
		}
	}
}
