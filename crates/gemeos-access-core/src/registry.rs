// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The policy registry.
//!
//! [`PolicyRegistry`] is the validated, immutable form of a [`PolicyDocument`]. It is
//! built once at startup and shared read-only (typically behind an `Arc`). Every
//! reference between roles, resources, matrix entries and route rules is checked
//! when the registry is built, so a lookup against a registry is a total function:
//! unknown names produce `false` or an empty result, never an error.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::{
	PolicyDocument, ResourceDefinition, RoleDefinition, SpecialAccessRules, POLICY_DOCUMENT_VERSION,
};
use crate::error::{PolicyError, Result};
use crate::route::{self, RouteAccessRule};
use crate::security::SecurityPolicies;
use crate::types::{PLATFORM_ADMIN, WILDCARD};

const BUILTIN_POLICY: &str = include_str!("../policy/default.toml");

/// One resource and the actions a role holds on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissions {
	pub resource: String,
	pub actions: Vec<String>,
}

/// Validated, indexed policy.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
	roles: Vec<RoleDefinition>,
	role_index: HashMap<String, usize>,
	resources: Vec<ResourceDefinition>,
	resource_index: HashMap<String, usize>,
	matrix: HashMap<String, Vec<RolePermissions>>,
	inherited: HashMap<String, Vec<String>>,
	routes: Vec<RouteAccessRule>,
	security: SecurityPolicies,
	special: SpecialAccessRules,
}

impl PolicyRegistry {
	/// The policy shipped with the crate.
	pub fn builtin() -> Result<Self> {
		Self::from_toml_str(BUILTIN_POLICY)
	}

	pub fn from_toml_str(source: &str) -> Result<Self> {
		let document: PolicyDocument = toml::from_str(source)?;
		Self::from_document(document)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&source)
	}

	/// Validates a document and builds the registry.
	pub fn from_document(document: PolicyDocument) -> Result<Self> {
		if document.version != POLICY_DOCUMENT_VERSION {
			return Err(PolicyError::UnsupportedVersion(document.version));
		}

		let role_index = index_roles(&document.roles)?;
		let resource_index = index_resources(&document.resources)?;

		let inherited = resolve_inheritance(&document.roles, &role_index)?;

		let mut matrix = HashMap::new();
		for (role, entries) in &document.matrix {
			if !role_index.contains_key(role) {
				return Err(PolicyError::UnknownRole {
					context: "permission matrix".to_string(),
					role: role.clone(),
				});
			}
			let mut permissions = Vec::with_capacity(entries.len());
			for (resource, actions) in entries {
				if resource != WILDCARD {
					let definition = lookup_resource(
						&document.resources,
						&resource_index,
						resource,
						&format!("permission matrix entry for '{role}'"),
					)?;
					for action in actions {
						if action != WILDCARD && !definition.has_action(action) {
							return Err(PolicyError::UnknownAction {
								context: format!("permission matrix entry for '{role}'"),
								resource: resource.clone(),
								action: action.clone(),
							});
						}
					}
				}
				permissions.push(RolePermissions {
					resource: resource.clone(),
					actions: actions.clone(),
				});
			}
			matrix.insert(role.clone(), permissions);
		}

		let mut routes = Vec::with_capacity(document.routes.len());
		for (index, rule) in document.routes.iter().enumerate() {
			let compiled = RouteAccessRule::compile(index, rule)?;
			let context = format!("route rule #{index} ({})", compiled.matcher);
			for role in &compiled.roles {
				if !role_index.contains_key(role) {
					return Err(PolicyError::UnknownRole {
						context: context.clone(),
						role: role.clone(),
					});
				}
			}
			for permission in &compiled.permissions {
				let definition = lookup_resource(
					&document.resources,
					&resource_index,
					&permission.resource,
					&context,
				)?;
				if !definition.has_action(&permission.action) {
					return Err(PolicyError::UnknownAction {
						context: context.clone(),
						resource: permission.resource.clone(),
						action: permission.action.clone(),
					});
				}
			}
			routes.push(compiled);
		}

		let security = SecurityPolicies::from_document(&document.security)?;

		info!(
			roles = document.roles.len(),
			resources = document.resources.len(),
			matrix_roles = matrix.len(),
			routes = routes.len(),
			sensitive_operations = document.security.sensitive_operations.len(),
			hierarchical_inheritance = document.special.hierarchical_inheritance,
			own_profile_access = document.special.own_profile_access,
			"Access policy loaded"
		);

		Ok(Self {
			roles: document.roles,
			role_index,
			resources: document.resources,
			resource_index,
			matrix,
			inherited,
			routes,
			security,
			special: document.special,
		})
	}

	// -------------------------------------------------------------------------
	// Permission matrix
	// -------------------------------------------------------------------------

	/// Direct matrix lookup.
	///
	/// Always true for `platform_admin`. Otherwise the wildcard resource entry is
	/// consulted before the specific resource entry; either grants when it contains
	/// `*` or the exact action. A role absent from the matrix holds nothing.
	pub fn role_has_permission(&self, role: &str, resource: &str, action: &str) -> bool {
		if role == PLATFORM_ADMIN {
			return true;
		}

		let Some(entries) = self.matrix.get(role) else {
			return false;
		};

		let grants = |entry: &RolePermissions| {
			entry
				.actions
				.iter()
				.any(|a| a == WILDCARD || a == action)
		};

		if entries
			.iter()
			.filter(|e| e.resource == WILDCARD)
			.any(grants)
		{
			return true;
		}

		entries
			.iter()
			.filter(|e| e.resource == resource)
			.any(grants)
	}

	/// Matrix lookup including hierarchical inheritance, when enabled.
	pub fn role_grants(&self, role: &str, resource: &str, action: &str) -> bool {
		if self.role_has_permission(role, resource, action) {
			return true;
		}
		if !self.special.hierarchical_inheritance {
			return false;
		}
		self
			.inherited_roles(role)
			.iter()
			.any(|parent| self.role_has_permission(parent, resource, action))
	}

	/// The grants held by a role.
	///
	/// `platform_admin` gets every declared resource with its full action list.
	/// Other roles get their matrix entries as written; unknown roles get nothing.
	pub fn get_role_permissions(&self, role: &str) -> Vec<RolePermissions> {
		if role == PLATFORM_ADMIN {
			return self
				.resources
				.iter()
				.map(|r| RolePermissions {
					resource: r.name.clone(),
					actions: r.actions.clone(),
				})
				.collect();
		}
		self.matrix.get(role).cloned().unwrap_or_default()
	}

	// -------------------------------------------------------------------------
	// Roles and resources
	// -------------------------------------------------------------------------

	pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
		self.role_index.get(name).map(|&i| &self.roles[i])
	}

	pub fn roles(&self) -> &[RoleDefinition] {
		&self.roles
	}

	pub fn has_role(&self, name: &str) -> bool {
		self.role_index.contains_key(name)
	}

	pub fn resource(&self, name: &str) -> Option<&ResourceDefinition> {
		self.resource_index.get(name).map(|&i| &self.resources[i])
	}

	pub fn resources(&self) -> &[ResourceDefinition] {
		&self.resources
	}

	/// Returns true if the resource is declared and supports the action.
	pub fn is_known_action(&self, resource: &str, action: &str) -> bool {
		self
			.resource(resource)
			.map(|r| r.has_action(action))
			.unwrap_or(false)
	}

	/// Transitive `inherits_from` closure of a role, nearest first, excluding the
	/// role itself.
	pub fn inherited_roles(&self, role: &str) -> &[String] {
		self.inherited.get(role).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Returns true if `actor` may manage users holding `target`.
	///
	/// Platform admins manage everyone; other roles manage strictly less privileged
	/// roles. Unknown roles manage nothing and cannot be managed.
	pub fn can_manage_role(&self, actor: &str, target: &str) -> bool {
		let Some(target) = self.role(target) else {
			return false;
		};
		if actor == PLATFORM_ADMIN {
			return true;
		}
		match self.role(actor) {
			Some(actor) => actor.hierarchy_level < target.hierarchy_level,
			None => false,
		}
	}

	// -------------------------------------------------------------------------
	// Routes, security, special rules
	// -------------------------------------------------------------------------

	/// Route rules in precedence order.
	pub fn routes(&self) -> &[RouteAccessRule] {
		&self.routes
	}

	/// First rule matching `path`, with its index.
	pub fn find_route(&self, path: &str) -> Option<(usize, &RouteAccessRule)> {
		route::find_route(&self.routes, path)
	}

	pub fn security(&self) -> &SecurityPolicies {
		&self.security
	}

	pub fn is_sensitive_operation(&self, resource: &str, action: &str) -> bool {
		self.security.is_sensitive_operation(resource, action)
	}

	pub fn special(&self) -> SpecialAccessRules {
		self.special
	}
}

fn index_roles(roles: &[RoleDefinition]) -> Result<HashMap<String, usize>> {
	let mut index = HashMap::with_capacity(roles.len());
	for (i, role) in roles.iter().enumerate() {
		if index.insert(role.name.clone(), i).is_some() {
			return Err(PolicyError::DuplicateRole(role.name.clone()));
		}
	}
	Ok(index)
}

fn index_resources(resources: &[ResourceDefinition]) -> Result<HashMap<String, usize>> {
	let mut index = HashMap::with_capacity(resources.len());
	for (i, resource) in resources.iter().enumerate() {
		if resource.actions.is_empty() {
			return Err(PolicyError::EmptyActions(resource.name.clone()));
		}
		let mut seen = HashSet::new();
		for action in &resource.actions {
			if !seen.insert(action.as_str()) {
				return Err(PolicyError::DuplicateAction {
					resource: resource.name.clone(),
					action: action.clone(),
				});
			}
		}
		if index.insert(resource.name.clone(), i).is_some() {
			return Err(PolicyError::DuplicateResource(resource.name.clone()));
		}
	}
	Ok(index)
}

fn lookup_resource<'a>(
	resources: &'a [ResourceDefinition],
	index: &HashMap<String, usize>,
	name: &str,
	context: &str,
) -> Result<&'a ResourceDefinition> {
	index
		.get(name)
		.map(|&i| &resources[i])
		.ok_or_else(|| PolicyError::UnknownResource {
			context: context.to_string(),
			resource: name.to_string(),
		})
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
	InProgress,
	Done,
}

/// Checks parent references, rejects cycles and level inversions, and computes
/// each role's inheritance closure.
fn resolve_inheritance(
	roles: &[RoleDefinition],
	index: &HashMap<String, usize>,
) -> Result<HashMap<String, Vec<String>>> {
	for role in roles {
		for parent in &role.inherits_from {
			if !index.contains_key(parent) {
				return Err(PolicyError::UnknownRole {
					context: format!("role '{}' inherits_from", role.name),
					role: parent.clone(),
				});
			}
		}
	}

	let mut state: HashMap<&str, Visit> = HashMap::new();
	for role in roles {
		detect_cycle(roles, index, &role.name, &mut state)?;
	}

	for role in roles {
		for parent in &role.inherits_from {
			let parent_def = &roles[index[parent.as_str()]];
			if parent_def.hierarchy_level <= role.hierarchy_level {
				return Err(PolicyError::InheritanceLevel {
					role: role.name.clone(),
					parent: parent.clone(),
				});
			}
		}
	}

	let mut closures = HashMap::with_capacity(roles.len());
	for role in roles {
		let mut seen: HashSet<&str> = HashSet::new();
		let mut order = Vec::new();
		let mut queue: VecDeque<&str> = role.inherits_from.iter().map(String::as_str).collect();
		while let Some(name) = queue.pop_front() {
			if !seen.insert(name) {
				continue;
			}
			order.push(name.to_string());
			queue.extend(roles[index[name]].inherits_from.iter().map(String::as_str));
		}
		closures.insert(role.name.clone(), order);
	}
	Ok(closures)
}

fn detect_cycle<'a>(
	roles: &'a [RoleDefinition],
	index: &HashMap<String, usize>,
	name: &'a str,
	state: &mut HashMap<&'a str, Visit>,
) -> Result<()> {
	match state.get(name) {
		Some(Visit::Done) => return Ok(()),
		Some(Visit::InProgress) => return Err(PolicyError::InheritanceCycle(name.to_string())),
		None => {}
	}
	state.insert(name, Visit::InProgress);
	for parent in &roles[index[name]].inherits_from {
		detect_cycle(roles, index, parent, state)?;
	}
	state.insert(name, Visit::Done);
	Ok(())
}
