// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access control for Gemeos.
//!
//! Builds on the policy model in `gemeos-access-core`:
//!
//! - [`PermissionEvaluator`]: composite role, permission and instance checks
//! - [`RouteGuard`]: first-match route rules with login and unauthorized redirects
//! - [`PermissionGate`]: a watch-channel state machine for UI gating
//!
//! [`AccessControl`] wires all three from an [`AccessConfig`].

pub mod error;
pub mod evaluator;
pub mod gate;
pub mod guard;
pub mod lookup;
pub mod request;

use std::sync::Arc;

use gemeos_access_config::AccessConfig;
use gemeos_access_core::PolicyRegistry;
use tracing::info;

pub use error::{AccessError, EvaluationError, LookupError, Result};
pub use evaluator::{Interaction, PermissionEvaluator};
pub use gate::{GateOptions, GateState, Navigator, PermissionGate, UnauthorizedCallback};
pub use guard::{RouteDecision, RouteGuard};
pub use lookup::{InstanceLookup, InstanceRecord, NoInstances, StaticInstances};
pub use request::AccessRequest;

pub use gemeos_access_core::{
	AuthorizationDecision, DecisionReason, InstanceId, PermissionRef, Principal, TenantId, UserId,
	PLATFORM_ADMIN,
};

/// The registry, evaluator and route guard for one process.
pub struct AccessControl {
	registry: Arc<PolicyRegistry>,
	evaluator: Arc<PermissionEvaluator>,
	guard: RouteGuard,
}

impl AccessControl {
	/// Loads the configured policy file, or the built-in policy when none is set.
	pub fn from_config(
		config: &AccessConfig,
		lookup: Arc<dyn InstanceLookup>,
	) -> std::result::Result<Self, AccessError> {
		let registry = match &config.policy.file {
			Some(path) => PolicyRegistry::from_file(path)?,
			None => PolicyRegistry::builtin()?,
		};
		let access = Self::new(Arc::new(registry), lookup, config);
		info!(
			policy_file = ?config.policy.file,
			roles = access.registry.roles().len(),
			routes = access.registry.routes().len(),
			"Access control ready"
		);
		Ok(access)
	}

	pub fn new(registry: Arc<PolicyRegistry>, lookup: Arc<dyn InstanceLookup>, config: &AccessConfig) -> Self {
		let evaluator = Arc::new(
			PermissionEvaluator::new(registry.clone(), lookup)
				.with_lookup_timeout(config.evaluation.lookup_timeout),
		);
		let guard = RouteGuard::new(evaluator.clone(), &config.routing);
		Self {
			registry,
			evaluator,
			guard,
		}
	}

	pub fn registry(&self) -> &Arc<PolicyRegistry> {
		&self.registry
	}

	pub fn evaluator(&self) -> &Arc<PermissionEvaluator> {
		&self.evaluator
	}

	pub fn guard(&self) -> &RouteGuard {
		&self.guard
	}

	/// A new, unmounted gate sharing this evaluator.
	pub fn gate(&self, request: AccessRequest, options: GateOptions) -> PermissionGate {
		PermissionGate::new(self.evaluator.clone(), request, options)
	}
}
