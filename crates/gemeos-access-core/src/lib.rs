// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core policy model for Gemeos access control.
//!
//! This crate is pure: it parses and validates the policy document and answers
//! lookups against it. Asynchronous evaluation, instance lookups and the UI gate
//! live in `gemeos-access`.
//!
//! # Example
//!
//! ```
//! use gemeos_access_core::PolicyRegistry;
//!
//! let registry = PolicyRegistry::builtin().unwrap();
//! assert!(registry.role_has_permission("teacher", "concept", "create"));
//! assert!(!registry.role_has_permission("student", "concept", "delete"));
//! ```

pub mod decision;
pub mod document;
pub mod error;
pub mod principal;
pub mod registry;
pub mod route;
pub mod security;
pub mod types;

pub use decision::{AuthorizationDecision, DecisionReason};
pub use document::{
	PolicyDocument, ResourceDefinition, RoleDefinition, RouteRuleDocument, SecurityDocument,
	SpecialAccessRules, POLICY_DOCUMENT_VERSION,
};
pub use error::{PolicyError, Result};
pub use principal::Principal;
pub use registry::{PolicyRegistry, RolePermissions};
pub use route::{compile_route_pattern, find_route, matches_route_rule, RouteAccessRule, RouteMatcher};
pub use security::{
	ExpiryReason, PolicyTier, SecurityCheck, SecurityPolicies, SecurityPolicy, SecurityViolation,
	SessionStatus, SessionTimeoutPolicy, REQUIRE_2FA, SESSION_TIMEOUT,
};
pub use types::{InstanceId, PermissionRef, TenantId, UserId, PLATFORM_ADMIN, WILDCARD};
