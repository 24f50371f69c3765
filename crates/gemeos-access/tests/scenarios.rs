// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end access scenarios against the built-in policy, plus the gate's
//! loading, cancellation and side-effect behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use gemeos_access::{
	AccessRequest, DecisionReason, GateOptions, GateState, InstanceId, InstanceLookup,
	InstanceRecord, LookupError, NoInstances, PermissionEvaluator, PermissionGate, Principal,
	RouteGuard, StaticInstances, TenantId, UserId, PLATFORM_ADMIN,
};
use gemeos_access_config::RoutingConfig;
use gemeos_access_core::{compile_route_pattern, matches_route_rule, PolicyRegistry, RouteMatcher};
use tokio::sync::Notify;

// =============================================================================
// Fixtures
// =============================================================================

/// Holds every lookup until released.
struct GatedLookup {
	release: Arc<Notify>,
	record: InstanceRecord,
	calls: AtomicUsize,
}

impl GatedLookup {
	fn new(record: InstanceRecord) -> Self {
		Self {
			release: Arc::new(Notify::new()),
			record,
			calls: AtomicUsize::new(0),
		}
	}
}

#[async_trait]
impl InstanceLookup for GatedLookup {
	async fn find_instance(
		&self,
		_resource: &str,
		_instance_id: &InstanceId,
	) -> Result<Option<InstanceRecord>, LookupError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.release.notified().await;
		Ok(Some(self.record))
	}
}

struct BrokenLookup;

#[async_trait]
impl InstanceLookup for BrokenLookup {
	async fn find_instance(
		&self,
		_resource: &str,
		_instance_id: &InstanceId,
	) -> Result<Option<InstanceRecord>, LookupError> {
		Err(LookupError::Backend("socket closed".into()))
	}
}

fn registry() -> Arc<PolicyRegistry> {
	Arc::new(PolicyRegistry::builtin().unwrap())
}

fn evaluator(lookup: Arc<dyn InstanceLookup>) -> Arc<PermissionEvaluator> {
	Arc::new(PermissionEvaluator::new(registry(), lookup))
}

fn guard() -> RouteGuard {
	RouteGuard::new(evaluator(Arc::new(NoInstances)), &RoutingConfig::default())
}

fn principal(role: &str, tenant: TenantId) -> Principal {
	Principal::new(UserId::generate())
		.with_tenant(tenant)
		.with_role(role)
}

async fn drain() {
	for _ in 0..8 {
		tokio::task::yield_now().await;
	}
}

// =============================================================================
// Matrix and route scenarios
// =============================================================================

#[tokio::test]
async fn teacher_creates_concept() {
	let decision = evaluator(Arc::new(NoInstances))
		.evaluate(
			&principal("teacher", TenantId::generate()),
			&AccessRequest::for_permission("concept", "create"),
		)
		.await
		.unwrap();
	assert!(decision.allowed);
}

#[tokio::test]
async fn student_cannot_delete_concept() {
	let decision = evaluator(Arc::new(NoInstances))
		.evaluate(
			&principal("student", TenantId::generate()),
			&AccessRequest::for_permission("concept", "delete"),
		)
		.await
		.unwrap();
	assert!(!decision.allowed);
}

#[tokio::test]
async fn platform_admin_reaches_unknown_resource() {
	let decision = evaluator(Arc::new(NoInstances))
		.evaluate(
			&principal(PLATFORM_ADMIN, TenantId::generate()),
			&AccessRequest::for_permission("nonexistent_resource", "anything"),
		)
		.await
		.unwrap();
	assert!(decision.allowed);
	assert_eq!(decision.reason, Some(DecisionReason::PlatformAdminBypass));
}

#[tokio::test]
async fn tenant_admin_opens_domain_concepts() {
	let admin = principal("tenant_admin", TenantId::generate());
	let decision = guard().check(Some(&admin), "/admin/domain/xyz/concepts").await.unwrap();
	assert!(decision.is_allowed());
}

#[tokio::test]
async fn teacher_cannot_open_domain_concepts() {
	let teacher = principal("teacher", TenantId::generate());
	let decision = guard().check(Some(&teacher), "/admin/domain/xyz/concepts").await.unwrap();
	assert!(!decision.is_allowed());
	assert_eq!(decision.redirect_to.as_deref(), Some("/unauthorized"));
}

#[test]
fn user_delete_needs_2fa_despite_grant() {
	let registry = Arc::new(
		PolicyRegistry::from_toml_str(
			r#"
version = 1

[[roles]]
name = "tenant_admin"
display_name = "Tenant Administrator"
hierarchy_level = 10

[[resources]]
name = "user"
actions = ["read", "delete"]

[matrix.tenant_admin]
user = ["read", "delete"]

[security]
sensitive_operations = ["user.delete"]
"#,
		)
		.unwrap(),
	);
	let admin = principal("tenant_admin", TenantId::generate());
	assert!(registry.role_has_permission("tenant_admin", "user", "delete"));

	let check = registry
		.security()
		.validate_security_requirements(&admin, "user", "delete");
	assert!(!check.valid);

	let evaluator = PermissionEvaluator::new(registry, Arc::new(NoInstances));
	let decision = evaluator.can(&admin, "user", "delete");
	assert!(decision.is_security_violation());
	assert!(evaluator.can(&admin.clone().with_2fa(true), "user", "delete").allowed);
}

#[test]
fn domain_pattern_is_anchored() {
	let matcher = RouteMatcher::from_regex(r"^/admin/domain/[^/]+$").unwrap();
	assert!(matches_route_rule("/admin/domain/abc123", &matcher));
	assert!(!matches_route_rule("/admin/domain/abc123/extra", &matcher));
	assert!(compile_route_pattern("/admin/domain/:id")
		.unwrap()
		.is_match("/admin/domain/abc123"));
}

// =============================================================================
// Route order
// =============================================================================

fn reports_policy(broad_first: bool) -> Arc<PolicyRegistry> {
	let broad = "[[routes]]\nregex = \"^/reports/.*\"\nroles = [\"manager\"]\n";
	let specific = "[[routes]]\npath = \"/reports/summary\"\nroles = [\"viewer\"]\n";
	let routes = if broad_first {
		format!("{broad}\n{specific}")
	} else {
		format!("{specific}\n{broad}")
	};
	let source = format!(
		r#"
version = 1

[[roles]]
name = "manager"
display_name = "Manager"
hierarchy_level = 10

[[roles]]
name = "viewer"
display_name = "Viewer"
hierarchy_level = 20

{routes}
"#
	);
	Arc::new(PolicyRegistry::from_toml_str(&source).unwrap())
}

#[tokio::test]
async fn route_order_decides_overlaps() {
	let viewer = Principal::new(UserId::generate()).with_role("viewer");

	let broad_first = RouteGuard::new(
		Arc::new(PermissionEvaluator::new(reports_policy(true), Arc::new(NoInstances))),
		&RoutingConfig::default(),
	);
	let specific_first = RouteGuard::new(
		Arc::new(PermissionEvaluator::new(reports_policy(false), Arc::new(NoInstances))),
		&RoutingConfig::default(),
	);

	let denied = broad_first.check(Some(&viewer), "/reports/summary").await.unwrap();
	assert!(!denied.is_allowed());
	assert_eq!(denied.rule_index, Some(0));

	let allowed = specific_first.check(Some(&viewer), "/reports/summary").await.unwrap();
	assert!(allowed.is_allowed());
	assert_eq!(allowed.rule_index, Some(0));
}

// =============================================================================
// Instances
// =============================================================================

#[tokio::test]
async fn instance_in_other_tenant_is_denied() {
	let lookup = StaticInstances::new().with("domain", "d1", InstanceRecord::new(TenantId::generate()));
	let admin = principal("tenant_admin", TenantId::generate());
	let evaluator = evaluator(Arc::new(lookup));

	assert!(evaluator.can(&admin, "domain", "update").allowed);
	let decision = evaluator
		.can_access_instance(&admin, "domain", "update", "d1")
		.await
		.unwrap();
	assert!(!decision.allowed);
	assert_eq!(decision.reason, Some(DecisionReason::TenantMismatch));
}

#[tokio::test]
async fn repeated_instance_checks_agree() {
	let tenant = TenantId::generate();
	let teacher = principal("teacher", tenant);
	let lookup = StaticInstances::new().with(
		"learning_goal",
		"g1",
		InstanceRecord::new(tenant).with_owner(teacher.user_id),
	);
	let evaluator = evaluator(Arc::new(lookup));
	let request = AccessRequest::for_permission("learning_goal", "update")
		.on_instance("g1")
		.require_ownership();

	let first = evaluator.evaluate(&teacher, &request).await.unwrap();
	let second = evaluator.evaluate(&teacher, &request).await.unwrap();
	assert!(first.allowed);
	assert_eq!(first, second);
}

// =============================================================================
// Gate lifecycle
// =============================================================================

#[tokio::test]
async fn gate_stays_loading_until_lookup_answers() {
	let tenant = TenantId::generate();
	let lookup = Arc::new(GatedLookup::new(InstanceRecord::new(TenantId::generate())));
	let options = GateOptions {
		show_error: true,
		..GateOptions::default()
	};
	let mut gate = PermissionGate::new(
		evaluator(lookup.clone()),
		AccessRequest::for_permission("domain", "read").on_instance("d1"),
		options,
	);

	gate.mount(principal("teacher", tenant));
	drain().await;
	assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
	assert_eq!(gate.state(), GateState::Loading);

	lookup.release.notify_one();
	assert_eq!(
		gate.settled().await,
		GateState::Denied {
			reason: "Resource belongs to a different tenant".to_string()
		}
	);
}

#[tokio::test]
async fn update_discards_in_flight_result() {
	let tenant = TenantId::generate();
	let lookup = Arc::new(GatedLookup::new(InstanceRecord::new(tenant)));
	let evaluator = evaluator(lookup.clone());
	let teacher = principal("teacher", tenant);

	let mut gate = PermissionGate::new(
		evaluator,
		AccessRequest::for_permission("domain", "read").on_instance("d1"),
		GateOptions::hide_or_fallback(false),
	);
	gate.mount(teacher.clone());
	drain().await;
	assert!(gate.state().is_loading());

	gate.update(teacher, AccessRequest::for_permission("tenant", "delete"));
	lookup.release.notify_one();
	assert_eq!(gate.settled().await, GateState::Hidden);

	drain().await;
	assert_eq!(gate.state(), GateState::Hidden);
	assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unmount_drops_late_result() {
	let tenant = TenantId::generate();
	let lookup = Arc::new(GatedLookup::new(InstanceRecord::new(tenant)));
	let mut gate = PermissionGate::new(
		evaluator(lookup.clone()),
		AccessRequest::for_permission("domain", "read").on_instance("d1"),
		GateOptions::default(),
	);
	gate.mount(principal("teacher", tenant));
	drain().await;

	gate.unmount();
	lookup.release.notify_one();
	drain().await;
	assert!(gate.state().is_loading());
}

#[tokio::test]
async fn side_effects_fire_once_per_evaluation() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let options = GateOptions::default().on_unauthorized(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	});
	let student = principal("student", TenantId::generate());
	let mut gate = PermissionGate::new(
		evaluator(Arc::new(NoInstances)),
		AccessRequest::for_permission("concept", "delete"),
		options,
	);

	gate.mount(student.clone());
	assert!(gate.settled().await.is_unauthorized());
	drain().await;
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	gate.update(student, AccessRequest::for_permission("concept", "update"));
	assert!(gate.settled().await.is_unauthorized());
	drain().await;
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn lookup_failure_shows_error_not_denial() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let options = GateOptions::hide_or_fallback(false).on_unauthorized(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	});
	let mut gate = PermissionGate::new(
		evaluator(Arc::new(BrokenLookup)),
		AccessRequest::for_permission("domain", "read").on_instance("d1"),
		options,
	);
	gate.mount(principal("teacher", TenantId::generate()));

	assert_eq!(
		gate.settled().await,
		GateState::Error {
			message: "Failed to check permissions".to_string()
		}
	);
	drain().await;
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}
