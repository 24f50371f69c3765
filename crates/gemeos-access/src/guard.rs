// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route guard.
//!
//! Decides whether a principal may render a route before anything mounts. Rules
//! are tried in declaration order and the first match wins. A path no rule
//! covers is denied.

use std::sync::Arc;

use futures::future::try_join_all;
use gemeos_access_config::RoutingConfig;
use gemeos_access_core::{AuthorizationDecision, DecisionReason, Principal, RouteAccessRule};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::evaluator::PermissionEvaluator;
use crate::request::AccessRequest;

/// Outcome of a route check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
	pub path: String,
	/// Index of the rule that matched, if any.
	pub rule_index: Option<usize>,
	pub decision: AuthorizationDecision,
	/// Where to send the user when denied.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect_to: Option<String>,
}

impl RouteDecision {
	pub fn is_allowed(&self) -> bool {
		self.decision.allowed
	}
}

pub struct RouteGuard {
	evaluator: Arc<PermissionEvaluator>,
	login_path: String,
	unauthorized_path: String,
}

impl RouteGuard {
	pub fn new(evaluator: Arc<PermissionEvaluator>, routing: &RoutingConfig) -> Self {
		Self {
			evaluator,
			login_path: routing.login_path.clone(),
			unauthorized_path: routing.unauthorized_path.clone(),
		}
	}

	pub fn login_path(&self) -> &str {
		&self.login_path
	}

	pub fn unauthorized_path(&self) -> &str {
		&self.unauthorized_path
	}

	/// Checks `path` for `principal`. `None` means nobody is signed in.
	#[instrument(level = "debug", skip(self, principal), fields(authenticated = principal.is_some()))]
	pub async fn check(&self, principal: Option<&Principal>, path: &str) -> Result<RouteDecision> {
		let Some((index, rule)) = self.evaluator.registry().find_route(path) else {
			debug!("no route rule matched, denying");
			return Ok(self.denied(
				path,
				None,
				DecisionReason::NoMatchingRoute {
					path: path.to_string(),
				},
				&self.unauthorized_path,
			));
		};

		if rule.public {
			return Ok(RouteDecision {
				path: path.to_string(),
				rule_index: Some(index),
				decision: AuthorizationDecision::allow(),
				redirect_to: None,
			});
		}

		let Some(principal) = principal else {
			return Ok(self.denied(
				path,
				Some(index),
				DecisionReason::Unauthenticated,
				&self.login_path,
			));
		};

		let decision = self
			.evaluator
			.evaluate(principal, &rule_request(rule))
			.await?;
		debug!(rule = index, allowed = decision.allowed, "route evaluated");

		let redirect_to = (!decision.allowed).then(|| self.unauthorized_path.clone());
		Ok(RouteDecision {
			path: path.to_string(),
			rule_index: Some(index),
			decision,
			redirect_to,
		})
	}

	/// Rules the principal would pass, in declaration order. Public rules are
	/// included.
	pub async fn accessible_routes(&self, principal: &Principal) -> Result<Vec<&RouteAccessRule>> {
		let rules = self.evaluator.registry().routes();
		let decisions = try_join_all(rules.iter().map(|rule| async move {
			if rule.public {
				Ok(true)
			} else {
				self
					.evaluator
					.evaluate(principal, &rule_request(rule))
					.await
					.map(|decision| decision.allowed)
			}
		}))
		.await?;

		Ok(rules
			.iter()
			.zip(decisions)
			.filter_map(|(rule, allowed)| allowed.then_some(rule))
			.collect())
	}

	fn denied(
		&self,
		path: &str,
		rule_index: Option<usize>,
		reason: DecisionReason,
		redirect_to: &str,
	) -> RouteDecision {
		RouteDecision {
			path: path.to_string(),
			rule_index,
			decision: AuthorizationDecision::deny(reason),
			redirect_to: Some(redirect_to.to_string()),
		}
	}
}

/// Any one of the rule's roles, all of its permissions.
fn rule_request(rule: &RouteAccessRule) -> AccessRequest {
	AccessRequest::new()
		.any_role(rule.roles.iter().cloned())
		.all_of(rule.permissions.iter().cloned())
}
