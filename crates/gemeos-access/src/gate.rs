// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! UI permission gate.
//!
//! A [`PermissionGate`] runs one evaluation at a time on the tokio runtime and
//! publishes its [`GateState`] through a `watch` channel. It starts in
//! `Loading` and stays there until the evaluation resolves, so a renderer
//! never sees a denial before an instance lookup has answered.
//!
//! Every evaluation gets a generation number. `update` and `unmount` abort the
//! running task and bump the generation, so a result that arrives late is
//! dropped instead of published. Side effects fire once, after the state is
//! published and before the generation lock is released, and only for denials
//! of the current generation.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use gemeos_access_core::{AuthorizationDecision, Principal, PLATFORM_ADMIN};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::evaluator::PermissionEvaluator;
use crate::request::AccessRequest;

const DEFAULT_ERROR_MESSAGE: &str = "Failed to check permissions";
const DEFAULT_DENIED_MESSAGE: &str = "You do not have permission to view this content";

/// What a gate should render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
	Loading,
	Authorized,
	/// Render nothing.
	Hidden,
	/// Render the caller's fallback.
	Fallback,
	/// Render a denial notice.
	Denied { reason: String },
	/// The evaluation failed; the caller may retry.
	Error { message: String },
}

impl GateState {
	pub fn is_loading(&self) -> bool {
		matches!(self, GateState::Loading)
	}

	pub fn is_authorized(&self) -> bool {
		matches!(self, GateState::Authorized)
	}

	/// True for every terminal state except `Authorized` and `Error`.
	pub fn is_unauthorized(&self) -> bool {
		matches!(
			self,
			GateState::Hidden | GateState::Fallback | GateState::Denied { .. }
		)
	}
}

/// Client-side navigation, used for `redirect_to`.
pub trait Navigator: Send + Sync {
	fn navigate(&self, to: &str);
}

pub type UnauthorizedCallback = Arc<dyn Fn(&AuthorizationDecision) + Send + Sync>;

/// Presentation options for a gate.
#[derive(Clone, Default)]
pub struct GateOptions {
	pub hide_when_unauthorized: bool,
	/// The caller has a fallback to render. Takes precedence over hiding.
	pub fallback: bool,
	/// Show a denial notice instead of rendering nothing.
	pub show_error: bool,
	/// Overrides the default denial and error text.
	pub error_message: Option<String>,
	pub redirect_to: Option<String>,
	pub on_unauthorized: Option<UnauthorizedCallback>,
}

impl fmt::Debug for GateOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GateOptions")
			.field("hide_when_unauthorized", &self.hide_when_unauthorized)
			.field("fallback", &self.fallback)
			.field("show_error", &self.show_error)
			.field("error_message", &self.error_message)
			.field("redirect_to", &self.redirect_to)
			.field("on_unauthorized", &self.on_unauthorized.is_some())
			.finish()
	}
}

impl GateOptions {
	/// Hide when denied, or render the fallback if there is one.
	pub fn hide_or_fallback(fallback: bool) -> Self {
		Self {
			hide_when_unauthorized: !fallback,
			fallback,
			..Self::default()
		}
	}

	pub fn with_redirect(mut self, to: impl Into<String>) -> Self {
		self.redirect_to = Some(to.into());
		self
	}

	pub fn on_unauthorized(mut self, callback: impl Fn(&AuthorizationDecision) + Send + Sync + 'static) -> Self {
		self.on_unauthorized = Some(Arc::new(callback));
		self
	}

	fn denied_state(&self, decision: &AuthorizationDecision) -> GateState {
		if self.fallback {
			GateState::Fallback
		} else if self.hide_when_unauthorized {
			GateState::Hidden
		} else if self.show_error {
			let reason = self
				.error_message
				.clone()
				.or_else(|| decision.message())
				.unwrap_or_else(|| DEFAULT_DENIED_MESSAGE.to_string());
			GateState::Denied { reason }
		} else {
			GateState::Hidden
		}
	}

	fn error_state(&self) -> GateState {
		GateState::Error {
			message: self
				.error_message
				.clone()
				.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
		}
	}
}

pub struct PermissionGate {
	evaluator: Arc<PermissionEvaluator>,
	request: AccessRequest,
	options: Arc<GateOptions>,
	navigator: Option<Arc<dyn Navigator>>,
	state: Arc<watch::Sender<GateState>>,
	generation: Arc<Mutex<u64>>,
	task: Option<JoinHandle<()>>,
}

impl PermissionGate {
	pub fn new(evaluator: Arc<PermissionEvaluator>, request: AccessRequest, options: GateOptions) -> Self {
		let (state, _) = watch::channel(GateState::Loading);
		Self {
			evaluator,
			request,
			options: Arc::new(options),
			navigator: None,
			state: Arc::new(state),
			generation: Arc::new(Mutex::new(0)),
			task: None,
		}
	}

	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = Some(navigator);
		self
	}

	/// Shows `resource.action` when granted. Hidden otherwise, unless there is a fallback.
	pub fn can_view(
		evaluator: Arc<PermissionEvaluator>,
		resource: &str,
		action: &str,
		fallback: bool,
	) -> Self {
		Self::new(
			evaluator,
			AccessRequest::for_permission(resource, action),
			GateOptions::hide_or_fallback(fallback),
		)
	}

	pub fn role_gate<I, S>(
		evaluator: Arc<PermissionEvaluator>,
		roles: I,
		require_all: bool,
		fallback: bool,
	) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let request = if require_all {
			AccessRequest::new().all_roles(roles)
		} else {
			AccessRequest::new().any_role(roles)
		};
		Self::new(evaluator, request, GateOptions::hide_or_fallback(fallback))
	}

	/// Platform administrators only.
	pub fn admin_only(evaluator: Arc<PermissionEvaluator>, fallback: bool) -> Self {
		Self::new(
			evaluator,
			AccessRequest::new().role(PLATFORM_ADMIN),
			GateOptions::hide_or_fallback(fallback),
		)
	}

	pub fn subscribe(&self) -> watch::Receiver<GateState> {
		self.state.subscribe()
	}

	pub fn state(&self) -> GateState {
		self.state.borrow().clone()
	}

	pub fn request(&self) -> &AccessRequest {
		&self.request
	}

	/// Starts evaluating for `principal`. Must be called within a tokio runtime.
	///
	/// Mounting an already mounted gate restarts the evaluation.
	pub fn mount(&mut self, principal: Principal) {
		let generation = self.advance();
		self.state.send_replace(GateState::Loading);

		let evaluator = self.evaluator.clone();
		let request = self.request.clone();
		let options = self.options.clone();
		let navigator = self.navigator.clone();
		let state = self.state.clone();
		let current = self.generation.clone();

		self.task = Some(tokio::spawn(async move {
			let result = evaluator.evaluate(&principal, &request).await;
			let next = match &result {
				Ok(decision) if decision.allowed => GateState::Authorized,
				Ok(decision) => options.denied_state(decision),
				Err(error) => {
					warn!(error = %error, "permission evaluation failed");
					options.error_state()
				}
			};

			// Held through the side effects so an update cannot slip in between.
			let guard = current.lock().unwrap_or_else(PoisonError::into_inner);
			if *guard != generation {
				debug!(generation, "discarding stale gate result");
				return;
			}
			state.send_replace(next);

			if let Ok(decision) = &result {
				if !decision.allowed {
					fire_side_effects(&options, navigator.as_deref(), decision);
				}
			}
			drop(guard);
		}));
	}

	/// Replaces the inputs and re-evaluates. Any in-flight result is discarded.
	pub fn update(&mut self, principal: Principal, request: AccessRequest) {
		self.request = request;
		self.mount(principal);
	}

	/// Cancels the in-flight evaluation. The last published state is kept.
	pub fn unmount(&mut self) {
		self.advance();
	}

	/// Waits until the gate leaves `Loading`.
	///
	/// Never returns for a gate that was not mounted.
	pub async fn settled(&self) -> GateState {
		let mut rx = self.state.subscribe();
		let settled = match rx.wait_for(|state| !state.is_loading()).await {
			Ok(state) => state.clone(),
			Err(_) => self.state(),
		};
		settled
	}

	/// Aborts the running task and returns the new generation.
	fn advance(&mut self) -> u64 {
		if let Some(task) = self.task.take() {
			task.abort();
		}
		let mut guard = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
		*guard += 1;
		*guard
	}
}

impl Drop for PermissionGate {
	fn drop(&mut self) {
		self.unmount();
	}
}

fn fire_side_effects(
	options: &GateOptions,
	navigator: Option<&dyn Navigator>,
	decision: &AuthorizationDecision,
) {
	if let Some(callback) = &options.on_unauthorized {
		callback(decision);
	}
	if let Some(to) = &options.redirect_to {
		match navigator {
			Some(navigator) => {
				debug!(to, "redirecting unauthorized user");
				navigator.navigate(to);
			}
			None => warn!(to, "redirect requested but gate has no navigator"),
		}
	}
}
