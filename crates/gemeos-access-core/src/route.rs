// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route rules and path matching.
//!
//! Rules are compiled once when the registry is built. Pattern rules such as
//! `/admin/domain/:id/concepts` become anchored regular expressions, so a dynamic
//! segment only ever matches one path segment and a pattern never matches a prefix
//! or an extension of the path it describes.

use std::fmt;

use regex::Regex;

use crate::document::RouteRuleDocument;
use crate::error::{PolicyError, Result};
use crate::types::PermissionRef;

/// How a rule selects paths.
#[derive(Debug, Clone)]
pub enum RouteMatcher {
	/// String equality.
	Exact(String),
	/// Anchored regular expression. `source` is the text it was authored as.
	Pattern { source: String, regex: Regex },
}

impl RouteMatcher {
	/// Compiles a `:param` pattern into an anchored matcher.
	pub fn from_pattern(pattern: &str) -> std::result::Result<Self, regex::Error> {
		Ok(Self::Pattern {
			source: pattern.to_string(),
			regex: compile_route_pattern(pattern)?,
		})
	}

	/// Wraps a raw regular expression, anchored at the start of the path.
	///
	/// The whole expression is grouped behind a single `^`, so a top-level
	/// alternation such as `^/a|/b` cannot match mid-path.
	pub fn from_regex(expr: &str) -> std::result::Result<Self, regex::Error> {
		// Compile as written first so an unbalanced group cannot escape the wrapper.
		Regex::new(expr)?;
		let body = expr.strip_prefix('^').unwrap_or(expr);
		Ok(Self::Pattern {
			source: expr.to_string(),
			regex: Regex::new(&format!("^(?:{body})"))?,
		})
	}

	pub fn is_match(&self, path: &str) -> bool {
		matches_route_rule(path, self)
	}
}

impl fmt::Display for RouteMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RouteMatcher::Exact(path) => f.write_str(path),
			RouteMatcher::Pattern { source, .. } => f.write_str(source),
		}
	}
}

/// Returns true if `path` is selected by `matcher`.
///
/// Exact rules use string equality; pattern rules test the compiled expression.
pub fn matches_route_rule(path: &str, matcher: &RouteMatcher) -> bool {
	match matcher {
		RouteMatcher::Exact(rule) => path == rule,
		RouteMatcher::Pattern { regex, .. } => regex.is_match(path),
	}
}

/// Converts `/a/:id/b` into `^/a/[^/]+/b$`, escaping all literal text.
pub fn compile_route_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
	let mut expr = String::with_capacity(pattern.len() + 16);
	expr.push('^');
	let mut segments = pattern.split('/').peekable();
	while let Some(segment) = segments.next() {
		match segment.strip_prefix(':') {
			Some(name) if is_param_name(name) => expr.push_str("[^/]+"),
			_ => expr.push_str(&regex::escape(segment)),
		}
		if segments.peek().is_some() {
			expr.push('/');
		}
	}
	expr.push('$');
	Regex::new(&expr)
}

fn is_param_name(name: &str) -> bool {
	!name.is_empty()
		&& name
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A compiled route rule.
///
/// A public rule admits everyone and carries no requirements. A non-public rule
/// requires any one of `roles` (when non-empty) and all of `permissions`.
#[derive(Debug, Clone)]
pub struct RouteAccessRule {
	pub matcher: RouteMatcher,
	pub public: bool,
	pub roles: Vec<String>,
	pub permissions: Vec<PermissionRef>,
}

impl RouteAccessRule {
	pub fn is_match(&self, path: &str) -> bool {
		self.matcher.is_match(path)
	}

	/// Compiles an authored rule. Role and permission names are checked by the
	/// registry, which knows the declared roles and resources.
	pub(crate) fn compile(index: usize, doc: &RouteRuleDocument) -> Result<Self> {
		let matcher = match (&doc.path, &doc.pattern, &doc.regex) {
			(Some(path), None, None) => {
				if !path.starts_with('/') {
					return Err(PolicyError::InvalidRoute {
						index,
						message: format!("path '{path}' must start with '/'"),
					});
				}
				RouteMatcher::Exact(path.clone())
			}
			(None, Some(pattern), None) => {
				RouteMatcher::from_pattern(pattern).map_err(|source| PolicyError::InvalidPattern {
					index,
					pattern: pattern.clone(),
					source,
				})?
			}
			(None, None, Some(expr)) => {
				if !expr.starts_with('^') {
					return Err(PolicyError::InvalidRoute {
						index,
						message: format!("regex '{expr}' must be anchored with '^'"),
					});
				}
				RouteMatcher::from_regex(expr).map_err(|source| PolicyError::InvalidPattern {
					index,
					pattern: expr.clone(),
					source,
				})?
			}
			_ => {
				return Err(PolicyError::InvalidRoute {
					index,
					message: "exactly one of 'path', 'pattern' or 'regex' must be set".to_string(),
				})
			}
		};

		if doc.public && (!doc.roles.is_empty() || !doc.permissions.is_empty()) {
			return Err(PolicyError::InvalidRoute {
				index,
				message: format!("public rule '{matcher}' must not carry roles or permissions"),
			});
		}

		Ok(Self {
			matcher,
			public: doc.public,
			roles: doc.roles.clone(),
			permissions: doc.permissions.clone(),
		})
	}
}

/// Returns the first rule matching `path`, with its index, in declaration order.
pub fn find_route<'a>(rules: &'a [RouteAccessRule], path: &str) -> Option<(usize, &'a RouteAccessRule)> {
	rules.iter().enumerate().find(|(_, rule)| rule.is_match(path))
}
