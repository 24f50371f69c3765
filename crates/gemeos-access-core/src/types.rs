// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifier types and well-known names shared across the access-control crates.
//!
//! - **ID newtypes**: [`UserId`] and [`TenantId`] wrap UUIDs so a user can never be
//!   passed where a tenant is expected
//! - **Instance ids**: [`InstanceId`] is an opaque string, since protected objects
//!   (domains, concepts, ...) are keyed by whatever the data layer uses
//! - **Reserved names**: [`PLATFORM_ADMIN`] and [`WILDCARD`]

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of the role that bypasses the permission matrix.
pub const PLATFORM_ADMIN: &str = "platform_admin";

/// Wildcard resource or action in the permission matrix.
pub const WILDCARD: &str = "*";

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(TenantId, "Unique identifier for a tenant (organization namespace).");

/// Identifier of a single protected object, as stored by the data layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for InstanceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for InstanceId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

impl From<String> for InstanceId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<UserId> for InstanceId {
	fn from(id: UserId) -> Self {
		Self(id.to_string())
	}
}

/// A `(resource, action)` pair, as used by route rules and multi-permission checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionRef {
	pub resource: String,
	pub action: String,
}

impl PermissionRef {
	pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
		Self {
			resource: resource.into(),
			action: action.into(),
		}
	}

	/// Key used by batch checks, `resource:action`.
	pub fn key(&self) -> String {
		format!("{}:{}", self.resource, self.action)
	}
}

impl fmt::Display for PermissionRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.resource, self.action)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn user_id_serializes_as_uuid() {
		let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
		let user_id = UserId::new(uuid);
		let json = serde_json::to_string(&user_id).unwrap();
		assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
	}

	#[test]
	fn instance_id_from_user_id_uses_uuid_text() {
		let user_id = UserId::generate();
		assert_eq!(InstanceId::from(user_id).as_str(), user_id.to_string());
	}

	#[test]
	fn permission_ref_key_and_display() {
		let permission = PermissionRef::new("concept", "read");
		assert_eq!(permission.key(), "concept:read");
		assert_eq!(permission.to_string(), "concept.read");
	}

	proptest! {
		#[test]
		fn tenant_id_display_matches_uuid(a: u128) {
			let uuid = Uuid::from_u128(a);
			prop_assert_eq!(TenantId::new(uuid).to_string(), uuid.to_string());
		}
	}
}
