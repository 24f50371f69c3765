// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Instance lookups for instance-level checks.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use gemeos_access_core::{InstanceId, TenantId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// What access control needs to know about one protected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
	pub tenant_id: TenantId,
	pub owner_id: Option<UserId>,
}

impl InstanceRecord {
	pub fn new(tenant_id: TenantId) -> Self {
		Self {
			tenant_id,
			owner_id: None,
		}
	}

	pub fn with_owner(mut self, owner_id: UserId) -> Self {
		self.owner_id = Some(owner_id);
		self
	}
}

/// Resolves `(resource, instance id)` to its tenant and owner.
///
/// `Ok(None)` means the instance does not exist and is treated as a denial.
/// `Err` means no answer could be obtained and surfaces as an evaluation error.
#[async_trait]
pub trait InstanceLookup: Send + Sync {
	async fn find_instance(
		&self,
		resource: &str,
		instance_id: &InstanceId,
	) -> Result<Option<InstanceRecord>, LookupError>;
}

/// A lookup that knows no instances. Every instance check is denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstances;

#[async_trait]
impl InstanceLookup for NoInstances {
	async fn find_instance(
		&self,
		_resource: &str,
		_instance_id: &InstanceId,
	) -> Result<Option<InstanceRecord>, LookupError> {
		Ok(None)
	}
}

/// In-memory lookup keyed by resource and instance id.
#[derive(Debug, Default)]
pub struct StaticInstances {
	records: RwLock<HashMap<(String, InstanceId), InstanceRecord>>,
}

impl StaticInstances {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder form of [`StaticInstances::insert`].
	pub fn with(self, resource: &str, instance_id: impl Into<InstanceId>, record: InstanceRecord) -> Self {
		self.insert(resource, instance_id, record);
		self
	}

	pub fn insert(&self, resource: &str, instance_id: impl Into<InstanceId>, record: InstanceRecord) {
		let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
		records.insert((resource.to_string(), instance_id.into()), record);
	}

	pub fn remove(&self, resource: &str, instance_id: &InstanceId) -> Option<InstanceRecord> {
		let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
		records.remove(&(resource.to_string(), instance_id.clone()))
	}
}

#[async_trait]
impl InstanceLookup for StaticInstances {
	async fn find_instance(
		&self,
		resource: &str,
		instance_id: &InstanceId,
	) -> Result<Option<InstanceRecord>, LookupError> {
		let records = self.records.read().unwrap_or_else(|e| e.into_inner());
		Ok(records
			.get(&(resource.to_string(), instance_id.clone()))
			.copied())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn no_instances_finds_nothing() {
		let found = NoInstances
			.find_instance("domain", &InstanceId::from("d1"))
			.await
			.unwrap();
		assert!(found.is_none());
	}

	#[tokio::test]
	async fn static_instances_round_trip() {
		let tenant = TenantId::generate();
		let owner = UserId::generate();
		let lookup = StaticInstances::new().with(
			"domain",
			"d1",
			InstanceRecord::new(tenant).with_owner(owner),
		);

		let found = lookup
			.find_instance("domain", &InstanceId::from("d1"))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.tenant_id, tenant);
		assert_eq!(found.owner_id, Some(owner));

		let other_resource = lookup
			.find_instance("concept", &InstanceId::from("d1"))
			.await
			.unwrap();
		assert!(other_resource.is_none());
	}

	#[tokio::test]
	async fn removed_instance_is_gone() {
		let lookup = StaticInstances::new().with("domain", "d1", InstanceRecord::new(TenantId::generate()));
		assert!(lookup.remove("domain", &InstanceId::from("d1")).is_some());
		assert!(lookup
			.find_instance("domain", &InstanceId::from("d1"))
			.await
			.unwrap()
			.is_none());
	}
}
