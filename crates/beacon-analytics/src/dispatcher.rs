// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fan-out of one logical event to several backends.
//!
//! Each backend keeps its own queue, flush gate, timer and default
//! properties. The dispatcher validates a call once, then builds and
//! enqueues a backend-specific event for every registered backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beacon_analytics_core::{
	BatchResult, CaptureArgs, EventArgs, EventError, IdentifyArgs, Properties,
};
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::api::AnalyticsApi;
use crate::error::{AnalyticsError, Result};

/// One property bag per backend, keyed by backend name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchProperties {
	bags: BTreeMap<String, Properties>,
}

impl DispatchProperties {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, backend: &str) -> Option<&Properties> {
		self.bags.get(backend)
	}

	pub fn get_mut(&mut self, backend: &str) -> Option<&mut Properties> {
		self.bags.get_mut(backend)
	}

	pub fn insert(&mut self, backend: impl Into<String>, properties: Properties) {
		self.bags.insert(backend.into(), properties);
	}

	pub fn backends(&self) -> impl Iterator<Item = &str> {
		self.bags.keys().map(String::as_str)
	}

	/// Applies `f` to every bag.
	pub fn for_each_mut<F>(&mut self, mut f: F) -> &mut Self
	where
		F: FnMut(&str, &mut Properties),
	{
		for (name, bag) in &mut self.bags {
			f(name, bag);
		}
		self
	}

	pub fn set_user_id(&mut self, user_id: impl Into<String>) -> &mut Self {
		let user_id = user_id.into();
		self.for_each_mut(|_, bag| bag.user_id = Some(user_id.clone()))
	}

	pub fn set_device_id(&mut self, device_id: impl Into<String>) -> &mut Self {
		let device_id = device_id.into();
		self.for_each_mut(|_, bag| bag.device_id = Some(device_id.clone()))
	}

	pub fn set_ip_address(&mut self, ip: impl Into<String>) -> &mut Self {
		let ip = ip.into();
		self.for_each_mut(|_, bag| bag.ip_address = Some(ip.clone()))
	}

	/// Sets an extension key on every bag.
	pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		let key = key.into();
		let value = value.into();
		self.for_each_mut(|_, bag| {
			bag.set_item(key.clone(), value.clone());
		})
	}
}

/// Builder for [`AnalyticsDispatcher`].
#[derive(Default)]
pub struct AnalyticsDispatcherBuilder {
	backends: Vec<Arc<dyn AnalyticsApi>>,
}

impl AnalyticsDispatcherBuilder {
	pub fn backend(mut self, backend: Arc<dyn AnalyticsApi>) -> Self {
		self.backends.push(backend);
		self
	}

	/// Fails if two backends share a name.
	pub fn build(self) -> Result<AnalyticsDispatcher> {
		let mut backends = BTreeMap::new();
		for backend in self.backends {
			let name = backend.name().to_string();
			if backends.insert(name.clone(), backend).is_some() {
				return Err(AnalyticsError::DuplicateBackend(name));
			}
		}

		info!(
			backends = ?backends.keys().collect::<Vec<_>>(),
			"analytics dispatcher initialized"
		);

		Ok(AnalyticsDispatcher {
			backends,
			closed: AtomicBool::new(false),
		})
	}
}

/// Broadcasts analytics calls to every registered backend.
pub struct AnalyticsDispatcher {
	backends: BTreeMap<String, Arc<dyn AnalyticsApi>>,
	closed: AtomicBool,
}

impl AnalyticsDispatcher {
	pub fn builder() -> AnalyticsDispatcherBuilder {
		AnalyticsDispatcherBuilder::default()
	}

	pub fn backend(&self, name: &str) -> Option<&Arc<dyn AnalyticsApi>> {
		self.backends.get(name)
	}

	pub fn backend_names(&self) -> impl Iterator<Item = &str> {
		self.backends.keys().map(String::as_str)
	}

	/// Initializes every backend's default properties.
	pub fn initialize(&self) {
		for backend in self.backends.values() {
			backend.initialize();
		}
	}

	/// A fresh bag per backend, each seeded from that backend's defaults.
	pub fn create_properties(&self) -> DispatchProperties {
		let mut properties = DispatchProperties::new();
		for (name, backend) in &self.backends {
			properties.insert(name.clone(), backend.create_properties());
		}
		properties
	}

	/// Assigns each bag to its backend. Bags for unknown backends are
	/// skipped.
	pub fn set_default_properties(&self, properties: DispatchProperties) {
		for (name, bag) in properties.bags {
			match self.backends.get(&name) {
				Some(backend) => backend.set_default_properties(bag),
				None => warn!(backend = %name, "no such backend, default properties ignored"),
			}
		}
	}

	/// Captures one event on every backend.
	pub fn capture(
		&self,
		args: CaptureArgs<DispatchProperties>,
	) -> std::result::Result<(), EventError> {
		args.validate()?;
		let created_at = args.created_at.unwrap_or_else(Utc::now);

		for (name, backend) in &self.backends {
			let per_backend = CaptureArgs {
				event_name: args.event_name.clone(),
				distinct_id: args.distinct_id.clone(),
				properties: slice(args.properties.as_ref(), name, backend.as_ref()),
				created_at: Some(created_at),
			};
			backend.enqueue_with(EventArgs::Capture(per_backend))?;
		}

		debug!(event = %args.event_name, backends = self.backends.len(), "captured event");
		Ok(())
	}

	/// Identifies the user on every backend.
	pub fn identify(
		&self,
		args: IdentifyArgs<DispatchProperties>,
	) -> std::result::Result<(), EventError> {
		args.validate()?;
		let created_at = args.created_at.unwrap_or_else(Utc::now);

		for (name, backend) in &self.backends {
			let per_backend = IdentifyArgs {
				distinct_id: args.distinct_id.clone(),
				properties: slice(args.properties.as_ref(), name, backend.as_ref()),
				created_at: Some(created_at),
			};
			backend.enqueue_with(EventArgs::Identify(per_backend))?;
		}

		debug!(backends = self.backends.len(), "identified user");
		Ok(())
	}

	pub fn set_auto_flush(&self, enabled: bool) {
		for backend in self.backends.values() {
			backend.set_auto_flush(enabled);
		}
	}

	/// Flushes every backend concurrently.
	#[instrument(skip(self))]
	pub async fn flush(&self) -> BTreeMap<String, BatchResult> {
		let results = join_all(self.backends.values().map(|backend| backend.flush())).await;
		self.backends.keys().cloned().zip(results).collect()
	}

	/// Stops every timer first, then flushes and shuts down each backend.
	/// Later calls do nothing.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		self.set_auto_flush(false);
		for backend in self.backends.values() {
			backend.shutdown().await;
		}

		info!("analytics dispatcher shut down");
	}
}

/// The caller's bag for `name`, or that backend's fresh defaults.
fn slice(
	properties: Option<&DispatchProperties>,
	name: &str,
	backend: &dyn AnalyticsApi,
) -> Option<Properties> {
	Some(
		properties
			.and_then(|p| p.get(name))
			.cloned()
			.unwrap_or_else(|| backend.create_properties()),
	)
}
