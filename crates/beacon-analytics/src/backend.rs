// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The contract a vendor adapter implements.

use beacon_analytics_core::{Event, Properties, SessionId, SystemInfo};

use crate::config::{ApiKey, BackendConfig};
use crate::error::ConfigError;

/// A remote analytics vendor.
///
/// Adapters are thin serializers: they name the endpoint, seed default
/// properties, mint session ids and turn a batch of events into the
/// vendor's JSON body. Queueing, flushing and failure handling live in
/// [`BackendClient`](crate::BackendClient).
pub trait Backend: Send + Sync + 'static {
	/// Unique name, used as the dispatcher key and in logs.
	fn name(&self) -> &str;

	/// Path of the batch endpoint relative to the base URL.
	fn endpoint_path(&self) -> &str;

	/// Default properties for a fresh client.
	fn base_properties(&self, system: &SystemInfo) -> Properties {
		Properties::from_system_info(system)
	}

	/// A new session id, assigned by `initialize`.
	fn new_session_id(&self) -> SessionId;

	/// Encodes a non-empty batch. The API key travels inside the body.
	fn encode_batch(&self, api_key: &ApiKey, events: &[Event]) -> Result<Vec<u8>, serde_json::Error>;

	/// Vendor-specific configuration checks, on top of
	/// [`BackendConfig::validate`].
	fn validate_config(&self, _config: &BackendConfig) -> Result<(), ConfigError> {
		Ok(())
	}
}
