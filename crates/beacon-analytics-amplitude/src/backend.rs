// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use beacon_analytics::{ApiKey, Backend, BackendConfigLayer};
use beacon_analytics_core::{Event, SessionId};

use crate::wire::{event_json, HttpApiBody};

/// Amplitude US data center.
pub const DEFAULT_BASE_URL: &str = "https://api2.amplitude.com";

/// HTTP V2 batch endpoint.
pub const HTTP_API_PATH: &str = "/2/httpapi";

const DEFAULT_NAME: &str = "amplitude";

/// Backend for Amplitude's HTTP V2 API.
#[derive(Debug, Clone)]
pub struct AmplitudeBackend {
	name: String,
}

impl AmplitudeBackend {
	pub fn new() -> Self {
		Self {
			name: DEFAULT_NAME.to_string(),
		}
	}

	pub fn with_name(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}

	/// Vendor defaults for configuration loading.
	pub fn defaults_layer() -> BackendConfigLayer {
		BackendConfigLayer {
			base_url: Some(DEFAULT_BASE_URL.to_string()),
			..Default::default()
		}
	}
}

impl Default for AmplitudeBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl Backend for AmplitudeBackend {
	fn name(&self) -> &str {
		&self.name
	}

	fn endpoint_path(&self) -> &str {
		HTTP_API_PATH
	}

	/// A random non-negative 32-bit integer.
	fn new_session_id(&self) -> SessionId {
		SessionId::Number(i64::from(fastrand::i32(0..i32::MAX)))
	}

	fn encode_batch(&self, api_key: &ApiKey, events: &[Event]) -> Result<Vec<u8>, serde_json::Error> {
		let body = HttpApiBody {
			api_key: api_key.expose(),
			events: events.iter().map(event_json).collect(),
		};
		serde_json::to_vec(&body)
	}
}
