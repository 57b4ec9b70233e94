// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use beacon_analytics::{ApiKey, Backend, BackendConfig, BackendConfigLayer, ConfigError};
use beacon_analytics_core::{Event, SessionId};
use uuid::Uuid;

use crate::wire::{BatchItem, CaptureBody};

/// PostHog cloud.
pub const DEFAULT_BASE_URL: &str = "https://app.posthog.com";

/// Batch capture endpoint.
pub const CAPTURE_PATH: &str = "/capture/";

const DEFAULT_NAME: &str = "posthog";

/// Backend for PostHog's batch capture API.
#[derive(Debug, Clone)]
pub struct PosthogBackend {
	name: String,
}

impl PosthogBackend {
	pub fn new() -> Self {
		Self {
			name: DEFAULT_NAME.to_string(),
		}
	}

	/// Registers under a custom name, e.g. to send to two projects.
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

impl Default for PosthogBackend {
	fn default() -> Self {
		Self::new()
	}
}

impl Backend for PosthogBackend {
	fn name(&self) -> &str {
		&self.name
	}

	fn endpoint_path(&self) -> &str {
		CAPTURE_PATH
	}

	/// `{uuid}_{uuid}`.
	fn new_session_id(&self) -> SessionId {
		SessionId::Text(format!("{}_{}", Uuid::new_v4(), Uuid::new_v4()))
	}

	fn encode_batch(&self, api_key: &ApiKey, events: &[Event]) -> Result<Vec<u8>, serde_json::Error> {
		let body = CaptureBody {
			api_key: api_key.expose(),
			batch: events.iter().map(BatchItem::from_event).collect(),
		};
		serde_json::to_vec(&body)
	}

	/// PostHog keys are scoped to a project, so one must be configured.
	fn validate_config(&self, config: &BackendConfig) -> Result<(), ConfigError> {
		if config.project_id.is_none() {
			return Err(ConfigError::MissingField {
				key: format!("backends.{}.project_id", self.name),
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use beacon_analytics_core::Properties;
	use chrono::Utc;
	use serde_json::Value;

	#[test]
	fn session_id_is_two_uuids() {
		let SessionId::Text(id) = PosthogBackend::new().new_session_id() else {
			panic!("expected a text session id");
		};
		let parts: Vec<_> = id.split('_').collect();
		assert_eq!(parts.len(), 2);
		assert!(parts.iter().all(|p| Uuid::parse_str(p).is_ok()));
	}

	#[test]
	fn encodes_api_key_and_batch() {
		let events = vec![
			Event::capture("Opened", "user-1", Some(Properties::new()), Utc::now()).unwrap(),
			Event::alias("user-1", "anon-1", None, Utc::now()).unwrap(),
		];

		let body = PosthogBackend::new()
			.encode_batch(&ApiKey::new("phc_test"), &events)
			.unwrap();
		let json: Value = serde_json::from_slice(&body).unwrap();

		assert_eq!(json["api_key"], "phc_test");
		assert_eq!(json["batch"].as_array().unwrap().len(), 2);
		assert_eq!(json["batch"][0]["event"], "Opened");
		assert_eq!(json["batch"][1]["event"], "$create_alias");
		assert_eq!(json["batch"][1]["properties"]["alias"], "anon-1");
		assert_eq!(json["batch"][1]["properties"]["distinct_id"], "user-1");
	}

	#[test]
	fn project_id_is_required() {
		let config = BackendConfig::new(DEFAULT_BASE_URL, "phc_test");
		assert!(matches!(
			PosthogBackend::new().validate_config(&config),
			Err(ConfigError::MissingField { key }) if key == "backends.posthog.project_id"
		));
		assert!(PosthogBackend::new()
			.validate_config(&config.with_project_id(1))
			.is_ok());
	}

	#[test]
	fn custom_name_is_used_in_errors() {
		let backend = PosthogBackend::with_name("posthog-eu");
		let config = BackendConfig::new("https://eu.posthog.com", "phc_test");

		assert_eq!(backend.name(), "posthog-eu");
		assert!(matches!(
			backend.validate_config(&config),
			Err(ConfigError::MissingField { key }) if key == "backends.posthog-eu.project_id"
		));
	}
}
