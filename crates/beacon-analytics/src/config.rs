// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-backend configuration.
//!
//! Configuration is assembled from [`BackendConfigLayer`]s (all fields
//! optional) that are merged in precedence order and then finalized into a
//! validated [`BackendConfig`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// A backend API key. Never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	/// The raw key, for embedding in request bodies.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ApiKey([REDACTED])")
	}
}

impl fmt::Display for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

/// How a non-2xx response is accounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
	/// Log the rejection and count the batch as delivered.
	#[default]
	CountAsDelivered,
	/// Handle the rejection exactly like a transport failure.
	TreatAsFailure,
}

/// What happens to a batch whose send failed at the transport level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedBatchPolicy {
	/// The batch is lost.
	#[default]
	Drop,
	/// The batch goes back to the front of the queue, unless the queue was
	/// load-shed.
	Requeue,
}

/// Validated configuration for one backend client.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
	pub base_url: String,
	pub api_key: ApiKey,
	pub project_id: Option<u64>,
	pub timeout: Duration,
	pub user_agent: String,
	pub auto_flush_enabled: bool,
	pub flush_interval: Duration,
	/// Load-shedding threshold applied after a transport failure.
	pub max_queue_size: usize,
	/// Overrides the `ip_address` property of every event when set.
	pub client_ip: Option<String>,
	pub rejection_policy: RejectionPolicy,
	pub failed_batch_policy: FailedBatchPolicy,
}

impl BackendConfig {
	/// Configuration with defaults for everything except URL and key.
	pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			api_key: ApiKey::new(api_key),
			project_id: None,
			timeout: DEFAULT_TIMEOUT,
			user_agent: beacon_common_http::user_agent(),
			auto_flush_enabled: true,
			flush_interval: DEFAULT_FLUSH_INTERVAL,
			max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
			client_ip: None,
			rejection_policy: RejectionPolicy::default(),
			failed_batch_policy: FailedBatchPolicy::default(),
		}
	}

	pub fn with_project_id(mut self, project_id: u64) -> Self {
		self.project_id = Some(project_id);
		self
	}

	pub fn with_auto_flush(mut self, enabled: bool) -> Self {
		self.auto_flush_enabled = enabled;
		self
	}

	pub fn with_flush_interval(mut self, interval: Duration) -> Self {
		self.flush_interval = interval;
		self
	}

	pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
		self.max_queue_size = max_queue_size;
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
		self.client_ip = Some(ip.into());
		self
	}

	pub fn with_rejection_policy(mut self, policy: RejectionPolicy) -> Self {
		self.rejection_policy = policy;
		self
	}

	pub fn with_failed_batch_policy(mut self, policy: FailedBatchPolicy) -> Self {
		self.failed_batch_policy = policy;
		self
	}

	/// Checks the invariants a client relies on. `backend` only prefixes
	/// error keys.
	pub fn validate(&self, backend: &str) -> Result<(), ConfigError> {
		let key = |field: &str| format!("backends.{backend}.{field}");

		if self.api_key.expose().trim().is_empty() {
			return Err(ConfigError::MissingField { key: key("api_key") });
		}
		if self.project_id == Some(0) {
			return Err(ConfigError::InvalidValue {
				key: key("project_id"),
				message: "must be non-zero".to_string(),
			});
		}
		match Url::parse(&self.base_url) {
			Ok(url) if url.has_host() && matches!(url.scheme(), "http" | "https") => {}
			Ok(_) => {
				return Err(ConfigError::InvalidValue {
					key: key("base_url"),
					message: format!("'{}' is not an absolute http(s) URL", self.base_url),
				})
			}
			Err(e) => {
				return Err(ConfigError::InvalidValue {
					key: key("base_url"),
					message: e.to_string(),
				})
			}
		}
		if self.flush_interval.is_zero() {
			return Err(ConfigError::InvalidValue {
				key: key("flush_interval_secs"),
				message: "must be non-zero".to_string(),
			});
		}
		if self.max_queue_size == 0 {
			return Err(ConfigError::InvalidValue {
				key: key("max_queue_size"),
				message: "must be non-zero".to_string(),
			});
		}
		Ok(())
	}
}

/// One source's view of a backend's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfigLayer {
	pub base_url: Option<String>,
	pub api_key: Option<String>,
	pub project_id: Option<u64>,
	pub timeout_secs: Option<u64>,
	pub user_agent: Option<String>,
	pub auto_flush: Option<bool>,
	pub flush_interval_secs: Option<u64>,
	pub max_queue_size: Option<usize>,
	pub client_ip: Option<String>,
	pub rejection_policy: Option<RejectionPolicy>,
	pub failed_batch_policy: Option<FailedBatchPolicy>,
}

impl BackendConfigLayer {
	/// Overlays `other`; its `Some` values win.
	pub fn merge(&mut self, other: Self) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.project_id.is_some() {
			self.project_id = other.project_id;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
		if other.user_agent.is_some() {
			self.user_agent = other.user_agent;
		}
		if other.auto_flush.is_some() {
			self.auto_flush = other.auto_flush;
		}
		if other.flush_interval_secs.is_some() {
			self.flush_interval_secs = other.flush_interval_secs;
		}
		if other.max_queue_size.is_some() {
			self.max_queue_size = other.max_queue_size;
		}
		if other.client_ip.is_some() {
			self.client_ip = other.client_ip;
		}
		if other.rejection_policy.is_some() {
			self.rejection_policy = other.rejection_policy;
		}
		if other.failed_batch_policy.is_some() {
			self.failed_batch_policy = other.failed_batch_policy;
		}
	}

	/// Fills defaults and validates.
	pub fn finalize(self, backend: &str) -> Result<BackendConfig, ConfigError> {
		let missing = |field: &str| ConfigError::MissingField {
			key: format!("backends.{backend}.{field}"),
		};

		let base_url = self.base_url.ok_or_else(|| missing("base_url"))?;
		let api_key = self.api_key.ok_or_else(|| missing("api_key"))?;

		let config = BackendConfig {
			base_url,
			api_key: ApiKey::new(api_key),
			project_id: self.project_id,
			timeout: self
				.timeout_secs
				.map(Duration::from_secs)
				.unwrap_or(DEFAULT_TIMEOUT),
			user_agent: self
				.user_agent
				.unwrap_or_else(beacon_common_http::user_agent),
			auto_flush_enabled: self.auto_flush.unwrap_or(true),
			flush_interval: self
				.flush_interval_secs
				.map(Duration::from_secs)
				.unwrap_or(DEFAULT_FLUSH_INTERVAL),
			max_queue_size: self.max_queue_size.unwrap_or(DEFAULT_MAX_QUEUE_SIZE),
			client_ip: self.client_ip.filter(|ip| !ip.trim().is_empty()),
			rejection_policy: self.rejection_policy.unwrap_or_default(),
			failed_batch_policy: self.failed_batch_policy.unwrap_or_default(),
		};

		config.validate(backend)?;
		Ok(config)
	}
}
