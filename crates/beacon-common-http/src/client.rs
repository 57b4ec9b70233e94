// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client construction with consistent User-Agent and JSON headers.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, ClientBuilder};
use tracing::debug;

/// Returns the standard Beacon User-Agent string.
///
/// Format: `beacon-analytics/{version}`
pub fn user_agent() -> String {
	format!("beacon-analytics/{}", env!("CARGO_PKG_VERSION"))
}

/// Creates a new HTTP client builder with a custom User-Agent header.
///
/// The builder already carries `Accept: application/json`, which every
/// analytics endpoint expects.
///
/// # Example
/// ```ignore
/// let client = beacon_common_http::builder_with_user_agent("my-app/1.0")
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// ```
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	let mut headers = HeaderMap::new();
	headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

	Client::builder()
		.user_agent(user_agent.into())
		.default_headers(headers)
}

/// Options for [`new_client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
	/// Value of the `User-Agent` header.
	pub user_agent: String,
	/// Whole-request timeout.
	pub timeout: Duration,
}

impl Default for ClientOptions {
	fn default() -> Self {
		Self {
			user_agent: user_agent(),
			timeout: Duration::from_secs(5),
		}
	}
}

/// Builds a client from [`ClientOptions`].
pub fn new_client(options: &ClientOptions) -> Result<Client, reqwest::Error> {
	debug!(
		user_agent = %options.user_agent,
		timeout_ms = options.timeout.as_millis() as u64,
		"building HTTP client"
	);
	builder_with_user_agent(options.user_agent.clone())
		.timeout(options.timeout)
		.build()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 2);
		assert_eq!(parts[0], "beacon-analytics");
		assert!(!parts[1].is_empty());
	}

	#[test]
	fn builder_with_custom_user_agent() {
		let client = builder_with_user_agent("my-custom-agent/1.0").build();
		assert!(client.is_ok());
	}

	#[test]
	fn default_options_use_standard_user_agent() {
		let options = ClientOptions::default();
		assert_eq!(options.user_agent, user_agent());
		assert_eq!(options.timeout, Duration::from_secs(5));
	}

	#[test]
	fn new_client_with_options() {
		let options = ClientOptions {
			user_agent: "ProductAnalytics-SDK".to_string(),
			timeout: Duration::from_millis(250),
		};
		assert!(new_client(&options).is_ok());
	}
}
