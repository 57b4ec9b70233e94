// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP transport used by backend clients.

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{trace, warn};

use crate::error::TransportError;

/// Response from a backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
	pub status: u16,
	pub body: String,
}

impl TransportResponse {
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Posts an encoded batch to a path relative to the backend's base URL.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	async fn post(&self, path: &str, body: Vec<u8>) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: Client,
	base_url: String,
}

impl HttpTransport {
	pub fn new(client: Client, base_url: impl Into<String>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Self { client, base_url }
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn url(&self, path: &str) -> String {
		if path.starts_with('/') {
			format!("{}{}", self.base_url, path)
		} else {
			format!("{}/{}", self.base_url, path)
		}
	}
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
	async fn post(&self, path: &str, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
		let url = self.url(path);
		trace!(url = %url, bytes = body.len(), "posting batch");

		let response = self
			.client
			.post(&url)
			.header(CONTENT_TYPE, "application/json")
			.body(body)
			.send()
			.await
			.map_err(classify)?;

		// The server has answered; a broken body must not turn an accepted
		// batch into a send failure.
		let status = response.status().as_u16();
		let body = response.text().await.unwrap_or_else(|e| {
			warn!(status, error = %e, "failed to read response body");
			String::new()
		});

		Ok(TransportResponse { status, body })
	}
}

/// Connection, timeout and request failures are network errors; everything
/// else (decode errors, redirect loops) is unexpected.
fn classify(err: reqwest::Error) -> TransportError {
	if err.is_connect() || err.is_timeout() || err.is_request() {
		TransportError::Network(err.to_string())
	} else {
		TransportError::Unexpected(err.to_string())
	}
}
