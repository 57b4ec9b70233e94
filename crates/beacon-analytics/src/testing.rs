// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory transport and backend shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use beacon_analytics_core::{Event, SessionId};

use crate::backend::Backend;
use crate::config::ApiKey;
use crate::error::TransportError;
use crate::transport::{Transport, TransportResponse};

#[derive(Debug, Clone, Copy)]
pub enum Reply {
	Status(u16),
	Network,
	Unexpected,
}

/// Records every POST and answers with a scripted reply.
pub struct MockTransport {
	pub reply: Mutex<Reply>,
	calls: AtomicUsize,
	bodies: Mutex<Vec<serde_json::Value>>,
}

impl MockTransport {
	pub fn new(reply: Reply) -> Arc<Self> {
		Arc::new(Self {
			reply: Mutex::new(reply),
			calls: AtomicUsize::new(0),
			bodies: Mutex::new(Vec::new()),
		})
	}

	pub fn set_reply(&self, reply: Reply) {
		*self.reply.lock().unwrap() = reply;
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn bodies(&self) -> Vec<serde_json::Value> {
		self.bodies.lock().unwrap().clone()
	}
}

#[async_trait::async_trait]
impl Transport for MockTransport {
	async fn post(&self, _path: &str, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.bodies
			.lock()
			.unwrap()
			.push(serde_json::from_slice(&body).unwrap());

		match *self.reply.lock().unwrap() {
			Reply::Status(status) => Ok(TransportResponse {
				status,
				body: String::new(),
			}),
			Reply::Network => Err(TransportError::Network("connection refused".into())),
			Reply::Unexpected => Err(TransportError::Unexpected("boom".into())),
		}
	}
}

/// Encodes a batch as a JSON array of `{name, distinct_id, properties}`.
pub struct TestBackend {
	name: &'static str,
}

impl TestBackend {
	pub fn new(name: &'static str) -> Self {
		Self { name }
	}
}

impl Backend for TestBackend {
	fn name(&self) -> &str {
		self.name
	}

	fn endpoint_path(&self) -> &str {
		"/batch"
	}

	fn new_session_id(&self) -> SessionId {
		SessionId::Number(42)
	}

	fn encode_batch(&self, _api_key: &ApiKey, events: &[Event]) -> Result<Vec<u8>, serde_json::Error> {
		let body: Vec<_> = events
			.iter()
			.map(|e| {
				serde_json::json!({
					"name": e.name(),
					"distinct_id": e.distinct_id(),
					"properties": e.properties(),
				})
			})
			.collect();
		serde_json::to_vec(&body)
	}
}

/// Event names of the `index`th recorded body.
pub fn body_names(transport: &MockTransport, index: usize) -> Vec<String> {
	transport.bodies()[index]
		.as_array()
		.unwrap()
		.iter()
		.map(|e| e["name"].as_str().unwrap().to_string())
		.collect()
}
