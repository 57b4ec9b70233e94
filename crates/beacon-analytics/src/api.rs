// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Object-safe view of a backend client, used by the dispatcher.

use std::time::Duration;

use beacon_analytics_core::{BatchResult, Event, EventArgs, EventError, Flushed, Properties};
use tokio::sync::broadcast;

use crate::backend::Backend;
use crate::client::BackendClient;

/// Everything the dispatcher needs from one backend client, independent of
/// the vendor type.
#[async_trait::async_trait]
pub trait AnalyticsApi: Send + Sync {
	fn name(&self) -> &str;

	fn initialize(&self);

	fn enqueue(&self, event: Event);

	fn enqueue_with(&self, args: EventArgs) -> Result<(), EventError>;

	fn create_properties(&self) -> Properties;

	fn create_properties_from(&self, properties: &Properties) -> Properties;

	fn set_default_properties(&self, properties: Properties);

	fn default_properties(&self) -> Properties;

	fn queue_count(&self) -> usize;

	fn set_auto_flush(&self, enabled: bool);

	fn is_auto_flush_enabled(&self) -> bool;

	fn set_flush_interval(&self, interval: Duration);

	fn subscribe(&self) -> broadcast::Receiver<Flushed>;

	async fn flush(&self) -> BatchResult;

	async fn batch(&self, events: Vec<Event>) -> BatchResult;

	async fn shutdown(&self);
}

#[async_trait::async_trait]
impl<B: Backend> AnalyticsApi for BackendClient<B> {
	fn name(&self) -> &str {
		BackendClient::name(self)
	}

	fn initialize(&self) {
		BackendClient::initialize(self)
	}

	fn enqueue(&self, event: Event) {
		BackendClient::enqueue(self, event)
	}

	fn enqueue_with(&self, args: EventArgs) -> Result<(), EventError> {
		BackendClient::enqueue_with(self, args)
	}

	fn create_properties(&self) -> Properties {
		BackendClient::create_properties(self)
	}

	fn create_properties_from(&self, properties: &Properties) -> Properties {
		BackendClient::create_properties_from(self, properties)
	}

	fn set_default_properties(&self, properties: Properties) {
		BackendClient::set_default_properties(self, properties)
	}

	fn default_properties(&self) -> Properties {
		BackendClient::default_properties(self)
	}

	fn queue_count(&self) -> usize {
		BackendClient::queue_count(self)
	}

	fn set_auto_flush(&self, enabled: bool) {
		BackendClient::set_auto_flush(self, enabled)
	}

	fn is_auto_flush_enabled(&self) -> bool {
		BackendClient::is_auto_flush_enabled(self)
	}

	fn set_flush_interval(&self, interval: Duration) {
		BackendClient::set_flush_interval(self, interval)
	}

	fn subscribe(&self) -> broadcast::Receiver<Flushed> {
		BackendClient::subscribe(self)
	}

	async fn flush(&self) -> BatchResult {
		BackendClient::flush(self).await
	}

	async fn batch(&self, events: Vec<Event>) -> BatchResult {
		BackendClient::batch(self, events).await
	}

	async fn shutdown(&self) {
		BackendClient::shutdown(self).await
	}
}
