// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The per-backend analytics client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use beacon_analytics_core::{
	BatchResult, CaptureArgs, Event, EventArgs, EventError, Flushed, IdentifyArgs, Properties,
	SystemInfo,
};
use beacon_common_http::ClientOptions;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::Backend;
use crate::config::{BackendConfig, FailedBatchPolicy, RejectionPolicy};
use crate::error::{Result, TransportError};
use crate::flush::{BatchSender, FlushCoordinator};
use crate::queue::EventQueue;
use crate::transport::{HttpTransport, Transport};

/// Sends batches for one backend and applies the failure policies.
struct BackendSender<B> {
	backend: B,
	config: BackendConfig,
	transport: Arc<dyn Transport>,
	queue: Arc<EventQueue>,
}

impl<B: Backend> BackendSender<B> {
	/// Load-sheds or requeues after a failed send.
	fn handle_failure(&self, events: Vec<Event>) -> BatchResult {
		let pending = events.len() + self.queue.len();
		if pending >= self.config.max_queue_size {
			warn!(
				backend = self.backend.name(),
				pending,
				max_queue_size = self.config.max_queue_size,
				"dropping all queued events after failed send"
			);
			self.queue.clear();
		} else if self.config.failed_batch_policy == FailedBatchPolicy::Requeue {
			debug!(
				backend = self.backend.name(),
				count = events.len(),
				"requeueing failed batch"
			);
			self.queue.requeue_front(events);
		}

		BatchResult::transport_failure()
	}

	#[instrument(skip_all, fields(backend = %self.backend.name(), count = events.len()))]
	async fn send(&self, events: Vec<Event>) -> BatchResult {
		if events.is_empty() {
			debug!("queue empty, nothing to send");
			return BatchResult::empty();
		}

		let count = events.len();
		let body = match self.backend.encode_batch(&self.config.api_key, &events) {
			Ok(body) => body,
			Err(e) => {
				error!(error = %e, "failed to encode batch");
				return BatchResult::dropped();
			}
		};

		match self.transport.post(self.backend.endpoint_path(), body).await {
			Ok(response) if response.is_success() => {
				debug!(status = response.status, "sent batch");
				BatchResult::sent(count)
			}
			Ok(response) => {
				error!(
					status = response.status,
					body = %response.body,
					"backend rejected batch"
				);
				match self.config.rejection_policy {
					RejectionPolicy::CountAsDelivered => BatchResult::sent(count),
					RejectionPolicy::TreatAsFailure => self.handle_failure(events),
				}
			}
			Err(TransportError::Network(message)) => {
				error!(error = %message, "failed to send batch");
				self.handle_failure(events)
			}
			Err(TransportError::Unexpected(message)) => {
				error!(error = %message, "unexpected error sending batch");
				BatchResult::dropped()
			}
		}
	}
}

#[async_trait::async_trait]
impl<B: Backend> BatchSender for BackendSender<B> {
	async fn send_batch(&self, events: Vec<Event>) -> BatchResult {
		self.send(events).await
	}
}

struct ClientInner<B> {
	sender: Arc<BackendSender<B>>,
	queue: Arc<EventQueue>,
	coordinator: FlushCoordinator,
	defaults: RwLock<Properties>,
	closed: AtomicBool,
}

/// Queues events for one backend and ships them in batches.
///
/// Cheap to clone; clones share the queue, the flush gate and the timer.
///
/// ```ignore
/// let client = BackendClient::new(PosthogBackend::new(), config, &SystemInfo::detect())?;
/// client.initialize();
///
/// let props = client.create_properties();
/// client.enqueue_with(CaptureArgs::new("Opened").distinct_id("user-1").properties(props).into())?;
///
/// client.shutdown().await;
/// ```
pub struct BackendClient<B> {
	inner: Arc<ClientInner<B>>,
}

impl<B> Clone for BackendClient<B> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<B: Backend> BackendClient<B> {
	/// Creates a client posting over HTTP to `config.base_url`. Starts the
	/// auto-flush timer when `config.auto_flush_enabled` is set.
	pub fn new(backend: B, config: BackendConfig, system: &SystemInfo) -> Result<Self> {
		let http = beacon_common_http::new_client(&ClientOptions {
			user_agent: config.user_agent.clone(),
			timeout: config.timeout,
		})?;
		let transport = HttpTransport::new(http, config.base_url.clone());
		Self::with_transport(backend, config, system, Arc::new(transport))
	}

	/// Creates a client over a custom [`Transport`].
	pub fn with_transport(
		backend: B,
		config: BackendConfig,
		system: &SystemInfo,
		transport: Arc<dyn Transport>,
	) -> Result<Self> {
		config.validate(backend.name())?;
		backend.validate_config(&config)?;

		let name = backend.name().to_string();
		let defaults = backend.base_properties(system);
		let auto_flush = config.auto_flush_enabled;
		let interval = config.flush_interval;
		let queue = Arc::new(EventQueue::new());

		let sender = Arc::new(BackendSender {
			backend,
			config,
			transport,
			queue: Arc::clone(&queue),
		});
		let coordinator = FlushCoordinator::new(
			name.clone(),
			Arc::clone(&queue),
			Arc::clone(&sender) as Arc<dyn BatchSender>,
			interval,
		);

		let client = Self {
			inner: Arc::new(ClientInner {
				sender,
				queue,
				coordinator,
				defaults: RwLock::new(defaults),
				closed: AtomicBool::new(false),
			}),
		};

		if auto_flush {
			client.set_auto_flush(true);
		}

		info!(backend = %name, "analytics client initialized");
		Ok(client)
	}

	pub fn name(&self) -> &str {
		self.inner.sender.backend.name()
	}

	pub fn backend(&self) -> &B {
		&self.inner.sender.backend
	}

	pub fn config(&self) -> &BackendConfig {
		&self.inner.sender.config
	}

	/// Assigns a fresh session id to the default properties.
	pub fn initialize(&self) {
		let session_id = self.backend().new_session_id();
		let mut defaults = self
			.inner
			.defaults
			.write()
			.unwrap_or_else(PoisonError::into_inner);
		defaults.session_id = Some(session_id);
		debug!(backend = self.name(), "default properties initialized");
	}

	/// Appends an event to the queue. Events offered after `shutdown` are
	/// dropped.
	pub fn enqueue(&self, event: Event) {
		if let Err(event) = self.inner.queue.enqueue(event) {
			warn!(backend = self.name(), event = event.name(), "client shut down, dropping event");
		}
	}

	pub fn enqueue_all<I>(&self, events: I)
	where
		I: IntoIterator<Item = Event>,
	{
		if !self.inner.queue.enqueue_all(events) {
			warn!(backend = self.name(), "client shut down, dropping events");
		}
	}

	/// Builds an event from `args` and enqueues it. The caller's properties
	/// are layered over this client's defaults.
	pub fn enqueue_with(&self, args: EventArgs) -> std::result::Result<(), EventError> {
		let event = match args {
			EventArgs::Capture(args) => {
				args.validate()?;
				let properties = self.resolve_properties(args.properties.as_ref());
				CaptureArgs {
					properties: Some(properties),
					..args
				}
				.into_event()?
			}
			EventArgs::Identify(args) => {
				args.validate()?;
				let properties = self.resolve_properties(args.properties.as_ref());
				IdentifyArgs {
					properties: Some(properties),
					..args
				}
				.into_event()?
			}
		};
		self.enqueue(event);
		Ok(())
	}

	fn resolve_properties(&self, caller: Option<&Properties>) -> Properties {
		match caller {
			Some(properties) => self.create_properties_from(properties),
			None => self.create_properties(),
		}
	}

	/// Flushes the queue now. See [`FlushCoordinator::flush`].
	pub async fn flush(&self) -> BatchResult {
		self.inner.coordinator.flush().await
	}

	/// Sends `events` directly, bypassing the queue. Failure handling still
	/// applies to the queue.
	pub async fn batch(&self, events: Vec<Event>) -> BatchResult {
		self.inner.sender.send_batch(events).await
	}

	/// Starts or stops the flush timer. Ignored once the client is shut
	/// down.
	pub fn set_auto_flush(&self, enabled: bool) {
		if enabled && self.is_closed() {
			warn!(backend = self.name(), "client shut down, not starting auto-flush");
			return;
		}
		self.inner.coordinator.set_auto_flush(enabled);
	}

	pub fn is_auto_flush_enabled(&self) -> bool {
		self.inner.coordinator.is_auto_flush_enabled()
	}

	/// Takes effect the next time auto-flush is enabled.
	pub fn set_flush_interval(&self, interval: Duration) {
		self.inner.coordinator.set_flush_interval(interval);
	}

	pub fn flush_interval(&self) -> Duration {
		self.inner.coordinator.flush_interval()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Flushed> {
		self.inner.coordinator.subscribe()
	}

	/// A copy of the defaults, with the configured client IP applied.
	pub fn create_properties(&self) -> Properties {
		self.apply_client_ip(self.default_properties())
	}

	/// `properties` layered over the defaults, with the configured client IP
	/// applied.
	pub fn create_properties_from(&self, properties: &Properties) -> Properties {
		let defaults = self.default_properties();
		self.apply_client_ip(properties.merged_over(&defaults))
	}

	fn apply_client_ip(&self, mut properties: Properties) -> Properties {
		if let Some(ip) = &self.config().client_ip {
			properties.ip_address = Some(ip.clone());
		}
		properties
	}

	pub fn set_default_properties(&self, properties: Properties) {
		*self
			.inner
			.defaults
			.write()
			.unwrap_or_else(PoisonError::into_inner) = properties;
	}

	pub fn default_properties(&self) -> Properties {
		self.inner
			.defaults
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	pub fn queue_count(&self) -> usize {
		self.inner.queue.len()
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Stops the timer, flushes once and closes the client. Later calls do
	/// nothing.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		self.set_auto_flush(false);
		self.inner.queue.close();
		let result = self.flush().await;
		info!(
			backend = self.name(),
			sent = result.sent_count,
			success = result.success,
			"analytics client shut down"
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{body_names, MockTransport, Reply, TestBackend};
	use beacon_analytics_core::SessionId;
	use chrono::Utc;

	fn config() -> BackendConfig {
		BackendConfig::new("http://localhost:8080", "key").with_auto_flush(false)
	}

	fn client(config: BackendConfig, transport: Arc<MockTransport>) -> BackendClient<TestBackend> {
		BackendClient::with_transport(
			TestBackend::new("test"),
			config,
			&SystemInfo::default(),
			transport,
		)
		.unwrap()
	}

	fn events(n: usize) -> Vec<Event> {
		(0..n)
			.map(|i| Event::capture(format!("e{i}"), "user-1", None, Utc::now()).unwrap())
			.collect()
	}

	#[tokio::test]
	async fn test_flush_healthy_backend() {
		let transport = MockTransport::new(Reply::Status(200));
		let client = client(config(), Arc::clone(&transport));
		let mut flushed = client.subscribe();
		client.enqueue_all(events(5));

		let result = client.flush().await;

		assert_eq!(result, BatchResult::sent(5));
		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 5 });
		assert_eq!(client.queue_count(), 0);
		assert_eq!(transport.calls(), 1);
	}

	#[tokio::test]
	async fn test_empty_flush_does_no_io() {
		let transport = MockTransport::new(Reply::Status(200));
		let client = client(config(), Arc::clone(&transport));
		let mut flushed = client.subscribe();

		let result = client.flush().await;

		assert_eq!(result, BatchResult::empty());
		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 0 });
		assert_eq!(transport.calls(), 0);
	}

	#[tokio::test]
	async fn test_failure_at_queue_limit_clears_queue() {
		let transport = MockTransport::new(Reply::Network);
		let client = client(config().with_max_queue_size(10), Arc::clone(&transport));
		let queued = events(10);
		client.enqueue_all(queued.clone());

		let result = client.batch(queued).await;

		assert_eq!(result, BatchResult::transport_failure());
		assert_eq!(client.queue_count(), 0);
	}

	#[tokio::test]
	async fn test_failure_below_limit_keeps_queue_without_retry() {
		let transport = MockTransport::new(Reply::Network);
		let client = client(config().with_max_queue_size(1000), Arc::clone(&transport));
		let queued = events(10);
		client.enqueue_all(queued.clone());

		let result = client.batch(queued).await;

		assert!(!result.success);
		assert_eq!(client.queue_count(), 10);
		assert_eq!(transport.calls(), 1);
	}

	#[tokio::test]
	async fn test_failed_flush_with_drop_loses_batch() {
		let transport = MockTransport::new(Reply::Network);
		let client = client(config(), Arc::clone(&transport));
		let mut flushed = client.subscribe();
		client.enqueue_all(events(3));

		let result = client.flush().await;

		assert!(!result.success);
		assert_eq!(client.queue_count(), 0);
		assert!(flushed.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_failed_flush_with_requeue_restores_order() {
		let transport = MockTransport::new(Reply::Network);
		let client = client(
			config().with_failed_batch_policy(FailedBatchPolicy::Requeue),
			Arc::clone(&transport),
		);
		client.enqueue_all(events(3));

		client.flush().await;
		client.enqueue(Event::capture("later", "user-1", None, Utc::now()).unwrap());
		transport.set_reply(Reply::Status(200));
		let result = client.flush().await;

		assert_eq!(result.sent_count, 4);
		assert_eq!(body_names(&transport, 1), vec!["e0", "e1", "e2", "later"]);
	}

	#[tokio::test]
	async fn test_requeue_skipped_when_load_shed() {
		let transport = MockTransport::new(Reply::Network);
		let client = client(
			config()
				.with_failed_batch_policy(FailedBatchPolicy::Requeue)
				.with_max_queue_size(3),
			Arc::clone(&transport),
		);
		client.enqueue_all(events(3));

		client.flush().await;

		assert_eq!(client.queue_count(), 0);
	}

	#[tokio::test]
	async fn test_rejection_counts_as_delivered_by_default() {
		let transport = MockTransport::new(Reply::Status(400));
		let client = client(config(), Arc::clone(&transport));
		let mut flushed = client.subscribe();
		client.enqueue_all(events(2));

		let result = client.flush().await;

		assert_eq!(result, BatchResult::sent(2));
		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 2 });
	}

	#[tokio::test]
	async fn test_rejection_treated_as_failure() {
		let transport = MockTransport::new(Reply::Status(500));
		let client = client(
			config()
				.with_rejection_policy(RejectionPolicy::TreatAsFailure)
				.with_max_queue_size(10),
			Arc::clone(&transport),
		);
		let queued = events(10);
		client.enqueue_all(queued.clone());

		let result = client.batch(queued).await;

		assert_eq!(result, BatchResult::transport_failure());
		assert_eq!(client.queue_count(), 0);
	}

	#[tokio::test]
	async fn test_unexpected_error_is_swallowed() {
		let transport = MockTransport::new(Reply::Unexpected);
		let client = client(config().with_max_queue_size(1), Arc::clone(&transport));
		client.enqueue_all(events(4));

		let result = client.batch(events(2)).await;

		assert_eq!(result, BatchResult::dropped());
		assert!(result.success);
		assert_eq!(client.queue_count(), 4);
	}

	#[tokio::test]
	async fn test_create_properties_applies_client_ip() {
		let transport = MockTransport::new(Reply::Status(200));
		let client = client(config().with_client_ip("10.0.0.1"), transport);
		client.set_default_properties(Properties {
			device_id: Some("device".into()),
			..Default::default()
		});

		let created = client.create_properties();
		let from = client.create_properties_from(&Properties {
			device_id: Some("override".into()),
			ip_address: Some("192.168.0.1".into()),
			..Default::default()
		});

		assert_eq!(created.ip_address.as_deref(), Some("10.0.0.1"));
		assert_eq!(created.device_id.as_deref(), Some("device"));
		assert_eq!(from.ip_address.as_deref(), Some("10.0.0.1"));
		assert_eq!(from.device_id.as_deref(), Some("override"));
	}

	#[tokio::test]
	async fn test_initialize_assigns_session_id() {
		let client = client(config(), MockTransport::new(Reply::Status(200)));
		assert!(client.default_properties().session_id.is_none());

		client.initialize();

		assert_eq!(
			client.default_properties().session_id,
			Some(SessionId::Number(42))
		);
	}

	#[tokio::test]
	async fn test_enqueue_with_merges_defaults() {
		let client = client(config(), MockTransport::new(Reply::Status(200)));
		client.set_default_properties(Properties::new().insert("plan", "free"));

		client
			.enqueue_with(
				CaptureArgs::new("Upgraded")
					.distinct_id("user-1")
					.properties(Properties::new().insert("seats", 2))
					.into(),
			)
			.unwrap();

		let event = client.inner.queue.drain_snapshot().remove(0);
		let props = event.properties().unwrap();
		assert_eq!(props.get_item("plan"), Some(&serde_json::json!("free")));
		assert_eq!(props.get_item("seats"), Some(&serde_json::json!(2)));
		assert_eq!(props.user_id.as_deref(), Some("user-1"));
	}

	#[tokio::test]
	async fn test_enqueue_with_rejects_missing_distinct_id() {
		let client = client(config(), MockTransport::new(Reply::Status(200)));
		let args: CaptureArgs = CaptureArgs::new("Upgraded");

		let err = client.enqueue_with(args.into()).unwrap_err();

		assert_eq!(err, EventError::MissingDistinctId);
		assert_eq!(client.queue_count(), 0);
	}

	#[tokio::test]
	async fn test_shutdown_flushes_once_and_is_idempotent() {
		let transport = MockTransport::new(Reply::Status(200));
		let client = client(config().with_auto_flush(true), Arc::clone(&transport));
		client.enqueue_all(events(3));

		client.shutdown().await;
		client.shutdown().await;

		assert!(client.is_closed());
		assert!(!client.is_auto_flush_enabled());
		assert_eq!(transport.calls(), 1);
		client.enqueue(events(1).remove(0));
		assert_eq!(client.queue_count(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_auto_flush_stays_off_after_shutdown() {
		let transport = MockTransport::new(Reply::Status(200));
		let client = client(
			config().with_flush_interval(Duration::from_secs(1)),
			Arc::clone(&transport),
		);
		client.shutdown().await;

		client.set_auto_flush(true);

		assert!(!client.is_auto_flush_enabled());
		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(transport.calls(), 0);
	}

	#[tokio::test]
	async fn test_events_racing_shutdown_are_flushed_or_refused() {
		let transport = MockTransport::new(Reply::Status(200));
		let client = client(config(), Arc::clone(&transport));

		let producer = {
			let client = client.clone();
			std::thread::spawn(move || {
				for event in events(200) {
					client.enqueue(event);
				}
			})
		};
		client.shutdown().await;
		producer.join().unwrap();

		// Anything enqueued before the close went out in the final flush.
		assert_eq!(client.queue_count(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_auto_flush_from_config() {
		let transport = MockTransport::new(Reply::Status(200));
		let client = client(
			config()
				.with_auto_flush(true)
				.with_flush_interval(Duration::from_secs(2)),
			Arc::clone(&transport),
		);
		let mut flushed = client.subscribe();
		client.enqueue_all(events(2));

		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 2 });
		assert_eq!(transport.calls(), 1);
	}

	#[test]
	fn test_invalid_config_rejected() {
		let transport = MockTransport::new(Reply::Status(200));
		let result = BackendClient::with_transport(
			TestBackend::new("test"),
			BackendConfig::new("not a url", "key").with_auto_flush(false),
			&SystemInfo::default(),
			transport,
		);
		assert!(result.is_err());
	}
}
