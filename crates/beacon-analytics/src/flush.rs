// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Single-flight flushing and the auto-flush timer.
//!
//! A [`FlushCoordinator`] owns the flush gate for one backend. At most one
//! flush runs at a time; later callers wait their turn and then drain
//! whatever has been queued since. The auto-flush timer is a spawned task
//! that sleeps, flushes to completion, and sleeps again, so the next tick is
//! measured from the end of the previous flush.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use beacon_analytics_core::{BatchResult, Event, Flushed};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::queue::EventQueue;

/// Capacity of the [`Flushed`] broadcast channel. Slow subscribers observe
/// `RecvError::Lagged` rather than blocking flushes.
const FLUSHED_CHANNEL_CAPACITY: usize = 64;

/// Sends one drained batch to a backend.
#[async_trait::async_trait]
pub trait BatchSender: Send + Sync {
	/// Sends `events` and reports what happened. Never fails: transport and
	/// remote errors are folded into the result.
	async fn send_batch(&self, events: Vec<Event>) -> BatchResult;
}

struct CoordinatorInner {
	name: String,
	queue: Arc<EventQueue>,
	sender: Arc<dyn BatchSender>,
	gate: tokio::sync::Mutex<()>,
	flushed_tx: broadcast::Sender<Flushed>,
	timer: Mutex<Option<CancellationToken>>,
	interval: Mutex<Duration>,
}

impl Drop for CoordinatorInner {
	fn drop(&mut self) {
		if let Some(token) = lock(&self.timer).take() {
			token.cancel();
		}
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates flushes of one queue into one [`BatchSender`].
#[derive(Clone)]
pub struct FlushCoordinator {
	inner: Arc<CoordinatorInner>,
}

impl FlushCoordinator {
	/// Creates a coordinator with auto-flush off.
	pub fn new(
		name: impl Into<String>,
		queue: Arc<EventQueue>,
		sender: Arc<dyn BatchSender>,
		interval: Duration,
	) -> Self {
		let (flushed_tx, _) = broadcast::channel(FLUSHED_CHANNEL_CAPACITY);
		Self {
			inner: Arc::new(CoordinatorInner {
				name: name.into(),
				queue,
				sender,
				gate: tokio::sync::Mutex::new(()),
				flushed_tx,
				timer: Mutex::new(None),
				interval: Mutex::new(interval),
			}),
		}
	}

	/// Drains the queue and sends it.
	///
	/// Concurrent callers are serialized; none is rejected. On success a
	/// [`Flushed`] notification carrying the drained count is broadcast,
	/// including a count of zero when the queue was empty.
	#[instrument(skip(self), fields(backend = %self.inner.name))]
	pub async fn flush(&self) -> BatchResult {
		let _gate = self.inner.gate.lock().await;

		let events = self.inner.queue.drain_snapshot();
		let count = events.len();
		debug!(count, "flushing event queue");

		let result = self.inner.sender.send_batch(events).await;

		if result.is_success() {
			// No subscribers is fine.
			let _ = self.inner.flushed_tx.send(Flushed { count });
		}

		result
	}

	/// Subscribes to [`Flushed`] notifications.
	pub fn subscribe(&self) -> broadcast::Receiver<Flushed> {
		self.inner.flushed_tx.subscribe()
	}

	pub fn flush_interval(&self) -> Duration {
		*lock(&self.inner.interval)
	}

	/// Sets the interval used the next time auto-flush is enabled. A running
	/// timer keeps its current interval.
	pub fn set_flush_interval(&self, interval: Duration) {
		*lock(&self.inner.interval) = interval;
	}

	pub fn is_auto_flush_enabled(&self) -> bool {
		lock(&self.inner.timer).is_some()
	}

	/// Starts or stops the auto-flush timer.
	///
	/// Enabling cancels any running timer and starts a new one with the
	/// current interval. Must be called within a tokio runtime to enable;
	/// outside one, a warning is logged and auto-flush stays off.
	pub fn set_auto_flush(&self, enabled: bool) {
		let mut timer = lock(&self.inner.timer);
		if let Some(token) = timer.take() {
			token.cancel();
		}

		if !enabled {
			debug!(backend = %self.inner.name, "auto-flush disabled");
			return;
		}

		let handle = match Handle::try_current() {
			Ok(handle) => handle,
			Err(_) => {
				warn!(
					backend = %self.inner.name,
					"cannot enable auto-flush outside a tokio runtime"
				);
				return;
			}
		};

		let interval = self.flush_interval();
		let token = CancellationToken::new();
		handle.spawn(run_timer(
			Arc::downgrade(&self.inner),
			token.clone(),
			interval,
		));
		*timer = Some(token);

		info!(
			backend = %self.inner.name,
			flush_interval_ms = interval.as_millis() as u64,
			"auto-flush enabled"
		);
	}
}

async fn run_timer(inner: Weak<CoordinatorInner>, token: CancellationToken, interval: Duration) {
	loop {
		tokio::select! {
			biased;
			_ = token.cancelled() => break,
			_ = tokio::time::sleep(interval) => {}
		}

		if token.is_cancelled() {
			break;
		}

		let Some(inner) = inner.upgrade() else {
			break;
		};
		FlushCoordinator { inner }.flush().await;
	}

	debug!("auto-flush timer stopped");
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

	struct MockSender {
		batches: Mutex<Vec<Vec<String>>>,
		in_flight: AtomicUsize,
		max_in_flight: AtomicUsize,
		delay: Duration,
		should_fail: AtomicBool,
	}

	impl MockSender {
		fn new() -> Self {
			Self::with_delay(Duration::ZERO)
		}

		fn with_delay(delay: Duration) -> Self {
			Self {
				batches: Mutex::new(Vec::new()),
				in_flight: AtomicUsize::new(0),
				max_in_flight: AtomicUsize::new(0),
				delay,
				should_fail: AtomicBool::new(false),
			}
		}

		fn batches(&self) -> Vec<Vec<String>> {
			self.batches.lock().unwrap().clone()
		}
	}

	#[async_trait::async_trait]
	impl BatchSender for MockSender {
		async fn send_batch(&self, events: Vec<Event>) -> BatchResult {
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
			self.max_in_flight.fetch_max(now, Ordering::SeqCst);
			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}
			self.batches
				.lock()
				.unwrap()
				.push(events.iter().map(|e| e.name().to_string()).collect());
			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			if self.should_fail.load(Ordering::SeqCst) {
				BatchResult::transport_failure()
			} else {
				BatchResult::sent(events.len())
			}
		}
	}

	fn event(name: &str) -> Event {
		Event::capture(name, "user-1", None, Utc::now()).unwrap()
	}

	fn coordinator(sender: Arc<MockSender>, interval: Duration) -> (FlushCoordinator, Arc<EventQueue>) {
		let queue = Arc::new(EventQueue::new());
		let coordinator = FlushCoordinator::new("test", Arc::clone(&queue), sender, interval);
		(coordinator, queue)
	}

	#[tokio::test]
	async fn test_flush_sends_everything_and_notifies() {
		let sender = Arc::new(MockSender::new());
		let (coordinator, queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));
		let mut flushed = coordinator.subscribe();
		assert!(queue.enqueue_all((0..5).map(|i| event(&format!("e{i}")))));

		let result = coordinator.flush().await;

		assert_eq!(result, BatchResult::sent(5));
		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 5 });
		assert!(flushed.try_recv().is_err());
		assert_eq!(queue.len(), 0);
		assert_eq!(sender.batches().len(), 1);
	}

	#[tokio::test]
	async fn test_empty_flush_notifies_zero() {
		let sender = Arc::new(MockSender::new());
		let (coordinator, _queue) = coordinator(sender, Duration::from_secs(10));
		let mut flushed = coordinator.subscribe();

		let result = coordinator.flush().await;

		assert!(result.success);
		assert_eq!(result.sent_count, 0);
		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 0 });
	}

	#[tokio::test]
	async fn test_failed_flush_does_not_notify() {
		let sender = Arc::new(MockSender::new());
		sender.should_fail.store(true, Ordering::SeqCst);
		let (coordinator, queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));
		let mut flushed = coordinator.subscribe();
		queue.enqueue(event("lost")).unwrap();

		let result = coordinator.flush().await;

		assert!(!result.success);
		assert!(matches!(
			flushed.try_recv(),
			Err(broadcast::error::TryRecvError::Empty)
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_concurrent_flushes_never_overlap() {
		let sender = Arc::new(MockSender::with_delay(Duration::from_millis(100)));
		let (coordinator, queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));
		assert!(queue.enqueue_all(vec![event("a"), event("b")]));

		let first = {
			let coordinator = coordinator.clone();
			tokio::spawn(async move { coordinator.flush().await })
		};
		// Let the first flush drain and enter the sender.
		tokio::time::sleep(Duration::from_millis(10)).await;
		queue.enqueue(event("c")).unwrap();
		let second = {
			let coordinator = coordinator.clone();
			tokio::spawn(async move { coordinator.flush().await })
		};

		let first = first.await.unwrap();
		let second = second.await.unwrap();

		assert_eq!(first.sent_count, 2);
		assert_eq!(second.sent_count, 1);
		assert_eq!(sender.max_in_flight.load(Ordering::SeqCst), 1);
		assert_eq!(
			sender.batches(),
			vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_auto_flush_disabled_never_flushes() {
		let sender = Arc::new(MockSender::new());
		let (coordinator, queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));
		queue.enqueue(event("waiting")).unwrap();

		tokio::time::sleep(Duration::from_secs(60)).await;

		assert!(!coordinator.is_auto_flush_enabled());
		assert!(sender.batches().is_empty());
		assert_eq!(queue.len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_auto_flush_repeats() {
		let sender = Arc::new(MockSender::new());
		let (coordinator, queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));
		let mut flushed = coordinator.subscribe();
		queue.enqueue(event("a")).unwrap();

		coordinator.set_auto_flush(true);

		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 1 });
		queue.enqueue(event("b")).unwrap();
		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 1 });
		assert_eq!(flushed.recv().await.unwrap(), Flushed { count: 0 });
		assert_eq!(sender.batches().len(), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_disabling_auto_flush_stops_timer() {
		let sender = Arc::new(MockSender::new());
		let (coordinator, _queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));

		coordinator.set_auto_flush(true);
		tokio::time::sleep(Duration::from_secs(15)).await;
		coordinator.set_auto_flush(false);
		let flushes = sender.batches().len();
		tokio::time::sleep(Duration::from_secs(60)).await;

		assert_eq!(flushes, 1);
		assert_eq!(sender.batches().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_interval_change_applies_on_rearm() {
		let sender = Arc::new(MockSender::new());
		let (coordinator, _queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));

		coordinator.set_auto_flush(true);
		coordinator.set_flush_interval(Duration::from_secs(1));
		tokio::time::sleep(Duration::from_secs(5)).await;
		// Running timer still uses the old 10s interval.
		assert_eq!(sender.batches().len(), 0);

		coordinator.set_auto_flush(true);
		tokio::time::sleep(Duration::from_millis(3500)).await;
		assert_eq!(sender.batches().len(), 3);
	}

	#[test]
	fn test_enable_outside_runtime_stays_off() {
		let sender = Arc::new(MockSender::new());
		let (coordinator, queue) = coordinator(Arc::clone(&sender), Duration::from_secs(10));

		coordinator.set_auto_flush(true);

		assert!(!coordinator.is_auto_flush_enabled());

		queue.enqueue(event("a")).unwrap();
		let result = tokio_test::block_on(coordinator.flush());
		assert!(result.success);
		assert_eq!(sender.batches(), vec![vec!["a".to_string()]]);
	}
}
