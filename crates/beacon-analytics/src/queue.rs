// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The per-backend event queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use beacon_analytics_core::Event;

/// Ordered, unbounded queue of pending events.
///
/// Insertion order is send order. The lock is held only for a push, a swap
/// or a clear, so producers never wait on network I/O. Once closed, the
/// queue refuses new events but can still be drained.
#[derive(Debug, Default)]
pub struct EventQueue {
	state: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
	events: VecDeque<Event>,
	closed: bool,
}

impl EventQueue {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, QueueState> {
		// A panicking producer cannot leave the deque half-written.
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Appends one event. Hands the event back if the queue is closed.
	pub fn enqueue(&self, event: Event) -> Result<(), Event> {
		let mut state = self.lock();
		if state.closed {
			return Err(event);
		}
		state.events.push_back(event);
		Ok(())
	}

	/// Appends events in iteration order. Returns `false`, dropping the
	/// events, if the queue is closed.
	pub fn enqueue_all<I>(&self, events: I) -> bool
	where
		I: IntoIterator<Item = Event>,
	{
		let events: Vec<Event> = events.into_iter().collect();
		let mut state = self.lock();
		if state.closed {
			return false;
		}
		state.events.extend(events);
		true
	}

	/// Refuses every later enqueue. Events already queued stay for the
	/// next drain.
	pub fn close(&self) {
		self.lock().closed = true;
	}

	pub fn is_closed(&self) -> bool {
		self.lock().closed
	}

	/// Atomically removes and returns everything currently queued. Events
	/// enqueued after the swap stay for the next drain.
	pub fn drain_snapshot(&self) -> Vec<Event> {
		let taken = std::mem::take(&mut self.lock().events);
		Vec::from(taken)
	}

	/// Puts a batch back at the front, ahead of newer events, keeping its
	/// original order.
	pub fn requeue_front(&self, events: Vec<Event>) {
		let mut state = self.lock();
		for event in events.into_iter().rev() {
			state.events.push_front(event);
		}
	}

	/// Drops everything queued.
	pub fn clear(&self) {
		self.lock().events.clear();
	}

	/// Number of queued events. Only a snapshot under concurrency.
	pub fn len(&self) -> usize {
		self.lock().events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().events.is_empty()
	}
}
