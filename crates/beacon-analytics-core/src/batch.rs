// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outcomes of sending and flushing batches.

use serde::{Deserialize, Serialize};

/// Result of one batch send.
///
/// `success` is false only when the transport failed (connection refused,
/// timeout, DNS). An empty batch is a success with nothing sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
	/// Number of events handed to the send.
	pub queued_count: usize,
	/// Number of events counted as delivered.
	pub sent_count: usize,
	pub success: bool,
}

impl BatchResult {
	/// Nothing to send.
	pub fn empty() -> Self {
		Self {
			queued_count: 0,
			sent_count: 0,
			success: true,
		}
	}

	/// All `count` events were handed to the backend.
	pub fn sent(count: usize) -> Self {
		Self {
			queued_count: count,
			sent_count: count,
			success: true,
		}
	}

	/// The transport failed; nothing was delivered.
	pub fn transport_failure() -> Self {
		Self {
			queued_count: 0,
			sent_count: 0,
			success: false,
		}
	}

	/// An unexpected error swallowed the batch without counting as a
	/// transport failure, so no load-shedding follows.
	pub fn dropped() -> Self {
		Self::empty()
	}

	pub fn is_success(&self) -> bool {
		self.success
	}
}

/// Notification broadcast after every successful flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flushed {
	/// Number of events drained by the flush.
	pub count: usize,
}
