// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation errors raised while constructing events.

use thiserror::Error;

/// Invalid producer input. These indicate programmer error and are the only
/// errors a producer ever observes when queuing events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
	/// The event name was empty or whitespace.
	#[error("event name must not be empty")]
	EmptyEventName,

	/// No distinct id was supplied, or it was blank.
	#[error("distinct id is required")]
	MissingDistinctId,

	/// An alias event was built with a blank alias.
	#[error("alias must not be empty")]
	EmptyAlias,
}
