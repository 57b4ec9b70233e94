// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Producer-facing arguments for capture and identify calls.
//!
//! The property type is generic so the same argument shapes can carry a
//! single bag ([`Properties`]) or a per-backend set of bags.

use chrono::{DateTime, Utc};

use crate::error::EventError;
use crate::event::Event;
use crate::properties::Properties;

/// Arguments for a capture call.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureArgs<P = Properties> {
	pub event_name: String,
	pub distinct_id: Option<String>,
	pub properties: Option<P>,
	/// Defaults to the time the event is built.
	pub created_at: Option<DateTime<Utc>>,
}

impl<P> CaptureArgs<P> {
	pub fn new(event_name: impl Into<String>) -> Self {
		Self {
			event_name: event_name.into(),
			distinct_id: None,
			properties: None,
			created_at: None,
		}
	}

	pub fn distinct_id(mut self, distinct_id: impl Into<String>) -> Self {
		self.distinct_id = Some(distinct_id.into());
		self
	}

	pub fn properties(mut self, properties: P) -> Self {
		self.properties = Some(properties);
		self
	}

	pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
		self.created_at = Some(created_at);
		self
	}

	/// Checks the name and distinct id without building an event.
	pub fn validate(&self) -> Result<(), EventError> {
		if self.event_name.trim().is_empty() {
			return Err(EventError::EmptyEventName);
		}
		require_distinct_id(self.distinct_id.as_deref())?;
		Ok(())
	}
}

impl CaptureArgs<Properties> {
	pub fn into_event(self) -> Result<Event, EventError> {
		let distinct_id = require_distinct_id(self.distinct_id.as_deref())?.to_string();
		Event::capture(
			self.event_name,
			distinct_id,
			self.properties,
			self.created_at.unwrap_or_else(Utc::now),
		)
	}
}

/// Arguments for an identify call.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifyArgs<P = Properties> {
	pub distinct_id: Option<String>,
	pub properties: Option<P>,
	pub created_at: Option<DateTime<Utc>>,
}

impl<P> Default for IdentifyArgs<P> {
	fn default() -> Self {
		Self {
			distinct_id: None,
			properties: None,
			created_at: None,
		}
	}
}

impl<P> IdentifyArgs<P> {
	pub fn new(distinct_id: impl Into<String>) -> Self {
		Self {
			distinct_id: Some(distinct_id.into()),
			..Default::default()
		}
	}

	pub fn properties(mut self, properties: P) -> Self {
		self.properties = Some(properties);
		self
	}

	pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
		self.created_at = Some(created_at);
		self
	}

	pub fn validate(&self) -> Result<(), EventError> {
		require_distinct_id(self.distinct_id.as_deref())?;
		Ok(())
	}
}

impl IdentifyArgs<Properties> {
	pub fn into_event(self) -> Result<Event, EventError> {
		let distinct_id = require_distinct_id(self.distinct_id.as_deref())?.to_string();
		Event::identify(
			distinct_id,
			self.properties,
			self.created_at.unwrap_or_else(Utc::now),
		)
	}
}

/// Either kind of producer call, for APIs that accept both.
#[derive(Debug, Clone, PartialEq)]
pub enum EventArgs {
	Capture(CaptureArgs),
	Identify(IdentifyArgs),
}

impl EventArgs {
	pub fn into_event(self) -> Result<Event, EventError> {
		match self {
			EventArgs::Capture(args) => args.into_event(),
			EventArgs::Identify(args) => args.into_event(),
		}
	}
}

impl From<CaptureArgs> for EventArgs {
	fn from(args: CaptureArgs) -> Self {
		EventArgs::Capture(args)
	}
}

impl From<IdentifyArgs> for EventArgs {
	fn from(args: IdentifyArgs) -> Self {
		EventArgs::Identify(args)
	}
}

fn require_distinct_id(distinct_id: Option<&str>) -> Result<&str, EventError> {
	match distinct_id {
		Some(id) if !id.trim().is_empty() => Ok(id),
		_ => Err(EventError::MissingDistinctId),
	}
}
