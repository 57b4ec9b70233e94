// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The analytics event value carried through the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventError;
use crate::properties::Properties;

/// Event name used for identify calls.
pub const IDENTIFY_EVENT_NAME: &str = "$identify";

/// Event name used for alias calls.
pub const ALIAS_EVENT_NAME: &str = "$create_alias";

/// What kind of call produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	Capture,
	Identify,
	Alias,
}

/// An analytics event. Immutable once built; constructors validate input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	kind: EventKind,
	name: String,
	distinct_id: String,
	properties: Option<Properties>,
	created_at: DateTime<Utc>,
}

impl Event {
	/// Builds a capture event. The distinct id is also written into the
	/// bag's `user_id` when a bag is supplied.
	pub fn capture(
		name: impl Into<String>,
		distinct_id: impl Into<String>,
		properties: Option<Properties>,
		created_at: DateTime<Utc>,
	) -> Result<Self, EventError> {
		let name = name.into();
		if name.trim().is_empty() {
			return Err(EventError::EmptyEventName);
		}
		let distinct_id = validate_distinct_id(distinct_id.into())?;

		let properties = properties.map(|mut props| {
			props.user_id = Some(distinct_id.clone());
			props
		});

		Ok(Self {
			kind: EventKind::Capture,
			name,
			distinct_id,
			properties,
			created_at,
		})
	}

	/// Builds an identify event (`$identify`).
	pub fn identify(
		distinct_id: impl Into<String>,
		properties: Option<Properties>,
		created_at: DateTime<Utc>,
	) -> Result<Self, EventError> {
		let distinct_id = validate_distinct_id(distinct_id.into())?;

		Ok(Self {
			kind: EventKind::Identify,
			name: IDENTIFY_EVENT_NAME.to_string(),
			distinct_id,
			properties,
			created_at,
		})
	}

	/// Builds an alias event (`$create_alias`) linking `alias` to
	/// `distinct_id`. The alias is stored under the `alias` extension key.
	pub fn alias(
		distinct_id: impl Into<String>,
		alias: impl Into<String>,
		properties: Option<Properties>,
		created_at: DateTime<Utc>,
	) -> Result<Self, EventError> {
		let distinct_id = validate_distinct_id(distinct_id.into())?;
		let alias = alias.into();
		if alias.trim().is_empty() {
			return Err(EventError::EmptyAlias);
		}

		let mut properties = properties.unwrap_or_default();
		properties.set_item("alias", Value::String(alias));

		Ok(Self {
			kind: EventKind::Alias,
			name: ALIAS_EVENT_NAME.to_string(),
			distinct_id,
			properties: Some(properties),
			created_at,
		})
	}

	pub fn kind(&self) -> EventKind {
		self.kind
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn distinct_id(&self) -> &str {
		&self.distinct_id
	}

	pub fn properties(&self) -> Option<&Properties> {
		self.properties.as_ref()
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}
}

fn validate_distinct_id(distinct_id: String) -> Result<String, EventError> {
	if distinct_id.trim().is_empty() {
		return Err(EventError::MissingDistinctId);
	}
	Ok(distinct_id)
}
