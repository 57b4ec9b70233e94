// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! PostHog `/capture/` request body.
//!
//! ```json
//! {
//!   "api_key": "phc_...",
//!   "batch": [
//!     {
//!       "event": "Button Clicked",
//!       "properties": { "distinct_id": "user-1", "$os": "Linux", "$set": { ... } },
//!       "timestamp": "2024-05-01T12:00:00.000Z"
//!     }
//!   ]
//! }
//! ```

use beacon_analytics_core::{Event, Properties};
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub(crate) struct CaptureBody<'a> {
	pub api_key: &'a str,
	pub batch: Vec<BatchItem<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchItem<'a> {
	pub event: &'a str,
	pub properties: Map<String, Value>,
	pub timestamp: String,
}

impl<'a> BatchItem<'a> {
	pub fn from_event(event: &'a Event) -> Self {
		Self {
			event: event.name(),
			properties: properties_json(event.distinct_id(), event.properties()),
			timestamp: event
				.created_at()
				.to_rfc3339_opts(SecondsFormat::Millis, true),
		}
	}
}

fn put(map: &mut Map<String, Value>, key: &str, value: Option<impl Into<Value>>) {
	if let Some(value) = value {
		map.insert(key.to_string(), value.into());
	}
}

/// Maps a property bag onto PostHog's `$`-prefixed keys. Event properties
/// are flattened; user properties go under `$set`.
pub(crate) fn properties_json(distinct_id: &str, properties: Option<&Properties>) -> Map<String, Value> {
	let mut map = Map::new();

	if let Some(props) = properties {
		map.extend(props.extra.clone());
		map.extend(props.event_properties.to_map());

		put(&mut map, "$session_id", props.session_id.clone());
		put(&mut map, "$device_id", props.device_id.clone());
		put(&mut map, "$ip", props.ip_address.clone());
		put(&mut map, "$geoip_city_name", props.city_name.clone());
		put(&mut map, "$geoip_continent_code", props.continent_code.clone());
		put(&mut map, "$geoip_continent_name", props.continent_name.clone());
		put(&mut map, "$geoip_country_code", props.country_code.clone());
		put(&mut map, "$geoip_country_name", props.country_name.clone());
		put(&mut map, "$geoip_latitude", props.latitude);
		put(&mut map, "$geoip_longitude", props.longitude);
		put(&mut map, "$geoip_subdivision_1_code", props.subdivision_code.clone());
		put(&mut map, "$geoip_subdivision_1_name", props.subdivision_name.clone());
		put(&mut map, "$geoip_time_zone", props.time_zone.clone());
		put(&mut map, "$os", props.os.clone());
		put(&mut map, "$os_name", props.os_name.clone());

		let user = props.user_properties.to_map();
		if !user.is_empty() {
			map.insert("$set".to_string(), Value::Object(user));
		}
	}

	map.insert("distinct_id".to_string(), Value::String(distinct_id.to_string()));
	map
}
