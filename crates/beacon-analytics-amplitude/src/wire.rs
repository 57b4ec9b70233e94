// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Amplitude HTTP V2 request body.
//!
//! ```json
//! {
//!   "api_key": "...",
//!   "events": [
//!     {
//!       "event_type": "Button Clicked",
//!       "user_id": "user-1",
//!       "time": 1714564800000,
//!       "session_id": 1234,
//!       "os": "Linux",
//!       "event_properties": { ... },
//!       "user_properties": { ... }
//!     }
//!   ]
//! }
//! ```
//!
//! Continent, country code, subdivision code and time zone have no
//! Amplitude field and are not sent.

use beacon_analytics_core::{Event, EventKind, Properties};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub(crate) struct HttpApiBody<'a> {
	pub api_key: &'a str,
	pub events: Vec<Map<String, Value>>,
}

fn put(map: &mut Map<String, Value>, key: &str, value: Option<impl Into<Value>>) {
	if let Some(value) = value {
		map.insert(key.to_string(), value.into());
	}
}

/// One flat event object. Identify events carry no `time`.
pub(crate) fn event_json(event: &Event) -> Map<String, Value> {
	let mut map = Map::new();

	if let Some(props) = event.properties() {
		map.extend(props.extra.clone());
		put_properties(&mut map, props);
	}

	map.insert("event_type".to_string(), Value::from(event.name()));
	map.insert("user_id".to_string(), Value::from(event.distinct_id()));
	if event.kind() != EventKind::Identify {
		map.insert(
			"time".to_string(),
			Value::from(event.created_at().timestamp_millis()),
		);
	}
	map
}

fn put_properties(map: &mut Map<String, Value>, props: &Properties) {
	put(map, "session_id", props.session_id.clone());
	put(map, "device_id", props.device_id.clone());
	put(map, "ip_address", props.ip_address.clone());
	put(map, "city", props.city_name.clone());
	put(map, "country", props.country_name.clone());
	put(map, "location_lat", props.latitude);
	put(map, "location_lng", props.longitude);
	put(map, "region", props.subdivision_name.clone());
	put(map, "os", props.os.clone());
	put(map, "os_name", props.os_name.clone());
	map.insert(
		"event_properties".to_string(),
		Value::Object(props.event_properties.to_map()),
	);
	map.insert(
		"user_properties".to_string(),
		Value::Object(props.user_properties.to_map()),
	);
}
