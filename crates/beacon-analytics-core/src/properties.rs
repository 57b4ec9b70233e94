// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The property bag attached to analytics events.
//!
//! A [`Properties`] value is a structured record of the fields every backend
//! understands (identity, device, geo, OS) plus two nested sub-objects,
//! [`EventProperties`] and [`UserProperties`], and a free-form extension map
//! for vendor-specific keys. Backends decide how each field is named on the
//! wire; the core only copies and merges bags.
//!
//! # Merging
//!
//! [`Properties::merge`] is right-biased and null-skipping: a value present in
//! the right-hand bag replaces the left-hand one, while a missing (`None`) or
//! JSON `null` right-hand value leaves the left-hand value in place.
//!
//! ```
//! use beacon_analytics_core::Properties;
//! use serde_json::json;
//!
//! let defaults = Properties::new().insert("plan", "free").insert("tier", 1);
//! let caller = Properties::new().insert("plan", "pro");
//!
//! let merged = caller.merged_over(&defaults);
//! assert_eq!(merged.get_item("plan"), Some(&json!("pro")));
//! assert_eq!(merged.get_item("tier"), Some(&json!(1)));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::system_info::SystemInfo;

/// Session identifier. PostHog uses strings, Amplitude uses integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionId {
	Text(String),
	Number(i64),
}

impl From<String> for SessionId {
	fn from(value: String) -> Self {
		SessionId::Text(value)
	}
}

impl From<&str> for SessionId {
	fn from(value: &str) -> Self {
		SessionId::Text(value.to_string())
	}
}

impl From<i64> for SessionId {
	fn from(value: i64) -> Self {
		SessionId::Number(value)
	}
}

impl From<SessionId> for Value {
	fn from(id: SessionId) -> Self {
		match id {
			SessionId::Text(s) => Value::String(s),
			SessionId::Number(n) => Value::Number(n.into()),
		}
	}
}

fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
	over.clone().or_else(|| base.clone())
}

fn merge_map(base: &mut Map<String, Value>, over: &Map<String, Value>) {
	for (k, v) in over {
		if !v.is_null() {
			base.insert(k.clone(), v.clone());
		}
	}
}

/// Properties describing where an event happened (platform, product, screen).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventProperties {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform_version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform_architecture: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub screen_width: Option<i32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub screen_height: Option<i32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub viewport_width: Option<i32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub viewport_height: Option<i32>,
	/// Vendor- or application-specific extra keys.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl EventProperties {
	/// Sets an extension key, returning `self` for chaining.
	pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		self.extra.insert(key.into(), value.into());
		self
	}

	pub fn get_item(&self, key: &str) -> Option<&Value> {
		self.extra.get(key)
	}

	/// Right-biased, null-skipping merge; see the module docs.
	pub fn merge(mut self, other: &EventProperties) -> Self {
		self.platform_name = pick(&other.platform_name, &self.platform_name);
		self.platform_version = pick(&other.platform_version, &self.platform_version);
		self.platform_architecture = pick(&other.platform_architecture, &self.platform_architecture);
		self.product_name = pick(&other.product_name, &self.product_name);
		self.product_version = pick(&other.product_version, &self.product_version);
		self.screen_width = pick(&other.screen_width, &self.screen_width);
		self.screen_height = pick(&other.screen_height, &self.screen_height);
		self.viewport_width = pick(&other.viewport_width, &self.viewport_width);
		self.viewport_height = pick(&other.viewport_height, &self.viewport_height);
		merge_map(&mut self.extra, &other.extra);
		self
	}

	/// Flattens the record into a JSON object using snake_case keys.
	pub fn to_map(&self) -> Map<String, Value> {
		match serde_json::to_value(self) {
			Ok(Value::Object(map)) => map,
			_ => Map::new(),
		}
	}
}

/// Properties describing the user (account, locale, product).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProperties {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform_account_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform_account_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sdk_region_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sdk_region_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sdk_language: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sdk_os_architecture: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sdk_time_zone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_user_email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub product_version: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl UserProperties {
	/// User properties seeded from the host snapshot (`sdk_*` fields).
	pub fn from_system_info(info: &SystemInfo) -> Self {
		Self {
			sdk_region_id: info.region_id.clone(),
			sdk_region_name: info.region_name.clone(),
			sdk_language: info.language.clone(),
			sdk_os_architecture: info.os_architecture.clone(),
			sdk_time_zone: info.time_zone.clone(),
			..Default::default()
		}
	}

	pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		self.extra.insert(key.into(), value.into());
		self
	}

	pub fn get_item(&self, key: &str) -> Option<&Value> {
		self.extra.get(key)
	}

	/// Right-biased, null-skipping merge; see the module docs.
	pub fn merge(mut self, other: &UserProperties) -> Self {
		self.platform_account_id = pick(&other.platform_account_id, &self.platform_account_id);
		self.platform_account_name = pick(&other.platform_account_name, &self.platform_account_name);
		self.sdk_region_id = pick(&other.sdk_region_id, &self.sdk_region_id);
		self.sdk_region_name = pick(&other.sdk_region_name, &self.sdk_region_name);
		self.sdk_language = pick(&other.sdk_language, &self.sdk_language);
		self.sdk_os_architecture = pick(&other.sdk_os_architecture, &self.sdk_os_architecture);
		self.sdk_time_zone = pick(&other.sdk_time_zone, &self.sdk_time_zone);
		self.product_user_email = pick(&other.product_user_email, &self.product_user_email);
		self.product_version = pick(&other.product_version, &self.product_version);
		merge_map(&mut self.extra, &other.extra);
		self
	}

	pub fn to_map(&self) -> Map<String, Value> {
		match serde_json::to_value(self) {
			Ok(Value::Object(map)) => map,
			_ => Map::new(),
		}
	}
}

/// The property bag attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub session_id: Option<SessionId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_id: Option<String>,
	/// Client IP, e.g. `127.0.0.1`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ip_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub city_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub continent_code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub continent_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country_code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub latitude: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub longitude: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subdivision_code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subdivision_name: Option<String>,
	/// IANA time zone, e.g. `Asia/Seoul`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub time_zone: Option<String>,
	/// OS family: `Windows`, `OSX`, `Linux`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub os: Option<String>,
	/// OS and architecture, e.g. `linux-x86_64`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub os_name: Option<String>,
	#[serde(default)]
	pub event_properties: EventProperties,
	#[serde(default)]
	pub user_properties: UserProperties,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Properties {
	/// Creates an empty bag.
	pub fn new() -> Self {
		Self::default()
	}

	/// A bag seeded from the host snapshot: `os`, `os_name` and the `sdk_*`
	/// user properties.
	pub fn from_system_info(info: &SystemInfo) -> Self {
		Self {
			os: info.os.clone(),
			os_name: info.os_name.clone(),
			user_properties: UserProperties::from_system_info(info),
			..Default::default()
		}
	}

	/// Inserts an extension key (builder style).
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		self.extra.insert(key.into(), value.into());
		self
	}

	/// Sets an extension key in place.
	pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
		self.extra.insert(key.into(), value.into());
		self
	}

	/// Gets an extension key.
	pub fn get_item(&self, key: &str) -> Option<&Value> {
		self.extra.get(key)
	}

	/// Merges `other` into this bag. Values present in `other` win; missing
	/// or `null` values in `other` keep what this bag already has.
	pub fn merge(mut self, other: &Properties) -> Self {
		self.user_id = pick(&other.user_id, &self.user_id);
		self.session_id = pick(&other.session_id, &self.session_id);
		self.device_id = pick(&other.device_id, &self.device_id);
		self.ip_address = pick(&other.ip_address, &self.ip_address);
		self.city_name = pick(&other.city_name, &self.city_name);
		self.continent_code = pick(&other.continent_code, &self.continent_code);
		self.continent_name = pick(&other.continent_name, &self.continent_name);
		self.country_code = pick(&other.country_code, &self.country_code);
		self.country_name = pick(&other.country_name, &self.country_name);
		self.latitude = pick(&other.latitude, &self.latitude);
		self.longitude = pick(&other.longitude, &self.longitude);
		self.subdivision_code = pick(&other.subdivision_code, &self.subdivision_code);
		self.subdivision_name = pick(&other.subdivision_name, &self.subdivision_name);
		self.time_zone = pick(&other.time_zone, &self.time_zone);
		self.os = pick(&other.os, &self.os);
		self.os_name = pick(&other.os_name, &self.os_name);
		self.event_properties = self.event_properties.merge(&other.event_properties);
		self.user_properties = self.user_properties.merge(&other.user_properties);
		merge_map(&mut self.extra, &other.extra);
		self
	}

	/// Layers this (caller) bag over `defaults`, returning a new bag.
	pub fn merged_over(&self, defaults: &Properties) -> Properties {
		defaults.clone().merge(self)
	}
}
