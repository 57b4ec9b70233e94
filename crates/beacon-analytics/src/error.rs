// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.

use std::path::PathBuf;

use beacon_analytics_core::EventError;
use thiserror::Error;

/// Errors surfaced while constructing clients and dispatchers.
///
/// Sending never returns these: transport and remote failures are folded
/// into [`BatchResult`](beacon_analytics_core::BatchResult) instead.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// Backend configuration is missing or invalid.
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	/// The HTTP client could not be built.
	#[error("failed to build HTTP client: {0}")]
	HttpClient(#[from] reqwest::Error),

	/// Two backends were registered under the same name.
	#[error("backend '{0}' is registered more than once")]
	DuplicateBackend(String),

	/// Producer input was invalid.
	#[error("invalid event: {0}")]
	Event(#[from] EventError),
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Failures reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
	/// Connection refused, DNS failure, timeout or a request that could not
	/// be sent. These trigger the failed-batch handling.
	#[error("network error: {0}")]
	Network(String),

	/// Anything else. Logged and swallowed.
	#[error("unexpected transport error: {0}")]
	Unexpected(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("missing required configuration: {key}")]
	MissingField { key: String },

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("failed to read config file {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config file {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
}
