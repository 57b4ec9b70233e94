// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: vendor defaults, TOML files and environment
//! variables.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::{BackendConfig, BackendConfigLayer};
use crate::error::ConfigError;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// A place backend configuration can come from.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self, backend: &str) -> Result<BackendConfigLayer, ConfigError>;
}

/// Built-in defaults, usually supplied by the vendor adapter.
pub struct DefaultsSource {
	layer: BackendConfigLayer,
}

impl DefaultsSource {
	pub fn new(layer: BackendConfigLayer) -> Self {
		Self { layer }
	}
}

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self, _backend: &str) -> Result<BackendConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(self.layer.clone())
	}
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
	#[serde(default)]
	backends: BTreeMap<String, BackendConfigLayer>,
}

/// TOML file with one `[backends.<name>]` table per backend.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	fn read(&self) -> Result<ConfigFile, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ConfigFile::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Io {
			path: self.path.clone(),
			source: e,
		})?;

		toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})
	}

	/// Names of every backend table in the file.
	pub fn backend_names(&self) -> Result<Vec<String>, ConfigError> {
		Ok(self.read()?.backends.into_keys().collect())
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self, backend: &str) -> Result<BackendConfigLayer, ConfigError> {
		let mut file = self.read()?;
		trace!(backend, "parsed config layer from TOML");
		Ok(file.backends.remove(backend).unwrap_or_default())
	}
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Environment variable source.
///
/// Convention: `BEACON_<BACKEND>_<FIELD>`, e.g. `BEACON_POSTHOG_API_KEY`.
pub struct EnvSource {
	lookup: EnvLookup,
}

impl EnvSource {
	pub fn new() -> Self {
		Self::with_lookup(|name| std::env::var(name).ok())
	}

	/// Reads variables through `lookup` instead of the process environment.
	pub fn with_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String> + Send + Sync + 'static,
	{
		Self {
			lookup: Box::new(lookup),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid numeric value '{v}'"),
			}),
			None => Ok(None),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

fn env_prefix(backend: &str) -> String {
	let normalized: String = backend
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() {
				c.to_ascii_uppercase()
			} else {
				'_'
			}
		})
		.collect();
	format!("BEACON_{normalized}")
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self, backend: &str) -> Result<BackendConfigLayer, ConfigError> {
		debug!(backend, "loading environment variables");
		let prefix = env_prefix(backend);
		let name = |field: &str| format!("{prefix}_{field}");

		Ok(BackendConfigLayer {
			base_url: self.var(&name("BASE_URL")),
			api_key: self.var(&name("API_KEY")),
			project_id: self.parse(&name("PROJECT_ID"))?,
			timeout_secs: self.parse(&name("TIMEOUT_SECS"))?,
			user_agent: self.var(&name("USER_AGENT")),
			auto_flush: self.bool(&name("AUTO_FLUSH")),
			flush_interval_secs: self.parse(&name("FLUSH_INTERVAL_SECS"))?,
			max_queue_size: self.parse(&name("MAX_QUEUE_SIZE"))?,
			client_ip: self.var(&name("CLIENT_IP")),
			rejection_policy: None,
			failed_batch_policy: None,
		})
	}
}

/// Loads one backend's configuration from `sources`, lowest precedence
/// first, and finalizes it.
pub fn load_backend_config(
	backend: &str,
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<BackendConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = BackendConfigLayer::default();
	for source in sources {
		debug!(backend, source = source.name(), "loading configuration source");
		merged.merge(source.load(backend)?);
	}

	merged.finalize(backend)
}
