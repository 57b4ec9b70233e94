// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use beacon_analytics::{
	load_backend_config, AnalyticsApi, BackendClient, BackendConfigLayer, ConfigSource,
	DefaultsSource, EnvSource, TomlSource,
};
use beacon_analytics_amplitude::AmplitudeBackend;
use beacon_analytics_core::SystemInfo;
use beacon_analytics_posthog::PosthogBackend;
use tracing::warn;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vendor {
	Posthog,
	Amplitude,
}

impl Vendor {
	pub fn name(self) -> &'static str {
		match self {
			Vendor::Posthog => "posthog",
			Vendor::Amplitude => "amplitude",
		}
	}

	fn from_name(name: &str) -> Option<Self> {
		match name {
			"posthog" => Some(Vendor::Posthog),
			"amplitude" => Some(Vendor::Amplitude),
			_ => None,
		}
	}

	fn defaults(self) -> BackendConfigLayer {
		match self {
			Vendor::Posthog => PosthogBackend::defaults_layer(),
			Vendor::Amplitude => AmplitudeBackend::defaults_layer(),
		}
	}
}

/// The backends to send to: the ones asked for on the command line, or
/// every known backend the config file has a table for.
pub fn select(requested: &[Vendor], config: Option<&Path>) -> Result<Vec<Vendor>> {
	let mut vendors = Vec::new();

	if !requested.is_empty() {
		for vendor in requested {
			if !vendors.contains(vendor) {
				vendors.push(*vendor);
			}
		}
	} else if let Some(path) = config {
		let names = TomlSource::new(path)
			.backend_names()
			.with_context(|| format!("failed to read {}", path.display()))?;
		for name in names {
			match Vendor::from_name(&name) {
				Some(vendor) => vendors.push(vendor),
				None => warn!(backend = %name, "unknown backend in config file, skipping"),
			}
		}
	}

	if vendors.is_empty() {
		bail!("no backends selected; pass --backend or add a [backends.<name>] table to the config file");
	}
	Ok(vendors)
}

fn sources(vendor: Vendor, config: Option<&Path>) -> Vec<Box<dyn ConfigSource>> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource::new(vendor.defaults())),
		Box::new(EnvSource::new()),
	];
	if let Some(path) = config {
		sources.push(Box::new(TomlSource::new(path)));
	}
	sources
}

/// Loads the backend's configuration and starts its client.
pub fn build(
	vendor: Vendor,
	config: Option<&Path>,
	system: &SystemInfo,
) -> Result<Arc<dyn AnalyticsApi>> {
	let name = vendor.name();
	let backend_config = load_backend_config(name, sources(vendor, config))
		.with_context(|| format!("invalid configuration for {name}"))?;

	let client: Arc<dyn AnalyticsApi> = match vendor {
		Vendor::Posthog => Arc::new(BackendClient::new(PosthogBackend::new(), backend_config, system)?),
		Vendor::Amplitude => {
			Arc::new(BackendClient::new(AmplitudeBackend::new(), backend_config, system)?)
		}
	};
	Ok(client)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn config_file(contents: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file
	}

	#[test]
	fn test_requested_backends_are_deduplicated() {
		let vendors = select(&[Vendor::Amplitude, Vendor::Posthog, Vendor::Amplitude], None).unwrap();
		assert_eq!(vendors, vec![Vendor::Amplitude, Vendor::Posthog]);
	}

	#[test]
	fn test_backends_come_from_config_file() {
		let file = config_file(
			r#"
[backends.posthog]
api_key = "phc_test"
project_id = 1

[backends.mixpanel]
api_key = "mp_test"
"#,
		);

		let vendors = select(&[], Some(file.path())).unwrap();

		assert_eq!(vendors, vec![Vendor::Posthog]);
	}

	#[test]
	fn test_nothing_selected_is_an_error() {
		assert!(select(&[], None).is_err());
	}
}
