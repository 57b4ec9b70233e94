// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host information used to seed default properties.
//!
//! The snapshot is computed once (usually at startup) and passed to each
//! backend, so nothing in the pipeline reads ambient global state.

use serde::{Deserialize, Serialize};

/// Read-only snapshot of the host environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
	/// OS family: `Windows`, `OSX`, `Linux` or `Unknown`.
	pub os: Option<String>,
	/// `{os}-{arch}`, e.g. `linux-x86_64`.
	pub os_name: Option<String>,
	/// CPU architecture, e.g. `X64`, `Arm64`.
	pub os_architecture: Option<String>,
	/// Locale tag, e.g. `ko-KR`.
	pub region_id: Option<String>,
	/// Region part of the locale, e.g. `KR`.
	pub region_name: Option<String>,
	/// Language part of the locale, e.g. `ko`.
	pub language: Option<String>,
	/// IANA time zone from `TZ`, e.g. `Asia/Seoul`.
	pub time_zone: Option<String>,
}

impl SystemInfo {
	/// Detects the current host using the process environment.
	pub fn detect() -> Self {
		Self::from_env_lookup(|key| std::env::var(key).ok())
	}

	/// Detects the host using `lookup` for environment variables.
	pub fn from_env_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let os = std::env::consts::OS;
		let arch = std::env::consts::ARCH;

		let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
			.iter()
			.filter_map(|key| lookup(key))
			.find(|value| !value.is_empty())
			.and_then(|value| parse_locale(&value));

		let time_zone = lookup("TZ")
			.map(|tz| tz.trim_start_matches(':').to_string())
			.filter(|tz| !tz.is_empty());

		Self {
			os: Some(os_family(os).to_string()),
			os_name: Some(format!("{os}-{arch}")),
			os_architecture: Some(architecture(arch).to_string()),
			region_id: locale.as_ref().map(|l| l.tag.clone()),
			region_name: locale.as_ref().and_then(|l| l.region.clone()),
			language: locale.map(|l| l.language),
			time_zone,
		}
	}
}

fn os_family(os: &str) -> &'static str {
	match os {
		"windows" => "Windows",
		"macos" => "OSX",
		"linux" => "Linux",
		_ => "Unknown",
	}
}

fn architecture(arch: &str) -> &str {
	match arch {
		"x86_64" => "X64",
		"x86" => "X86",
		"aarch64" => "Arm64",
		"arm" => "Arm",
		other => other,
	}
}

struct Locale {
	tag: String,
	language: String,
	region: Option<String>,
}

/// Parses POSIX locale strings such as `ko_KR.UTF-8` or `en_US@euro`.
fn parse_locale(raw: &str) -> Option<Locale> {
	let base = raw.split(['.', '@']).next()?.trim();
	if base.is_empty() || base == "C" || base == "POSIX" {
		return None;
	}

	let mut parts = base.split(['_', '-']);
	let language = parts.next()?.to_lowercase();
	let region = parts.next().map(|r| r.to_uppercase());
	let tag = match &region {
		Some(region) => format!("{language}-{region}"),
		None => language.clone(),
	};

	Some(Locale {
		tag,
		language,
		region,
	})
}
