// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::Value;

/// Parses `KEY=VALUE`. The value is read as JSON when it parses as JSON
/// (`seats=2`, `beta=true`), otherwise it is kept as a string.
pub fn parse_prop(raw: &str) -> Result<(String, Value), String> {
	let (key, value) = raw
		.split_once('=')
		.ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
	let key = key.trim();
	if key.is_empty() {
		return Err(format!("empty key in `{raw}`"));
	}
	let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
	Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_parses_json_values() {
		assert_eq!(parse_prop("seats=2").unwrap(), ("seats".into(), json!(2)));
		assert_eq!(parse_prop("beta=true").unwrap(), ("beta".into(), json!(true)));
		assert_eq!(
			parse_prop(r#"tags=["a","b"]"#).unwrap(),
			("tags".into(), json!(["a", "b"]))
		);
	}

	#[test]
	fn test_falls_back_to_string() {
		assert_eq!(parse_prop("plan=pro").unwrap(), ("plan".into(), json!("pro")));
		assert_eq!(parse_prop("url=a=b").unwrap(), ("url".into(), json!("a=b")));
		assert_eq!(parse_prop("note=").unwrap(), ("note".into(), json!("")));
	}

	#[test]
	fn test_rejects_malformed() {
		assert!(parse_prop("plan").is_err());
		assert!(parse_prop("=pro").is_err());
	}
}
