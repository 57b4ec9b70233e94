// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! PostHog backend for Beacon analytics.
//!
//! Events are posted in batches to `/capture/` with the project API key in
//! the body. Structured properties map to PostHog's reserved `$` keys
//! (`$device_id`, `$ip`, `$geoip_*`, `$os`), user properties are sent under
//! `$set`, and sessions use a `{uuid}_{uuid}` id.

mod backend;
mod wire;

pub use backend::{PosthogBackend, CAPTURE_PATH, DEFAULT_BASE_URL};
