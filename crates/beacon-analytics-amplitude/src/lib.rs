// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Amplitude backend for Beacon analytics.
//!
//! Events are posted to the HTTP V2 API (`/2/httpapi`) as flat objects:
//! `event_type`, `user_id` and `time` in epoch milliseconds, with the
//! structured properties renamed to Amplitude's fields. Sessions are
//! random 32-bit integers.

mod backend;
mod wire;

pub use backend::{AmplitudeBackend, DEFAULT_BASE_URL, HTTP_API_PATH};
