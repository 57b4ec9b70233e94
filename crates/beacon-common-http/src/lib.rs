// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Beacon.
//!
//! Every analytics backend talks JSON over its own `reqwest::Client`; this
//! crate builds those clients with a consistent User-Agent, `Accept` header
//! and timeout.

mod client;

pub use client::{builder_with_user_agent, new_client, user_agent, ClientOptions};
