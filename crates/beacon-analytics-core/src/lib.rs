// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Beacon product analytics.
//!
//! This crate holds the vendor-neutral data model shared by the batching
//! engine and the backend adapters:
//!
//! - [`Event`]: an immutable, validated analytics event
//! - [`CaptureArgs`] / [`IdentifyArgs`]: typed producer-facing arguments
//! - [`Properties`]: the structured property bag with an extension map
//! - [`SystemInfo`]: a host snapshot used to seed default properties
//! - [`BatchResult`] / [`Flushed`]: outcomes of a send or flush

pub mod args;
pub mod batch;
pub mod error;
pub mod event;
pub mod properties;
pub mod system_info;

pub use args::{CaptureArgs, EventArgs, IdentifyArgs};
pub use batch::{BatchResult, Flushed};
pub use error::EventError;
pub use event::{Event, EventKind, ALIAS_EVENT_NAME, IDENTIFY_EVENT_NAME};
pub use properties::{EventProperties, Properties, SessionId, UserProperties};
pub use system_info::SystemInfo;
