// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-side analytics pipeline for Beacon.
//!
//! Producers enqueue events; each backend client buffers them in its own
//! queue and ships them in batches, on a timer or on demand. A dispatcher
//! broadcasts one logical event to several independently configured
//! backends.
//!
//! # Overview
//!
//! - [`EventQueue`]: ordered, lock-protected buffer of pending events
//! - [`FlushCoordinator`]: single-flight flush and the auto-flush timer
//! - [`Backend`]: the vendor adapter contract (endpoint, wire body, session ids)
//! - [`BackendClient`]: queue + coordinator + transport for one backend
//! - [`AnalyticsDispatcher`]: fan-out over several [`AnalyticsApi`] clients
//! - [`BackendConfig`]: per-backend settings, loaded via [`load_backend_config`]
//!
//! # Failure handling
//!
//! Sending never returns an error. A transport failure yields an
//! unsuccessful [`BatchResult`]; if the failed batch plus what is still
//! queued reaches `max_queue_size`, the whole queue is dropped. Whether
//! non-2xx responses count as delivered and whether failed batches are
//! requeued are configurable through [`RejectionPolicy`] and
//! [`FailedBatchPolicy`].
//!
//! # Example
//!
//! ```ignore
//! use beacon_analytics::{AnalyticsDispatcher, BackendClient, BackendConfig};
//! use beacon_analytics_core::{CaptureArgs, SystemInfo};
//! use beacon_analytics_posthog::PosthogBackend;
//! use std::sync::Arc;
//!
//! let system = SystemInfo::detect();
//! let posthog = BackendClient::new(
//!     PosthogBackend::new(),
//!     BackendConfig::new("https://app.posthog.com", "phc_xxx").with_project_id(1),
//!     &system,
//! )?;
//!
//! let dispatcher = AnalyticsDispatcher::builder()
//!     .backend(Arc::new(posthog))
//!     .build()?;
//! dispatcher.initialize();
//!
//! dispatcher.capture(CaptureArgs::new("App Started").distinct_id("user-1"))?;
//!
//! dispatcher.shutdown().await;
//! ```

pub mod api;
pub mod backend;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flush;
pub mod queue;
pub mod sources;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::AnalyticsApi;
pub use backend::Backend;
pub use client::BackendClient;
pub use config::{
	ApiKey, BackendConfig, BackendConfigLayer, FailedBatchPolicy, RejectionPolicy,
	DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_TIMEOUT,
};
pub use dispatcher::{AnalyticsDispatcher, AnalyticsDispatcherBuilder, DispatchProperties};
pub use error::{AnalyticsError, ConfigError, Result, TransportError};
pub use flush::{BatchSender, FlushCoordinator};
pub use queue::EventQueue;
pub use sources::{
	load_backend_config, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource,
};
pub use transport::{HttpTransport, Transport, TransportResponse};

pub use beacon_analytics_core::{
	BatchResult, CaptureArgs, Event, EventArgs, EventError, EventKind, EventProperties, Flushed,
	IdentifyArgs, Properties, SessionId, SystemInfo, UserProperties,
};
