// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Beacon CLI - send analytics events from the command line
//!
//! Loads backend configuration from an optional TOML file and `BEACON_*`
//! environment variables, sends one event through every selected backend,
//! flushes, and prints the per-backend results as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use beacon_analytics::{AnalyticsDispatcher, DispatchProperties};
use beacon_analytics_core::{CaptureArgs, IdentifyArgs, SystemInfo};

mod backends;
mod props;

use backends::Vendor;

/// Beacon - send analytics events
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about, long_about = None)]
struct Args {
	/// Path to a TOML file with `[backends.<name>]` tables
	#[arg(short, long, env = "BEACON_CONFIG")]
	config: Option<PathBuf>,

	/// Backend to send to (repeatable; defaults to every backend in the config file)
	#[arg(short, long = "backend", value_enum)]
	backends: Vec<Vendor>,

	/// Output logs as JSON
	#[arg(long)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Capture a named event
	Capture {
		/// Event name
		event: String,
		/// User the event belongs to
		#[arg(short, long)]
		distinct_id: String,
		/// Event property (repeatable: -p KEY=VALUE)
		#[arg(short = 'p', long = "prop", value_name = "KEY=VALUE", value_parser = props::parse_prop)]
		props: Vec<(String, Value)>,
	},
	/// Identify a user and set user properties
	Identify {
		/// User to identify
		distinct_id: String,
		/// User property (repeatable: -p KEY=VALUE)
		#[arg(short = 'p', long = "prop", value_name = "KEY=VALUE", value_parser = props::parse_prop)]
		props: Vec<(String, Value)>,
	},
}

fn init_tracing(json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beacon=info"));

	if json {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().json().with_writer(std::io::stderr))
			.init();
	} else {
		tracing_subscriber::registry()
			.with(filter)
			.with(fmt::layer().compact().with_writer(std::io::stderr))
			.init();
	}
}

fn send(dispatcher: &AnalyticsDispatcher, command: Command) -> Result<()> {
	let mut properties: DispatchProperties = dispatcher.create_properties();

	match command {
		Command::Capture {
			event,
			distinct_id,
			props,
		} => {
			for (key, value) in props {
				properties.set_item(key, value);
			}
			dispatcher
				.capture(
					CaptureArgs::new(event)
						.distinct_id(distinct_id)
						.properties(properties),
				)
				.context("invalid capture event")?;
		}
		Command::Identify { distinct_id, props } => {
			for (key, value) in props {
				properties.for_each_mut(|_, bag| {
					bag.user_properties.set_item(key.clone(), value.clone());
				});
			}
			dispatcher
				.identify(IdentifyArgs::new(distinct_id).properties(properties))
				.context("invalid identify event")?;
		}
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(args.json_logs);

	let system = SystemInfo::detect();
	let config = args.config.as_deref();

	let mut builder = AnalyticsDispatcher::builder();
	for vendor in backends::select(&args.backends, config)? {
		builder = builder.backend(backends::build(vendor, config, &system)?);
	}
	let dispatcher = builder.build()?;
	dispatcher.initialize();

	send(&dispatcher, args.command)?;

	let results = dispatcher.flush().await;
	dispatcher.shutdown().await;

	let mut failed = Vec::new();
	for (backend, result) in &results {
		if result.success {
			info!(backend = %backend, sent = result.sent_count, "delivered");
		} else {
			error!(backend = %backend, "delivery failed");
			failed.push(backend.as_str());
		}
	}
	println!("{}", serde_json::to_string_pretty(&results)?);

	if !failed.is_empty() {
		bail!("delivery failed for {}", failed.join(", "));
	}
	Ok(())
}
