//! Logging setup for the `serve` binary.
//!
//! Two layers: one pretty-printed to stderr for local development, one compact and
//! newline-delimited written to `LOG_DIR` (defaulting to `/var/log/plugin-registry`) for
//! anything tagged `audit_log` or `plugin_registry`.

use std::io;
use std::path::PathBuf;
use std::{env, fs};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initializes the global tracing subscriber. The returned [`WorkerGuard`] must be kept alive
/// for the lifetime of the process so the non-blocking file writer flushes on shutdown.
pub fn init() -> anyhow::Result<WorkerGuard> {
	let (files_layer, guard, log_dir) = files_layer().context("build files layer")?;

	let registry = tracing_subscriber::registry().with(stderr_layer()).with(files_layer);

	#[cfg(feature = "console")]
	let registry = registry.with(console_subscriber::spawn().with_filter(EnvFilter::new("tokio=trace")));

	registry.init();

	tracing::info!(target: "audit_log", dir = %log_dir.display(), "initialized logging");

	Ok(guard)
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
	S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
	tracing_subscriber::fmt::layer()
		.with_target(true)
		.with_writer(io::stderr)
		.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
		.pretty()
		.with_filter(EnvFilter::from_default_env())
}

fn files_layer<S>() -> anyhow::Result<(impl tracing_subscriber::Layer<S>, WorkerGuard, PathBuf)>
where
	S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
	let log_dir = env::var("LOG_DIR").map_or_else(|_| PathBuf::from("/var/log/plugin-registry"), PathBuf::from);

	if !log_dir.exists() {
		fs::create_dir_all(&log_dir).context("create log dir")?;
	}

	let log_dir = log_dir.canonicalize().context("canonicalize log dir path")?;

	let (writer, guard) = tracing_appender::rolling::Builder::new()
		.rotation(Rotation::DAILY)
		.filename_suffix("log")
		.build(&log_dir)
		.map(tracing_appender::non_blocking)
		.context("initialize rolling file appender")?;

	let layer = tracing_subscriber::fmt::layer()
		.with_target(true)
		.with_writer(writer)
		.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
		.compact()
		.with_ansi(false)
		.with_filter(FilterFn::new(|metadata| {
			metadata.target().starts_with("audit_log") || metadata.target().starts_with("plugin_registry")
		}));

	Ok((layer, guard, log_dir))
}
