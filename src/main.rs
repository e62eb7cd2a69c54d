//! The plugin registry server binary.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use plugin_registry::{Config, API};

mod logging;

fn main() -> anyhow::Result<ExitCode> {
	dotenvy::dotenv().ok();

	match Args::parse().action {
		Action::Serve => serve(),
		Action::Refresh => refresh(),
		Action::Spec => {
			print!("{}", API::spec());
			Ok(ExitCode::SUCCESS)
		}
	}
}

#[tokio::main]
async fn serve() -> anyhow::Result<ExitCode> {
	let _guard = logging::init().context("initialize logging")?;

	let config = Config::new().context("load configuration")?;

	API::run(config).await.context("run server")?;

	Ok(ExitCode::SUCCESS)
}

/// Refreshes every known plugin's release index without going through the HTTP `PUT` routes.
/// Useful for cron-triggered bulk refreshes that shouldn't depend on the admin token making it
/// onto whatever box is running the job.
#[tokio::main]
async fn refresh() -> anyhow::Result<ExitCode> {
	let _guard = logging::init().context("initialize logging")?;

	let config = Config::new().context("load configuration")?;
	let failures = API::refresh_all(config).await.context("refresh plugins")?;

	if failures > 0 {
		tracing::error!(failures, "refresh finished with errors");
		return Ok(ExitCode::FAILURE);
	}

	tracing::info!("refresh finished");

	Ok(ExitCode::SUCCESS)
}

/// Plugin Registry
///
/// This is the server binary that will run the API. You can configure it by setting
/// environment variables, as described in [`Config`].
#[derive(Debug, Parser)]
struct Args {
	/// The action you want to perform.
	#[command(subcommand)]
	action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
	/// Serve the API.
	Serve,

	/// Refresh every known plugin's release index and exit.
	Refresh,

	/// Print the API's OpenAPI schema to stdout.
	Spec,
}
