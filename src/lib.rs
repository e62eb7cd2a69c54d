//! The plugin registry: an HTTP service that tracks `go-semantic-release` plugin releases,
//! resolves version constraints, and materializes batch-download archives.
//!
//! See [`State`] for how the pieces (the index, the object store, the in-memory caches, the
//! concurrency gates) fit together, and [`plugin`] for the HTTP surface built on top of them.

use std::future::Future;

use anyhow::Context;
use axum::routing::{get, IntoMakeService};
use axum::serve::Serve;
use axum::Router;
use itertools::Itertools;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;

#[doc(inline)]
pub use error::{Error, Result};

mod config;

#[doc(inline)]
pub use config::Config;

mod state;

#[doc(inline)]
pub(crate) use state::State;

mod cache;
mod concurrency;

pub mod archive;
pub mod index;
pub mod middleware;
pub mod planner;
pub mod plugin;
pub mod refresher;
pub mod responses;

mod metrics;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, OpenApi)]
#[openapi(
	info(
		title = "Plugin Registry",
		description = "Tracks go-semantic-release plugin releases and serves resolved batch-download archives.",
		license(name = "MIT"),
	),
	paths(
		plugin::handlers::list::get,
		plugin::handlers::get::get_plugin,
		plugin::handlers::get::get_release,
		plugin::handlers::versions::get,
		plugin::handlers::batch::post_batch,
		plugin::handlers::update::update_all,
		plugin::handlers::update::update_one,
		plugin::handlers::update::update_version,
		plugin::handlers::cache_admin::delete,
		plugin::handlers::download::get,
	),
	components(
		schemas(
			registry_core::BatchRequest,
			registry_core::BatchRequestPlugin,
			registry_core::BatchResponse,
			registry_core::BatchResponsePlugin,
			registry_core::AssetRecord,
			registry_core::ReleaseRecord,
			registry_core::PluginView,
			registry_core::Checksum,
		),
	),
)]
#[allow(missing_docs)]
pub struct API;

impl API {
	/// Run the API.
	pub async fn run(config: Config) -> anyhow::Result<()> {
		Self::server(config)
			.await
			.context("build http server")?
			.with_graceful_shutdown(sigint())
			.await
			.context("run http server")
	}

	/// Run the API, until the given `until` future completes.
	pub async fn run_until<Until>(config: Config, until: Until) -> anyhow::Result<()>
	where
		Until: Future<Output = ()> + Send + 'static,
	{
		Self::server(config)
			.await
			.context("build http server")?
			.with_graceful_shutdown(async move {
				tokio::select! {
					() = until => {}
					() = sigint() => {}
				}
			})
			.await
			.context("run http server")
	}

	/// Creates a hyper server that will serve the API.
	async fn server(config: Config) -> anyhow::Result<Serve<IntoMakeService<Router>, Router>> {
		info!(target: "audit_log", ?config, "registry starting up");

		let tcp_listener = TcpListener::bind(config.socket_addr()).await.context("bind tcp socket")?;

		// NOTE: We intentionally **leak memory here**.
		//       The application is not going to do anything after axum shuts down, so
		//       there is no point in cleanup.
		let disable_metrics = config.disable_metrics;
		let state: &'static State = State::new(config).await.map(Box::new).map(Box::leak).context("initialize state")?;

		let openapi = Self::openapi();

		openapi
			.paths
			.paths
			.iter()
			.map(|(path, handler)| {
				let methods =
					handler.operations.keys().map(|method| format!("{method:?}").to_uppercase()).join(", ");

				format!("{path} [{methods}]")
			})
			.for_each(|route| debug!("registering route: {route}"));

		let (in_flight_requests, request_counter) = tower_http::metrics::InFlightRequestsLayer::pair();

		let downloads =
			Router::new().route("/:os/:arch/semantic-release", get(plugin::handlers::download::get)).with_state(state);

		let mut router = Router::new()
			.route("/", get(|| async { "(͡ ͡° ͜ つ ͡͡°)" }))
			.route("/ping", get(|| async { "pong" }))
			.nest("/api/v2/plugins", plugin::router(state))
			.nest("/downloads", downloads)
			.merge(SwaggerUi::new("/docs/swagger-ui").url("/docs/openapi.json", openapi));

		if !disable_metrics {
			router = router.nest("/metrics", metrics::router(state, request_counter));
		}

		let api_service = router
			.layer(in_flight_requests)
			.layer(middleware::logging::layer!())
			.layer(middleware::panic_handler::layer())
			.into_make_service();

		let address = tcp_listener.local_addr().context("get tcp addr")?;

		info! {
			target: "audit_log",
			%address,
			prod = cfg!(feature = "production"),
			"listening for requests",
		};

		Ok(axum::serve(tcp_listener, api_service))
	}

	/// Generates a JSON version of the OpenAPI spec.
	pub fn spec() -> String {
		Self::openapi().to_pretty_json().expect("spec is valid")
	}

	/// Refreshes every known plugin's release index without going through the HTTP `PUT`
	/// routes. Returns the number of plugins that failed to refresh.
	pub async fn refresh_all(config: Config) -> anyhow::Result<usize> {
		use futures::stream::{self, StreamExt};

		const REFRESH_CONCURRENCY: usize = 4;

		let state = State::new(config).await.context("initialize state")?;
		let refresher = refresher::Refresher::new(&state);

		let failures = stream::iter(registry_core::descriptor::PLUGINS.iter())
			.map(|plugin| {
				let refresher = &refresher;
				async move {
					refresher.update_all(plugin).await.inspect_err(
						|err| tracing::error!(plugin = plugin.full_name(), %err, "refresh failed"),
					)
				}
			})
			.buffer_unordered(REFRESH_CONCURRENCY)
			.collect::<Vec<_>>()
			.await
			.into_iter()
			.filter(Result::is_err)
			.count();

		Ok(failures)
	}
}

/// Waits for and handles potential errors from SIGINT (ctrl+c) from the OS.
async fn sigint() {
	match signal::ctrl_c().await {
		Ok(()) => tracing::warn!(target: "audit_log", "received SIGINT; shutting down..."),
		Err(err) => tracing::error!(target: "audit_log", "failed to receive SIGINT: {err}"),
	}
}
