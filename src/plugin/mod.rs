//! Everything related to serving and refreshing the plugin registry.

use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, put, Router};

use crate::middleware::{admin_auth, cors, request_cache};
use crate::State;

pub mod handlers;

/// Returns a router with routes for `/api/v2/plugins`.
pub fn router(state: &'static State) -> Router {
	let reads = Router::new()
		.route("/", get(handlers::list::get))
		.route("/:plugin", get(handlers::get::get_plugin))
		.route("/:plugin/versions", get(handlers::versions::get))
		.route("/:plugin/versions/:version", get(handlers::get::get_release))
		.layer(from_fn_with_state(state, request_cache::middleware))
		.route_layer(cors::permissive());

	let batch = Router::new().route("/_batch", handlers::batch::route());

	let writes = Router::new()
		.route("/", put(handlers::update::update_all))
		.route("/:plugin", put(handlers::update::update_one))
		.route("/:plugin/versions/:version", put(handlers::update::update_version))
		.route("/_cache", delete(handlers::cache_admin::delete))
		.layer(from_fn_with_state(state, admin_auth::middleware))
		.route_layer(cors::admin([Method::PUT, Method::DELETE]));

	reads.merge(batch).merge(writes).with_state(state)
}
