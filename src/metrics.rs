//! The `/metrics` endpoint: process and cache statistics exposed as JSON.

use axum::extract::State as AxumState;
use axum::routing::{self, Router};
use tokio::runtime::{Handle as RuntimeHandle, RuntimeMetrics};
use tower_http::metrics::in_flight_requests::InFlightRequestsCounter;

use crate::State;

#[derive(Clone)]
struct MetricsState {
	runtime: RuntimeMetrics,
	request_counter: InFlightRequestsCounter,
	cache: crate::cache::Cache,
}

/// Builds the `/metrics` sub-router.
pub fn router(state: &'static State, request_counter: InFlightRequestsCounter) -> Router {
	Router::new()
		.route("/", routing::get(get))
		.with_state(MetricsState { runtime: RuntimeHandle::current().metrics(), request_counter, cache: state.cache().clone() })
}

#[derive(Debug, serde::Serialize)]
struct Metrics {
	worker_threads: usize,
	blocking_threads: usize,
	idle_blocking_threads: usize,
	active_tasks: usize,
	spawned_tasks: u64,
	in_flight_requests: usize,
	cache_entries: usize,
}

#[tracing::instrument(skip(metrics), ret)]
async fn get(AxumState(metrics): AxumState<MetricsState>) -> axum::Json<Metrics> {
	axum::Json(Metrics {
		worker_threads: metrics.runtime.num_workers(),
		blocking_threads: metrics.runtime.num_blocking_threads(),
		idle_blocking_threads: metrics.runtime.num_idle_blocking_threads(),
		active_tasks: metrics.runtime.num_alive_tasks(),
		spawned_tasks: metrics.runtime.spawned_tasks_count(),
		in_flight_requests: metrics.request_counter.get(),
		cache_entries: metrics.cache.len(),
	})
}
