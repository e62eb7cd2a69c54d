//! `DELETE /api/v2/plugins/_cache` — admin-gated cache-eviction endpoint.
//!
//! The upstream Go service only ever invalidates the cache as a side effect of a refresh;
//! this is an explicit operational escape hatch on top of that.

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::{Result, State as AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CacheAdminQuery {
	/// Cache key prefix to evict, e.g. `"request/"` or `"batch/"`. Defaults to evicting
	/// everything.
	#[serde(default)]
	prefix: String,
}

#[utoipa::path(
	delete,
	path = "/api/v2/plugins/_cache",
	tag = "plugins",
	params(CacheAdminQuery),
	responses((status = 204), (status = 401, response = crate::responses::Unauthorized)),
)]
pub async fn delete(State(state): State<&'static AppState>, Query(query): Query<CacheAdminQuery>) -> Result<axum::http::StatusCode> {
	let removed = state.cache().invalidate_by_prefix(&query.prefix);
	tracing::info!(prefix = %query.prefix, removed, "evicted cache entries");

	Ok(axum::http::StatusCode::NO_CONTENT)
}
