//! `PUT /api/v2/plugins`, `PUT /api/v2/plugins/{plugin}`, and
//! `PUT /api/v2/plugins/{plugin}/versions/{version}` — admin-gated refresh endpoints.
//!
//! Grounded in `updateAllPlugins`/`updatePlugin`/`updatePluginVersion` from the original
//! implementation's `internal/server/handlers.go`: refresh from upstream, then invalidate every
//! cached GET response the refresh could have changed.

use axum::extract::{Path, State};
use axum::Json;
use futures::stream::{self, StreamExt, TryStreamExt};
use registry_core::descriptor;

use crate::cache::{key, Prefix};
use crate::refresher::Refresher;
use crate::{Error, Result, State as AppState};

/// How many plugins are refreshed concurrently by the bulk update.
const REFRESH_CONCURRENCY: usize = 4;

#[utoipa::path(
	put,
	path = "/api/v2/plugins",
	tag = "plugins",
	responses((status = 204), (status = 401, response = crate::responses::Unauthorized)),
)]
pub async fn update_all(State(state): State<&'static AppState>) -> Result<axum::http::StatusCode> {
	let refresher = Refresher::new(state);

	stream::iter(descriptor::PLUGINS.iter())
		.map(|descriptor| refresher.update_all(descriptor))
		.buffer_unordered(REFRESH_CONCURRENCY)
		.try_collect::<Vec<_>>()
		.await?;

	state.cache().invalidate_by_prefix(&key(Prefix::Request, ""));
	state.cache().invalidate_by_prefix(&key(Prefix::Batch, ""));

	Ok(axum::http::StatusCode::NO_CONTENT)
}

#[utoipa::path(
	put,
	path = "/api/v2/plugins/{plugin}",
	tag = "plugins",
	params(("plugin" = String, Path)),
	responses((status = 204), (status = 401, response = crate::responses::Unauthorized), (status = 404, response = crate::responses::NotFound)),
)]
pub async fn update_one(State(state): State<&'static AppState>, Path(plugin): Path<String>) -> Result<axum::http::StatusCode> {
	let descriptor = descriptor::find(&plugin).ok_or_else(|| Error::not_found(format!("plugin {plugin}")))?;

	Refresher::new(state).update_all(descriptor).await?;
	invalidate_plugin_cache(state, &descriptor.full_name());

	Ok(axum::http::StatusCode::NO_CONTENT)
}

#[utoipa::path(
	put,
	path = "/api/v2/plugins/{plugin}/versions/{version}",
	tag = "plugins",
	params(("plugin" = String, Path), ("version" = String, Path)),
	responses((status = 204), (status = 401, response = crate::responses::Unauthorized), (status = 404, response = crate::responses::NotFound)),
)]
pub async fn update_version(
	State(state): State<&'static AppState>,
	Path((plugin, version)): Path<(String, String)>,
) -> Result<axum::http::StatusCode> {
	let descriptor = descriptor::find(&plugin).ok_or_else(|| Error::not_found(format!("plugin {plugin}")))?;

	Refresher::new(state).update_one(descriptor, &version).await?;
	invalidate_plugin_cache(state, &descriptor.full_name());

	Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Invalidates every GET response and batch entry a single plugin's refresh could have changed.
///
/// A `version_constraint = "latest"` batch response is sensitive to any plugin's refresh, so
/// a plugin-scoped refresh still has to drop the whole [`Prefix::Batch`] namespace, not just
/// the request-cache entries naming this plugin.
fn invalidate_plugin_cache(state: &'static AppState, full_name: &str) {
	state.cache().invalidate_by_prefix(&key(Prefix::Request, format!("GET:/api/v2/plugins/{full_name}")));
	state.cache().invalidate_by_prefix(&key(Prefix::Batch, ""));
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn invalidate_key_is_scoped_to_plugin() {
		let cache = crate::cache::Cache::new();
		cache.set(key(Prefix::Request, "GET:/api/v2/plugins/provider-git"), b"x".to_vec());
		cache.set(key(Prefix::Request, "GET:/api/v2/plugins/condition-github"), b"y".to_vec());

		let removed = cache.invalidate_by_prefix(&key(Prefix::Request, "GET:/api/v2/plugins/provider-git"));

		assert_eq!(removed, 1);
		assert!(cache.get(&key(Prefix::Request, "GET:/api/v2/plugins/condition-github")).is_some());
	}
}
