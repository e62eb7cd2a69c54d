//! `GET /api/v2/plugins/{plugin}` and `GET /api/v2/plugins/{plugin}/versions/{version}`.

use axum::extract::{Path, State};
use axum::Json;
use registry_core::{descriptor, PluginView, ReleaseRecord};

use crate::{Error, Result, State as AppState};

#[utoipa::path(
	get,
	path = "/api/v2/plugins/{plugin}",
	tag = "plugins",
	params(("plugin" = String, Path)),
	responses((status = 200, body = PluginView), (status = 404, response = crate::responses::NotFound)),
)]
pub async fn get_plugin(State(state): State<&'static AppState>, Path(plugin): Path<String>) -> Result<Json<PluginView>> {
	let descriptor = descriptor::find(&plugin).ok_or_else(|| Error::not_found(format!("plugin {plugin}")))?;

	Ok(Json(state.index().get_plugin(&descriptor.full_name()).await?))
}

#[utoipa::path(
	get,
	path = "/api/v2/plugins/{plugin}/versions/{version}",
	tag = "plugins",
	params(("plugin" = String, Path), ("version" = String, Path)),
	responses((status = 200, body = ReleaseRecord), (status = 404, response = crate::responses::NotFound)),
)]
pub async fn get_release(
	State(state): State<&'static AppState>,
	Path((plugin, version)): Path<(String, String)>,
) -> Result<Json<ReleaseRecord>> {
	let descriptor = descriptor::find(&plugin).ok_or_else(|| Error::not_found(format!("plugin {plugin}")))?;

	Ok(Json(state.index().get_release(&descriptor.full_name(), &version).await?))
}
