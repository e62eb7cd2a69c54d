//! `GET /api/v2/plugins/{plugin}/versions` — lists known version strings for a plugin.

use axum::extract::{Path, State};
use axum::Json;
use registry_core::descriptor;

use crate::{Error, Result, State as AppState};

#[utoipa::path(
	get,
	path = "/api/v2/plugins/{plugin}/versions",
	tag = "plugins",
	params(("plugin" = String, Path)),
	responses((status = 200, body = [String]), (status = 404, response = crate::responses::NotFound)),
)]
pub async fn get(State(state): State<&'static AppState>, Path(plugin): Path<String>) -> Result<Json<Vec<String>>> {
	let descriptor = descriptor::find(&plugin).ok_or_else(|| Error::not_found(format!("plugin {plugin}")))?;

	Ok(Json(state.index().list_versions(&descriptor.full_name()).await?))
}
