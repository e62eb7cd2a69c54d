//! `GET /api/v2/plugins` — lists every configured plugin's full name.
//!
//! Lists the static descriptor catalogue, not the document store: a plugin that has never been
//! refreshed still shows up here, matching `listPlugins` ranging over `config.Plugins`.

use axum::Json;
use registry_core::descriptor::PLUGINS;

#[utoipa::path(
	get,
	path = "/api/v2/plugins",
	tag = "plugins",
	responses((status = 200, body = [String])),
)]
pub async fn get() -> Json<Vec<String>> {
	Json(PLUGINS.iter().map(registry_core::PluginDescriptor::full_name).collect())
}
