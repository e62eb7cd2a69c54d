//! `POST /api/v2/plugins/_batch` — resolves a batch request and materializes a download archive.
//!
//! Grounded in `batchGetPlugins` from `internal/server/handler_batch.go`:
//! validate, check the Tier-1 cache under the request-shape hash, resolve every plugin
//! concurrently, check the Tier-2 object-store HEAD under the content hash, build-and-upload on
//! a miss, then populate both cache tiers.

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use axum::Json;
use futures::stream::{self, StreamExt, TryStreamExt};
use registry_core::{descriptor, resolver, BatchRequest, BatchResponse, BatchResponsePlugin};

use crate::cache::{key, Prefix};
use crate::{archive, planner, Error, Result, State as AppState};

/// How many plugins are resolved concurrently within one batch request.
const RESOLVE_CONCURRENCY: usize = 5;

/// Request body size cap, per §6.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn route() -> MethodRouter<&'static AppState> {
	post(post_batch).layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[utoipa::path(
	post,
	path = "/api/v2/plugins/_batch",
	tag = "plugins",
	request_body = BatchRequest,
	responses((status = 200, body = BatchResponse), (status = 400, response = crate::responses::BadRequest)),
)]
async fn post_batch(State(state): State<&'static AppState>, Json(request): Json<BatchRequest>) -> Result<Response> {
	let skeleton = planner::build_skeleton(&request)?;

	let request_key = key(Prefix::Batch, hex::encode(skeleton.hash()));

	if let Some(cached) = state.cache().get(&request_key) {
		return Ok(json_bytes_response(cached));
	}

	let response = resolve_all(state, skeleton).await?;

	let body = serde_json::to_vec(&response).map_err(|err| Error::validation(err.to_string()))?;
	state.cache().set(request_key, body.clone());

	Ok(json_bytes_response(body))
}

async fn resolve_all(state: &'static AppState, mut response: BatchResponse) -> Result<BatchResponse> {
	let os_arch = response.os_arch();

	let resolved = stream::iter(response.plugins.into_iter())
		.map(|plugin| {
			let os_arch = os_arch.clone();
			async move { resolve_one(state, plugin, &os_arch).await }
		})
		.buffer_unordered(RESOLVE_CONCURRENCY)
		.try_collect::<Vec<_>>()
		.await?;

	response.plugins = resolved;
	response.plugins.sort_by(|a, b| a.full_name.cmp(&b.full_name));
	response.calculate_hash();
	response.download_url = state.object_store().download_url(&response.download_hash);
	response.download_checksum = materialize_archive(state, &response).await?;

	Ok(response)
}

async fn resolve_one(state: &'static AppState, mut plugin: BatchResponsePlugin, os_arch: &str) -> Result<BatchResponsePlugin> {
	let descriptor = descriptor::find(&plugin.full_name)
		.ok_or_else(|| Error::validation(format!("could not resolve plugin {}", plugin.full_name)))?;
	let full_name = descriptor.full_name();

	let release = if plugin.version_constraint == "latest" {
		let view = state.index().get_plugin(&full_name).await.map_err(|err| {
			Error::validation(format!("could not resolve plugin {}", plugin.full_name)).context(err)
		})?;
		view.latest_release
	} else {
		let versions = state.index().list_versions(&full_name).await?;
		let constraint = resolver::parse_constraint(&plugin.version_constraint)
			.map_err(|err| Error::validation(format!("could not resolve plugin {}", plugin.full_name)).context(err))?;
		let version = resolver::resolve(&versions, &constraint)
			.map_err(|err| Error::validation(format!("could not resolve plugin {}", plugin.full_name)).context(err))?;

		state.index().get_release(&full_name, &version.to_string()).await?
	};

	let asset = release
		.assets
		.get(os_arch)
		.ok_or_else(|| Error::validation(format!("could not find {os_arch} asset for plugin {}", plugin.full_name)))?;

	plugin.version = release.version.clone();
	plugin.file_name = asset.file_name.clone();
	plugin.url = asset.url.clone();
	plugin.checksum = asset.checksum.clone();

	Ok(plugin)
}

async fn materialize_archive(state: &'static AppState, response: &BatchResponse) -> Result<String> {
	let _permit = state.gates().acquire_archive().await?;

	if let Some(metadata) = state.object_store().head_archive(&response.download_hash).await? {
		tracing::info!(hash = %response.download_hash, "found cached archive");
		return Ok(metadata.checksum);
	}

	tracing::info!(hash = %response.download_hash, "archive not found, building");
	let archive::Archive { bytes, checksum } = archive::build(state.http_client(), response).await?;

	state
		.object_store()
		.put_archive(&response.download_hash, &response.os, &response.arch, response.plugins.len(), &checksum, bytes)
		.await?;

	Ok(checksum)
}

fn json_bytes_response(bytes: Vec<u8>) -> Response {
	let mut response = bytes.into_response();
	response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
	response
}
