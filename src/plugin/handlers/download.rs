//! `GET /downloads/{os}/{arch}/semantic-release` — redirects to the latest `semantic-release`
//! binary release for `{os}/{arch}`.
//!
//! Grounded in `downloadLatestSemRelBinary`/`getLatestSemRelRelease` from the original
//! implementation's `internal/server/handler_download.go`: cache the upstream "latest release"
//! lookup under the GitHub cache namespace, then scan its assets for one whose name contains
//! the lowercased `"{os}_{arch}"` substring.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::cache::{key, Prefix};
use crate::{Error, Result, State as AppState};

const SEMREL_REPO: &str = "go-semantic-release/semantic-release";
const SEMREL_CACHE_KEY: &str = "semantic-release/latest";

#[derive(Debug, Deserialize)]
struct GithubAsset {
	name: String,
	browser_download_url: String,
}

#[derive(Debug, Deserialize, serde::Serialize)]
struct GithubRelease {
	assets: Vec<GithubAsset>,
}

#[utoipa::path(
	get,
	path = "/downloads/{os}/{arch}/semantic-release",
	tag = "downloads",
	params(("os" = String, Path), ("arch" = String, Path)),
	responses((status = 302, response = crate::responses::Redirect), (status = 404, response = crate::responses::NotFound)),
)]
pub async fn get(State(state): State<&'static AppState>, Path((os, arch)): Path<(String, String)>) -> Result<Response> {
	let release = latest_release(state).await?;

	let identifier = format!("{}_{}", os.to_lowercase(), arch.to_lowercase());

	let asset = release
		.assets
		.iter()
		.find(|asset| asset.name.to_lowercase().contains(&identifier))
		.ok_or_else(|| Error::not_found(format!("binary for {os}/{arch}")))?;

	// `axum::response::Redirect::to` emits 303 See Other; the legacy clients hitting this
	// endpoint expect a literal 302 Found, so build the response by hand.
	Ok((StatusCode::FOUND, [(LOCATION, asset.browser_download_url.clone())]).into_response())
}

async fn latest_release(state: &'static AppState) -> Result<GithubRelease> {
	let cache_key = key(Prefix::Github, SEMREL_CACHE_KEY);

	if let Some(cached) = state.cache().get(&cache_key) {
		return serde_json::from_slice(&cached).map_err(|err| Error::validation(err.to_string()));
	}

	let _permit = state.gates().acquire_upstream().await?;

	let base = state.config().github_api_base_url.as_str().trim_end_matches('/');
	let response = state
		.http_client()
		.get(format!("{base}/repos/{SEMREL_REPO}/releases/latest"))
		.header("User-Agent", "plugin-registry")
		.bearer_auth(&state.config().github_token)
		.timeout(Duration::from_secs(60))
		.send()
		.await
		.map_err(|err| Error::upstream("github", err))?;

	if !response.status().is_success() {
		return Err(Error::upstream_status("github", response.status()));
	}

	let release: GithubRelease = response.json().await.map_err(|err| Error::upstream("github", err))?;

	let body = serde_json::to_vec(&release).map_err(|err| Error::validation(err.to_string()))?;
	state.cache().set(cache_key, body);

	Ok(release)
}
