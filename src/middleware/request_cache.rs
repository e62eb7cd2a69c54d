//! Tier-1 `GET` response cache, grounded in `cacheMiddleware`/`getCacheKeyFromRequest` from
//! `internal/server/cache.go`.
//!
//! A hit short-circuits the handler entirely and adds the `X-Go-Cache: HIT` header; a miss runs
//! the handler and, on a successful response, stores the body under the request's cache key.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::cache::{key, Prefix};
use crate::State as AppState;

/// Header set on a cache hit, mirroring the original's `X-Go-Cache: HIT`.
const CACHE_HIT_HEADER: &str = "x-go-cache";

pub async fn middleware(State(state): State<&'static AppState>, request: Request, next: Next) -> Response {
	if state.config().disable_request_cache {
		return next.run(request).await;
	}

	let cache_key = key(Prefix::Request, format!("{}:{}", request.method(), request.uri().path()));

	if let Some(cached) = state.cache().get(&cache_key) {
		let mut response = (StatusCode::OK, cached).into_response();
		response.headers_mut().insert(CACHE_HIT_HEADER, HeaderValue::from_static("HIT"));
		return response;
	}

	let response = next.run(request).await;

	if !response.status().is_success() {
		return response;
	}

	let (parts, body) = response.into_parts();

	let Ok(bytes) = axum::body::to_bytes(body, usize::MAX).await else {
		return Response::from_parts(parts, Body::empty());
	};

	state.cache().set(cache_key, bytes.to_vec());

	Response::from_parts(parts, Body::from(bytes))
}
