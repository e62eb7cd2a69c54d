//! Admin-token guard for the write routes, grounded in `authMiddleware` from the original
//! implementation's `internal/server/middleware.go`.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::{Error, State as AppState};

pub async fn middleware(State(state): State<&'static AppState>, request: Request, next: Next) -> Result<Response, Error> {
	let configured = state.config().admin_access_token.as_bytes();

	if configured.is_empty() {
		return Err(Error::unauthorized());
	}

	let presented = request.headers().get(AUTHORIZATION).map(|value| value.as_bytes()).unwrap_or_default();

	if !constant_time_eq(configured, presented) {
		return Err(Error::unauthorized());
	}

	Ok(next.run(request).await)
}

/// Compares two byte strings in time independent of where they first differ, to avoid leaking
/// the admin token through response-latency side channels.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}

	a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
	use super::constant_time_eq;

	#[test]
	fn equal_slices_match() {
		assert!(constant_time_eq(b"secret", b"secret"));
	}

	#[test]
	fn different_lengths_never_match() {
		assert!(!constant_time_eq(b"secret", b"secrets"));
	}

	#[test]
	fn differing_bytes_do_not_match() {
		assert!(!constant_time_eq(b"secret", b"SECRET"));
	}
}
