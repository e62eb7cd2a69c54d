//! CORS middlewares.

use axum::http::Method;
use tower_http::cors::CorsLayer;

/// A CORS layer for the public, unauthenticated `GET` routes.
pub fn permissive() -> CorsLayer {
	CorsLayer::permissive().allow_methods([Method::GET])
}

/// A CORS layer for the admin-token-gated write routes.
///
/// These are only ever called by CI from the same origin as the registry itself, so there is no
/// dashboard origin to allow here.
pub fn admin(methods: impl Into<tower_http::cors::AllowMethods>) -> CorsLayer {
	CorsLayer::new().allow_methods(methods)
}
