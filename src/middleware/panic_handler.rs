//! Recovers from panics inside request handlers and turns them into a `500` response.

use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::Error;

/// Builds the [`CatchPanicLayer`] used on the whole router.
pub fn layer() -> CatchPanicLayer<PanicHandler> {
	CatchPanicLayer::custom(PanicHandler)
}

/// [`ResponseForPanic`] implementation that logs the panic payload and responds with our own
/// [`Error`] shape instead of `tower_http`'s default plaintext body.
#[derive(Clone, Copy)]
pub struct PanicHandler;

impl ResponseForPanic for PanicHandler {
	type ResponseBody = axum::body::Body;

	fn response_for_panic(&mut self, err: Box<dyn std::any::Any + Send + 'static>) -> Response<Self::ResponseBody> {
		let message = if let Some(message) = err.downcast_ref::<&str>() {
			(*message).to_owned()
		} else if let Some(message) = err.downcast_ref::<String>() {
			message.clone()
		} else {
			String::from("unknown panic payload")
		};

		tracing::error!(panic = %message, "request handler panicked");

		Error::panic().into_response()
	}
}
