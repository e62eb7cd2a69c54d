//! Runtime errors.
//!
//! This module exposes the [`Error`] type that is used across the code base for bubbling up
//! errors. Any foreign errors that can occur at runtime can be turned into an [`Error`]. Specific
//! error cases have dedicated constructors, see all the public methods on [`Error`].
//!
//! [`Error`] implements [`IntoResponse`], which means it can be returned from HTTP handlers,
//! middleware, etc.
//!
//! This module also exposes a [`Result`] type alias, which sets [`Error`] as the default `E` type
//! parameter.
//!
//! [`Error`]: struct@Error

use std::fmt::{self, Display, Formatter};
use std::panic::Location;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use derive_more::Display;
use serde_json::json;
use thiserror::Error;

/// Type alias for a [`Result<T, E>`] with its `E` parameter set to [`Error`].
///
/// [`Result`]: std::result::Result
/// [`Error`]: struct@Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The API's core error type.
///
/// Any errors that ever reach the outside should be this type. It carries information about
/// the kind of error that occurred, where it occurred, and any extra information like error
/// sources or debug messages.
///
/// This type implements [`IntoResponse`], which means it can be returned from HTTP handlers,
/// middleware, etc.
#[derive(Debug, Error)]
pub struct Error {
	/// The kind of error that occurred.
	///
	/// This is used for determining the HTTP status code and error message for the response
	/// body, when an error is returned from a request.
	kind: ErrorKind,

	/// The source code location of where the error occurred.
	///
	/// This is used for debugging / troubleshooting, and is included in logs.
	location: Location<'static>,

	/// Extra information about the error, like source errors or debug messages.
	attachments: Vec<Attachment>,
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Self { kind, location, attachments } = self;

		write!(f, "[{location}] {kind}")?;

		if !attachments.is_empty() {
			write!(f, ":")?;

			for attachment in attachments.iter().rev() {
				write!(f, "\n  - {attachment}")?;
			}
		}

		Ok(())
	}
}

/// The different kinds of errors that can occur at runtime.
///
/// Every individual error case should be covered by this enum, with its own error message and
/// any extra information that is necessary to keep around. This mirrors the error taxonomy: a
/// handful of shapes (validation, not-found, auth, throttle, upstream, integrity, panic), not a
/// variant per call site.
#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Error)]
enum ErrorKind {
	#[error("{0}")]
	Validation(String),

	#[error("could not find {what}")]
	NotFound { what: String },

	#[error("missing or invalid authorization token")]
	Unauthorized,

	#[error("too many concurrent requests, please retry")]
	Throttled,

	#[error("database error")]
	Database(#[from] sqlx::Error),

	#[error("object store error: {0}")]
	ObjectStore(String),

	#[error("upstream request to {what} failed: {source}")]
	Upstream { what: &'static str, source: reqwest::Error },

	#[error("upstream request to {what} returned unexpected status {status}")]
	UpstreamStatus { what: &'static str, status: StatusCode },

	#[error("checksum mismatch for {file_name}: expected {expected}, got {actual}")]
	ChecksumMismatch { file_name: String, expected: String, actual: String },

	#[error("content-length mismatch for {file_name}: expected {expected}, got {actual}")]
	ContentLengthMismatch { file_name: String, expected: u64, actual: u64 },

	#[error("i/o error while writing {what}: {source}")]
	IntegrityIo { what: String, source: std::io::Error },

	#[error("handler panicked")]
	Panic,

	#[error(transparent)]
	Json(#[from] JsonRejection),

	#[error(transparent)]
	Path(#[from] PathRejection),
}

#[allow(clippy::missing_docs_in_private_items)]
type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Generic error attachments.
#[derive(Debug, Display)]
#[display("'{context}' at {location}")]
struct Attachment {
	/// The attachment context.
	///
	/// This could be a more concrete error type, e.g. from a third party crate, or simply an
	/// error message.
	context: BoxedError,

	/// The source code location of where this attachment was created.
	location: Location<'static>,
}

impl Attachment {
	/// Creates a new [`Attachment`].
	#[track_caller]
	fn new<C>(context: C) -> Self
	where
		C: Into<BoxedError>,
	{
		Self { context: context.into(), location: *Location::caller() }
	}
}

impl Error {
	/// Creates a new [`Error`] of the given [`ErrorKind`].
	#[track_caller]
	fn new<E>(kind: E) -> Self
	where
		E: Into<ErrorKind>,
	{
		Self { kind: kind.into(), location: *Location::caller(), attachments: Vec::new() }
	}

	/// Attach additional context to an error.
	///
	/// This can be another, more concrete, error type, or simply an error message. If `ctx` is
	/// also an [`Error`], it will have its attachments transferred to `self`.
	#[track_caller]
	pub fn context<E>(mut self, ctx: E) -> Self
	where
		E: Into<BoxedError>,
	{
		match Into::<BoxedError>::into(ctx).downcast::<Self>() {
			Ok(mut err) => {
				self.attachments.append(&mut err.attachments);
				self.attachments.push(Attachment::new(err.kind));
			},
			Err(other) => {
				self.attachments.push(Attachment::new(other));
			},
		}

		self
	}

	/// An error signaling malformed client input: unknown plugin, duplicate plugin, bad
	/// constraint, out-of-range plugin count, etc.
	///
	/// Produces a `400 Bad Request` with `message` verbatim, matching the legacy
	/// `writeJSONError` behavior of surfacing a human-readable validation message as-is.
	#[track_caller]
	pub fn validation<T>(message: T) -> Self
	where
		T: Display,
	{
		Self::new(ErrorKind::Validation(message.to_string()))
	}

	/// An error signaling that a resource could not be found.
	///
	/// Produces a `404 Not Found` status.
	#[track_caller]
	pub fn not_found<T>(what: T) -> Self
	where
		T: Display,
	{
		Self::new(ErrorKind::NotFound { what: what.to_string() })
	}

	/// A generic `401 Unauthorized` error for the admin-token check.
	#[track_caller]
	pub fn unauthorized() -> Self {
		Self::new(ErrorKind::Unauthorized)
	}

	/// An error signaling that a semaphore wait was canceled or timed out.
	///
	/// Produces a `429 Too Many Requests` status.
	#[track_caller]
	pub fn throttled() -> Self {
		Self::new(ErrorKind::Throttled)
	}

	/// An error signaling an object-store transport failure (HEAD/PUT/GET).
	///
	/// Produces a `500 Internal Server Error` status.
	#[track_caller]
	pub fn object_store<T>(message: T) -> Self
	where
		T: Display,
	{
		Self::new(ErrorKind::ObjectStore(message.to_string()))
	}

	/// An error that occurred while calling an upstream collaborator (the code-forge API).
	///
	/// Produces a `500 Internal Server Error` status; the raw error is logged, the client sees
	/// a generic message.
	#[track_caller]
	pub fn upstream(what: &'static str, source: reqwest::Error) -> Self {
		Self::new(ErrorKind::Upstream { what, source })
	}

	/// An error signaling that an upstream collaborator responded with an unexpected status.
	///
	/// Produces a `500 Internal Server Error` status.
	#[track_caller]
	pub fn upstream_status(what: &'static str, status: StatusCode) -> Self {
		Self::new(ErrorKind::UpstreamStatus { what, status })
	}

	/// An I/O error while writing an archive entry (tar or gzip stream).
	///
	/// Produces a `500 Internal Server Error` status.
	#[track_caller]
	pub fn integrity_io(what: impl Display, source: std::io::Error) -> Self {
		Self::new(ErrorKind::IntegrityIo { what: what.to_string(), source })
	}

	/// An error signaling that a downloaded asset's checksum did not match the expected value.
	///
	/// Produces a `500 Internal Server Error` status; the archive build is aborted.
	#[track_caller]
	pub fn checksum_mismatch(file_name: impl Display, expected: impl Display, actual: impl Display) -> Self {
		Self::new(ErrorKind::ChecksumMismatch {
			file_name: file_name.to_string(),
			expected: expected.to_string(),
			actual: actual.to_string(),
		})
	}

	/// An error signaling that a downloaded asset's byte count did not match its
	/// `Content-Length` header.
	///
	/// Produces a `500 Internal Server Error` status; the archive build is aborted.
	#[track_caller]
	pub fn content_length_mismatch(file_name: impl Display, expected: u64, actual: u64) -> Self {
		Self::new(ErrorKind::ContentLengthMismatch { file_name: file_name.to_string(), expected, actual })
	}

	/// A generic `500 Internal Server Error` produced by the panic-recovery middleware.
	#[track_caller]
	pub fn panic() -> Self {
		Self::new(ErrorKind::Panic)
	}
}

impl IntoResponse for Error {
	#[track_caller]
	fn into_response(self) -> Response {
		use ErrorKind as E;

		let message = match &self.kind {
			// Validation messages are meant to be read verbatim by the client; everything else
			// gets a stable, generic message so we don't leak transport internals.
			E::Validation(message) => message.clone(),
			E::NotFound { what } => format!("could not find {what}"),
			E::Unauthorized => "missing or invalid authorization token".to_owned(),
			E::Throttled => "too many concurrent requests, please retry".to_owned(),
			E::Json(_) | E::Path(_) => self.kind.to_string(),
			_ => "internal server error".to_owned(),
		};

		let status = match self.kind {
			E::Validation(_) | E::Json(_) => StatusCode::BAD_REQUEST,
			E::Unauthorized => StatusCode::UNAUTHORIZED,
			E::NotFound { .. } => StatusCode::NOT_FOUND,
			E::Throttled => StatusCode::TOO_MANY_REQUESTS,
			E::Database(_)
			| E::ObjectStore(_)
			| E::Upstream { .. }
			| E::UpstreamStatus { .. }
			| E::ChecksumMismatch { .. }
			| E::ContentLengthMismatch { .. }
			| E::IntegrityIo { .. }
			| E::Panic => StatusCode::INTERNAL_SERVER_ERROR,
			E::Path(ref rejection) => rejection.status(),
		};

		if status == StatusCode::INTERNAL_SERVER_ERROR {
			tracing::error!(location = %self.location, kind = %self.kind, attachments = ?self.attachments, "internal server error occurred");
		} else {
			tracing::debug! {
				location = %self.location,
				kind = %self.kind,
				"returning error from request handler"
			};
		}

		(status, Json(json!({ "error": message }))).into_response()
	}
}

impl From<sqlx::Error> for Error {
	#[track_caller]
	fn from(error: sqlx::Error) -> Self {
		Self::new(error)
	}
}
