//! Marker types for documenting HTTP responses via [`utoipa`].
//!
//! These exist purely so `#[utoipa::path(responses(...))]` lists read like the status codes they
//! describe; handlers return [`crate::Result<Json<T>>`] directly rather than these types.

#![allow(clippy::missing_docs_in_private_items)]

use serde::Serialize;
use utoipa::IntoResponses;

#[derive(Debug, Serialize, IntoResponses)]
#[response(status = 204)]
pub struct NoContent;

#[derive(Debug, Serialize, IntoResponses)]
#[response(status = 302)]
pub struct Redirect;

#[derive(Debug, Serialize, IntoResponses)]
#[response(status = 400)]
pub struct BadRequest;

#[derive(Debug, Serialize, IntoResponses)]
#[response(status = 401)]
pub struct Unauthorized;

#[derive(Debug, Serialize, IntoResponses)]
#[response(status = 404)]
pub struct NotFound;

#[derive(Debug, Serialize, IntoResponses)]
#[response(status = 429)]
pub struct TooManyRequests;

#[derive(Debug, Serialize, IntoResponses)]
#[response(status = 500)]
pub struct InternalServerError;
