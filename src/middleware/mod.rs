//! This module contains general purpose middleware.
//!
//! Middlewares are implemented as [tower services].
//! This means they can integrate with [`axum`], our HTTP framework, but are
//! also re-usable independently of that.
//!
//! [tower services]: tower::Service

pub(crate) mod admin_auth;
pub(crate) mod cors;
pub(crate) mod logging;
pub(crate) mod panic_handler;
pub(crate) mod request_cache;
