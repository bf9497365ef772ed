//! REST API layer for the gear service.
//!
//! This module provides the authenticated [`Transport`] (bearer token
//! injection, single-flight session refresh, request replay) and the
//! [`ApiClient`] with typed wrappers for each resource.
//!
//! The API uses JWT bearer token authentication; tokens are obtained and
//! rotated through the auth endpoints managed by [`crate::auth::Session`].

pub mod client;
pub mod error;
pub mod request;
pub mod transport;

pub use client::ApiClient;
pub use error::TransportError;
pub use request::{ApiRequest, MultipartField, RequestBody};
pub use transport::Transport;
