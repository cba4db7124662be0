//! Request extractors and middleware.
//!
//! - [`bearer::BearerToken`] -- the raw credential from `Authorization: Bearer`.
//! - [`client::ClientContext`] -- user agent and client IP, both optional.
//! - [`service_key::require_service_key`] -- shared-secret gate for `/auth`.

pub mod bearer;
pub mod client;
pub mod service_key;
