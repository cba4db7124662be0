//! Warden HTTP adapter.
//!
//! Exposes config, state, error rendering, extractors and routes so the
//! binary entrypoint and the integration tests build the same router.

pub mod config;
pub mod error;
pub mod federated;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
