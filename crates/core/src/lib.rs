//! Domain primitives shared by the session ledger, the session index and the
//! HTTP adapter.
//!
//! - [`credential`] -- signs and verifies access / refresh credentials.
//! - [`admission`] -- the bounded per-identity device admission policy.
//! - [`lifetimes`] -- credential lifetimes and the device cap.
//! - [`error`] -- the error taxonomy every lifecycle operation reports.

pub mod admission;
pub mod credential;
pub mod error;
pub mod hashing;
pub mod lifetimes;
pub mod types;
