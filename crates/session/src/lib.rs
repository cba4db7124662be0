//! Session liveness and lifecycle.
//!
//! - [`index`] -- the fast, TTL-based session index with bounded device rosters.
//! - [`lifecycle`] -- login, federated login, refresh, logout, logout-all and
//!   session verification over the index and the durable ledger.

pub mod index;
pub mod lifecycle;

pub use index::{Admission, IndexError, MemorySessionIndex, RedisSessionIndex, SessionIndex};
pub use lifecycle::{
    DeviceSummary, FederatedClaims, IssuedCredentials, LoginContext, RefreshedAccess,
    SessionInfo, SessionLifecycle,
};
