//! Credential lifetimes and the per-identity device cap.

/// Default maximum number of concurrently admitted devices per identity.
pub const MAX_DEVICES: usize = 5;

/// Default access credential lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
/// Default refresh credential lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
/// Refresh credential lifetime when the caller asked to be remembered: 30 days.
pub const DEFAULT_REMEMBER_TTL_SECS: i64 = 30 * 24 * 60 * 60;
/// Longest lifetime any credential may be minted with: 366 days.
pub const MAX_CREDENTIAL_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Lifetimes applied by the lifecycle flows, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetimes {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub remember_ttl_secs: i64,
}

impl SessionLifetimes {
    /// Refresh lifetime for a login, depending on the remember flag.
    pub fn refresh_ttl_secs(&self, remember: bool) -> i64 {
        if remember {
            self.remember_ttl_secs
        } else {
            self.refresh_ttl_secs
        }
    }
}

impl Default for SessionLifetimes {
    fn default() -> Self {
        Self {
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            remember_ttl_secs: DEFAULT_REMEMBER_TTL_SECS,
        }
    }
}
