/// Errors reported by session lifecycle operations.
///
/// Each variant maps onto a stable machine-readable reason via
/// [`CoreError::code`]. Messages carried by the variants are safe to show to
/// callers; store-level detail is logged where it occurs and never stored
/// here.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The signing key or claims could not be encoded.
    #[error("Credential signing failed: {0}")]
    SigningFailure(String),

    /// Malformed, mis-signed, wrong-algorithm, wrong-kind or expired credential.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// The credential is well-formed but its device session is no longer in
    /// the session index (logged out, evicted or expired).
    #[error("Session is not live")]
    SessionNotLive,

    /// A session store call failed for infrastructure reasons.
    #[error("Session store unavailable: {store}")]
    StoreUnavailable { store: &'static str },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    /// Stable short reason string for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::SigningFailure(_) => "SIGNING_FAILURE",
            CoreError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            CoreError::SessionNotLive => "SESSION_NOT_LIVE",
            CoreError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}
