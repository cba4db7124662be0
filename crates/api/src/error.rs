use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use warden_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for lifecycle errors and adds HTTP-specific variants.
/// Renders `{"error": <message>, "code": <stable code>}`; store and provider
/// detail is logged, never rendered.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No usable `Authorization: Bearer <token>` header.
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The federated provider token failed verification.
    #[error("Federated token rejected: {0}")]
    FederatedTokenRejected(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Service key rejected")]
    ServiceKeyRejected,
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable machine-readable reason rendered as `code`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Core(core) => core.code(),
            AppError::MissingCredential(_) => "MISSING_CREDENTIAL",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::FederatedTokenRejected(_) => "FEDERATED_TOKEN_REJECTED",
            AppError::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            AppError::ServiceKeyRejected => "SERVICE_KEY_REJECTED",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::SigningFailure(msg) => {
                    tracing::error!(error = %msg, "Credential signing failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal error occurred".to_string(),
                    )
                }
                CoreError::InvalidCredential(_) => (
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired credential".to_string(),
                ),
                CoreError::SessionNotLive => {
                    (StatusCode::UNAUTHORIZED, "Session is not live".to_string())
                }
                CoreError::StoreUnavailable { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                ),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            },
            AppError::MissingCredential(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::FederatedTokenRejected(reason) => {
                tracing::warn!(reason = %reason, "Federated token rejected");
                (
                    StatusCode::UNAUTHORIZED,
                    "Identity provider token rejected".to_string(),
                )
            }
            AppError::UnsupportedProvider(provider) => (
                StatusCode::BAD_REQUEST,
                format!("Provider '{provider}' is not supported"),
            ),
            AppError::ServiceKeyRejected => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid service key".to_string(),
            ),
        };

        let body = json!({
            "error": message,
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
