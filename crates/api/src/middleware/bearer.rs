//! Bearer credential extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;

/// The credential carried in `Authorization: Bearer <token>`.
///
/// Rejects before any handler runs when the header is absent, not UTF-8,
/// lacks the `Bearer ` prefix, or carries an empty token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::MissingCredential("Missing Authorization header"))?;

        parse_bearer(header)
            .map(|token| BearerToken(token.to_string()))
            .ok_or(AppError::MissingCredential(
                "Invalid Authorization format. Expected: Bearer <token>",
            ))
    }
}

fn parse_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(' ') {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bearer_prefix() {
        assert_eq!(parse_bearer("Bearer abc.def"), Some("abc.def"));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(parse_bearer("abc.def"), None);
        assert_eq!(parse_bearer("bearer abc"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer a b"), None);
        assert_eq!(parse_bearer("Basic dXNlcjpwYXNz"), None);
    }
}
