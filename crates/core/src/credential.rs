//! Signed, time-bounded bearer credentials.
//!
//! Credentials are HS256-signed JWTs carrying a [`Claims`] payload. The signing
//! secret is supplied when the [`CredentialCodec`] is built (from process
//! configuration) so the key can be swapped without a code change.
//!
//! Expiry is checked here rather than by `jsonwebtoken`, with no leeway: a
//! credential whose `exp` equals the current second is already expired.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::lifetimes::MAX_CREDENTIAL_TTL_SECS;

/// Which flow a credential was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Short-lived, never persisted.
    Access,
    /// Long-lived; live only while present in the session index.
    Refresh,
}

/// Claims embedded in every credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub device_id: String,
    pub kind: CredentialKind,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// A freshly signed credential together with the claims it carries.
#[derive(Debug, Clone)]
pub struct Minted {
    pub token: String,
    pub claims: Claims,
}

/// Mints and verifies credentials with one process-wide signing key.
///
/// Holds no mutable state; share it freely across tasks.
#[derive(Clone)]
pub struct CredentialCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl CredentialCodec {
    /// Build a codec from an HMAC secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CoreError> {
        if secret.is_empty() {
            return Err(CoreError::SigningFailure("signing key is empty".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Sign a credential valid for `ttl_secs` from now.
    pub fn mint(
        &self,
        kind: CredentialKind,
        identity_id: &str,
        device_id: &str,
        ttl_secs: i64,
    ) -> Result<Minted, CoreError> {
        self.mint_at(
            kind,
            identity_id,
            device_id,
            ttl_secs,
            chrono::Utc::now().timestamp(),
        )
    }

    /// Sign a credential as if the current time were `now`.
    pub fn mint_at(
        &self,
        kind: CredentialKind,
        identity_id: &str,
        device_id: &str,
        ttl_secs: i64,
        now: i64,
    ) -> Result<Minted, CoreError> {
        if identity_id.is_empty() || device_id.is_empty() {
            return Err(CoreError::Validation(
                "identity id and device id must not be empty".into(),
            ));
        }
        if ttl_secs <= 0 {
            return Err(CoreError::Validation(
                "credential lifetime must be positive".into(),
            ));
        }
        if ttl_secs > MAX_CREDENTIAL_TTL_SECS {
            return Err(CoreError::Validation(format!(
                "credential lifetime must not exceed {MAX_CREDENTIAL_TTL_SECS} seconds"
            )));
        }
        let exp = now.checked_add(ttl_secs).ok_or_else(|| {
            CoreError::Validation("credential expiry is out of range".into())
        })?;

        let claims = Claims {
            user_id: identity_id.to_string(),
            device_id: device_id.to_string(),
            kind,
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CoreError::SigningFailure(e.to_string()))?;

        Ok(Minted { token, claims })
    }

    /// Verify signature, algorithm, structure and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, CoreError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, CoreError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::InvalidSignature => "signature mismatch",
                ErrorKind::InvalidAlgorithm => "unexpected signing algorithm",
                _ => "malformed credential",
            };
            CoreError::InvalidCredential(reason.into())
        })?;

        let claims = data.claims;
        if claims.exp <= now {
            return Err(CoreError::InvalidCredential("credential expired".into()));
        }
        if claims.user_id.is_empty() || claims.device_id.is_empty() {
            return Err(CoreError::InvalidCredential("missing claims".into()));
        }
        Ok(claims)
    }

    /// Verify and require a specific [`CredentialKind`].
    pub fn verify_kind(&self, token: &str, kind: CredentialKind) -> Result<Claims, CoreError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(CoreError::InvalidCredential("wrong credential kind".into()));
        }
        Ok(claims)
    }
}
