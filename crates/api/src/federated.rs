//! Federated identity verification.
//!
//! An [`IdTokenVerifier`] turns an opaque provider ID token into a verified
//! `{subject, email}` pair. [`GoogleIdTokenVerifier`] checks Google-issued
//! tokens against Google's published JWKS: RS256 signature, issuer,
//! audience (the configured client id) and expiry.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;

const GOOGLE_JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// JWKS cache TTL: 10 minutes.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(600);
const JWKS_CACHE_MAX_CAPACITY: u64 = 4;
/// At most one forced JWKS refetch per key set in this window.
const FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum JWKS response size (512 KB).
const MAX_JWKS_SIZE: usize = 512 * 1024;
/// Clock skew tolerated on provider-issued tokens.
const LEEWAY_SECS: u64 = 60;

/// Subject and email asserted by a verified provider token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FederatedError {
    /// Bad signature, issuer, audience, expiry or structure.
    #[error("ID token rejected: {0}")]
    Rejected(String),

    /// The provider's signing keys could not be fetched.
    #[error("JWKS fetch failed: {0}")]
    KeysUnavailable(String),
}

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, FederatedError>;
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

/// Verifies Google ID tokens for one OAuth client id.
pub struct GoogleIdTokenVerifier {
    http_client: Client,
    client_id: String,
    jwks_uri: String,
    jwks_cache: Cache<String, JwkSet>,
    /// Key sets refetched for an unknown kid within the last interval.
    forced_refresh: Cache<String, ()>,
}

impl GoogleIdTokenVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self::with_jwks_uri(client_id, GOOGLE_JWKS_URI)
    }

    pub fn with_jwks_uri(client_id: impl Into<String>, jwks_uri: impl Into<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(JWKS_FETCH_TIMEOUT)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_else(|_| Client::new()),
            client_id: client_id.into(),
            jwks_uri: jwks_uri.into(),
            jwks_cache: Cache::builder()
                .max_capacity(JWKS_CACHE_MAX_CAPACITY)
                .time_to_live(JWKS_CACHE_TTL)
                .build(),
            forced_refresh: Cache::builder()
                .max_capacity(JWKS_CACHE_MAX_CAPACITY)
                .time_to_live(FORCED_REFRESH_INTERVAL)
                .build(),
        }
    }

    /// Get JWKS from cache or fetch from network.
    async fn get_jwks(&self) -> Result<JwkSet, FederatedError> {
        if let Some(cached) = self.jwks_cache.get(&self.jwks_uri) {
            return Ok(cached);
        }
        let fetched = self.fetch_jwks().await?;
        self.jwks_cache.insert(self.jwks_uri.clone(), fetched.clone());
        Ok(fetched)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, FederatedError> {
        let response = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| FederatedError::KeysUnavailable(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FederatedError::KeysUnavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FederatedError::KeysUnavailable(format!("Failed to read response: {e}")))?;
        if bytes.len() > MAX_JWKS_SIZE {
            return Err(FederatedError::KeysUnavailable(format!(
                "Response too large: {} bytes",
                bytes.len()
            )));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| FederatedError::KeysUnavailable(format!("Failed to parse JWKS: {e}")))
    }

    async fn key_for(&self, kid: &str) -> Result<Jwk, FederatedError> {
        let find = |set: &JwkSet| set.keys.iter().find(|k| k.kid.as_deref() == Some(kid)).cloned();

        let missing = || FederatedError::Rejected(format!("no signing key for kid '{kid}'"));

        if let Some(key) = find(&self.get_jwks().await?) {
            return Ok(key);
        }
        if self.forced_refresh.contains_key(&self.jwks_uri) {
            return Err(missing());
        }
        self.forced_refresh.insert(self.jwks_uri.clone(), ());

        tracing::info!(kid = %kid, "Signing key not cached, refreshing JWKS for key rotation");
        let refreshed = self.fetch_jwks().await?;
        let key = find(&refreshed);
        self.jwks_cache.insert(self.jwks_uri.clone(), refreshed);
        key.ok_or_else(missing)
    }
}

#[async_trait]
impl IdTokenVerifier for GoogleIdTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, FederatedError> {
        let header = decode_header(id_token)
            .map_err(|e| FederatedError::Rejected(format!("malformed header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(FederatedError::Rejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| FederatedError::Rejected("missing kid".into()))?;

        let jwk = self.key_for(&kid).await?;
        let decoding_key = rsa_key(&jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.leeway = LEEWAY_SECS;

        let claims = decode::<GoogleClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| FederatedError::Rejected(format!("validation failed: {e}")))?
            .claims;

        if claims.sub.is_empty() {
            return Err(FederatedError::Rejected("empty subject".into()));
        }
        Ok(VerifiedIdentity {
            subject: claims.sub,
            email: claims.email.filter(|e| !e.is_empty()),
        })
    }
}

fn rsa_key(jwk: &Jwk) -> Result<DecodingKey, FederatedError> {
    if jwk.kty != "RSA" {
        return Err(FederatedError::Rejected(format!(
            "unsupported key type {}",
            jwk.kty
        )));
    }
    match (&jwk.n, &jwk.e) {
        (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e)
            .map_err(|err| FederatedError::Rejected(format!("bad RSA key: {err}"))),
        _ => Err(FederatedError::Rejected("RSA key missing components".into())),
    }
}
