use warden_core::lifetimes::{
    SessionLifetimes, DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS,
    DEFAULT_REMEMBER_TTL_SECS, MAX_CREDENTIAL_TTL_SECS, MAX_DEVICES,
};

/// Server configuration loaded from environment variables.
///
/// All fields except the signing secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8081`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// When set, every `/auth` call must present it in `X-Service-Key`.
    pub service_api_key: Option<String>,
    /// Expected audience of Google ID tokens. Federated login is disabled
    /// when unset.
    pub google_client_id: Option<String>,
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default   |
    /// |------------------------|-----------|
    /// | `HOST`                 | `0.0.0.0` |
    /// | `PORT`                 | `8081`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`      |
    /// | `SERVICE_API_KEY`      | unset     |
    /// | `GOOGLE_CLIENT_ID`     | unset     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8081".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            request_timeout_secs,
            service_api_key: non_empty_var("SERVICE_API_KEY"),
            google_client_id: non_empty_var("GOOGLE_CLIENT_ID"),
            session: SessionConfig::from_env(),
        }
    }
}

/// Where the session index and ledger live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Redis index plus the Postgres ledger.
    External {
        redis_url: String,
        database_url: String,
        database_max_connections: u32,
    },
    /// Process-local index and ledger, for development runs.
    Memory,
}

/// Signing key, lifetimes, device cap and store selection.
#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC secret for the credential codec.
    pub jwt_secret: String,
    pub lifetimes: SessionLifetimes,
    pub max_devices: usize,
    pub backend: StoreBackend,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("lifetimes", &self.lifetimes)
            .field("max_devices", &self.max_devices)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl SessionConfig {
    /// Load session configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default                  |
    /// |----------------------------|----------|--------------------------|
    /// | `JWT_SECRET`               | **yes**  | --                       |
    /// | `ACCESS_TOKEN_TTL_SECS`    | no       | `900`                    |
    /// | `REFRESH_TOKEN_TTL_SECS`   | no       | `604800`                 |
    /// | `REMEMBER_ME_TTL_SECS`     | no       | `2592000`                |
    /// | `MAX_DEVICES`              | no       | `5`                      |
    /// | `SESSION_INDEX`            | no       | `redis` (or `memory`)    |
    /// | `REDIS_URL`                | no       | `redis://127.0.0.1:6379` |
    /// | `DATABASE_URL`             | with `redis` | --                   |
    /// | `DATABASE_MAX_CONNECTIONS` | no       | `20`                     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, if a numeric variable does
    /// not parse or is not positive, or if `DATABASE_URL` is missing while
    /// the external stores are selected.
    pub fn from_env() -> Self {
        let jwt_secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!jwt_secret.is_empty(), "JWT_SECRET must not be empty");

        let lifetimes = SessionLifetimes {
            access_ttl_secs: ttl_var("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl_secs: ttl_var("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS),
            remember_ttl_secs: ttl_var("REMEMBER_ME_TTL_SECS", DEFAULT_REMEMBER_TTL_SECS),
        };

        let max_devices = positive_var("MAX_DEVICES", MAX_DEVICES as i64) as usize;

        let backend = match std::env::var("SESSION_INDEX").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("redis") | Err(_) => StoreBackend::External {
                redis_url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
                database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                database_max_connections: positive_var("DATABASE_MAX_CONNECTIONS", 20) as u32,
            },
            Ok(other) => panic!("SESSION_INDEX must be `redis` or `memory`, got `{other}`"),
        };

        Self {
            jwt_secret,
            lifetimes,
            max_devices,
            backend,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn positive_var(name: &str, default: i64) -> i64 {
    let value: i64 = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid integer"));
    assert!(value > 0, "{name} must be positive");
    value
}

fn ttl_var(name: &str, default: i64) -> i64 {
    let value = positive_var(name, default);
    assert!(
        value <= MAX_CREDENTIAL_TTL_SECS,
        "{name} must not exceed {MAX_CREDENTIAL_TTL_SECS} seconds"
    );
    value
}
