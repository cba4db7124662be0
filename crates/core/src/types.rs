/// Internal identity ids are opaque strings (UUIDs for federated identities).
pub type IdentityId = String;

/// Client-chosen device identifier, unique per identity.
pub type DeviceId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
