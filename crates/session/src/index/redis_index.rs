//! Redis-backed session index.
//!
//! Key layout per identity (the `{identity}` hash tag keeps both keys in one
//! cluster slot so scripts may touch them together):
//!
//! ```text
//! auth:{<identity>}:devices            sorted set, member = device id, score = last activity (ms)
//! auth:{<identity>}:refresh:<device>   refresh fingerprint, expires with the refresh credential
//! ```
//!
//! `admit` and `revoke_all` run as single Lua scripts and `revoke_device` as
//! one MULTI/EXEC pipeline, so each is applied atomically by the server no
//! matter what happens to the calling future.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use warden_core::admission::AdmissionPolicy;
use warden_core::types::DeviceId;

use super::{Admission, IndexError, SessionIndex};

/// KEYS: devices set, refresh key of the incoming device.
/// ARGV: device id, score, fingerprint, ttl seconds, max devices, refresh key prefix.
/// Returns `{already_member, {evicted...}}`.
const ADMIT_SCRIPT: &str = r"
local devices = KEYS[1]
local device = ARGV[1]
local ttl = tonumber(ARGV[4])
local max = tonumber(ARGV[5])
local already = 0
local evicted = {}

if redis.call('ZSCORE', devices, device) then
  already = 1
else
  local count = redis.call('ZCARD', devices)
  if count >= max then
    local oldest = redis.call('ZRANGE', devices, 0, count - max)
    for _, member in ipairs(oldest) do
      redis.call('ZREM', devices, member)
      redis.call('DEL', ARGV[6] .. member)
      table.insert(evicted, member)
    end
  end
end

redis.call('ZADD', devices, ARGV[2], device)
redis.call('SET', KEYS[2], ARGV[3], 'EX', ttl)
if redis.call('TTL', devices) < ttl then
  redis.call('EXPIRE', devices, ttl)
end
return {already, evicted}
";

/// KEYS: devices set. ARGV: refresh key prefix. Returns the removed members.
const REVOKE_ALL_SCRIPT: &str = r"
local members = redis.call('ZRANGE', KEYS[1], 0, -1)
for _, member in ipairs(members) do
  redis.call('DEL', ARGV[1] .. member)
end
redis.call('DEL', KEYS[1])
return members
";

fn devices_key(identity_id: &str) -> String {
    format!("auth:{{{identity_id}}}:devices")
}

fn refresh_prefix(identity_id: &str) -> String {
    format!("auth:{{{identity_id}}}:refresh:")
}

fn refresh_key(identity_id: &str, device_id: &str) -> String {
    format!("{}{device_id}", refresh_prefix(identity_id))
}

/// [`SessionIndex`] over a shared Redis connection.
#[derive(Clone)]
pub struct RedisSessionIndex {
    conn: ConnectionManager,
    policy: AdmissionPolicy,
    admit_script: Script,
    revoke_all_script: Script,
}

impl RedisSessionIndex {
    /// Connect to `redis_url` with a reconnecting connection manager.
    pub async fn connect(redis_url: &str, policy: AdmissionPolicy) -> Result<Self, IndexError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, policy))
    }

    pub fn new(conn: ConnectionManager, policy: AdmissionPolicy) -> Self {
        Self {
            conn,
            policy,
            admit_script: Script::new(ADMIT_SCRIPT),
            revoke_all_script: Script::new(REVOKE_ALL_SCRIPT),
        }
    }

    pub async fn ping(&self) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionIndex for RedisSessionIndex {
    async fn admit(
        &self,
        identity_id: &str,
        device_id: &str,
        refresh_hash: &str,
        ttl: Duration,
    ) -> Result<Admission, IndexError> {
        let mut conn = self.conn.clone();
        let score = chrono::Utc::now().timestamp_millis();
        let ttl_secs = ttl.as_secs().max(1);

        let (already, evicted): (i64, Vec<DeviceId>) = self
            .admit_script
            .key(devices_key(identity_id))
            .key(refresh_key(identity_id, device_id))
            .arg(device_id)
            .arg(score)
            .arg(refresh_hash)
            .arg(ttl_secs)
            .arg(self.policy.max_devices())
            .arg(refresh_prefix(identity_id))
            .invoke_async(&mut conn)
            .await?;

        Ok(Admission {
            evicted,
            already_member: already == 1,
        })
    }

    async fn exists(&self, identity_id: &str, device_id: &str) -> Result<bool, IndexError> {
        let mut conn = self.conn.clone();
        let present: bool = conn.exists(refresh_key(identity_id, device_id)).await?;
        Ok(present)
    }

    async fn refresh_hash(
        &self,
        identity_id: &str,
        device_id: &str,
    ) -> Result<Option<String>, IndexError> {
        let mut conn = self.conn.clone();
        let hash: Option<String> = conn.get(refresh_key(identity_id, device_id)).await?;
        Ok(hash)
    }

    async fn revoke_device(&self, identity_id: &str, device_id: &str) -> Result<(), IndexError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .zrem(devices_key(identity_id), device_id)
            .ignore()
            .del(refresh_key(identity_id, device_id))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn revoke_all(&self, identity_id: &str) -> Result<Vec<DeviceId>, IndexError> {
        let mut conn = self.conn.clone();
        let removed: Vec<DeviceId> = self
            .revoke_all_script
            .key(devices_key(identity_id))
            .arg(refresh_prefix(identity_id))
            .invoke_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn devices(&self, identity_id: &str) -> Result<Vec<DeviceId>, IndexError> {
        let mut conn = self.conn.clone();
        let members: Vec<DeviceId> = conn.zrange(devices_key(identity_id), 0, -1).await?;
        Ok(members)
    }
}
