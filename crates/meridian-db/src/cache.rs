//! Redis-backed cache manager: OAuth nonce store, rate limiting, and
//! distributed locks (§5, §9).

use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::{DbError, DbResult};

pub mod keys {
    pub const RATE_LIMIT: &str = "rate:";
    pub const OAUTH_NONCE: &str = "oauth-nonce:";
    pub const LOCK: &str = "lock:";
}

pub mod ttl {
    use std::time::Duration;

    pub const RATE_LIMIT: Duration = Duration::from_secs(60);
    /// OAuth handshake state expiry (§3: "Deleted after single use or expiry
    /// (10 min)").
    pub const OAUTH_NONCE: Duration = Duration::from_secs(10 * 60);
    pub const LOCK: Duration = Duration::from_secs(30);
}

pub struct CacheManager {
    pool: RedisPool,
}

impl CacheManager {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> DbResult<()> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs()).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let mut conn = self.pool.get().await?;
        let result: Option<String> = conn.get(key).await?;
        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let mut conn = self.pool.get().await?;
        let deleted: i32 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    /// Increment the rate-limit counter for `identifier`, returning the
    /// count after this increment. Sets expiry on the window's first hit.
    pub async fn rate_limit_incr(&self, identifier: &str, window_secs: u64) -> DbResult<i64> {
        let mut conn = self.pool.get().await?;
        let key = format!("{}{}", keys::RATE_LIMIT, identifier);
        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, window_secs as i64).await?;
        }
        Ok(count)
    }

    /// Single-use OAuth nonce check-and-set (§3: state nonce deleted after
    /// single use or expiry).
    pub async fn reserve_oauth_nonce(&self, nonce: &str) -> DbResult<bool> {
        let mut conn = self.pool.get().await?;
        let key = format!("{}{}", keys::OAUTH_NONCE, nonce);
        let result: Option<String> = deadpool_redis::redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl::OAUTH_NONCE.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(DbError::from)?;
        Ok(result.is_some())
    }

    pub async fn consume_oauth_nonce(&self, nonce: &str) -> DbResult<bool> {
        let key = format!("{}{}", keys::OAUTH_NONCE, nonce);
        self.delete(&key).await
    }

    /// Acquire a distributed lock (`SET NX EX`), used by the outbox flusher
    /// to avoid two replicas draining the same tenant concurrently.
    pub async fn acquire_lock(&self, resource: &str, ttl: Duration) -> DbResult<bool> {
        let mut conn = self.pool.get().await?;
        let key = format!("{}{}", keys::LOCK, resource);
        let result: Option<String> = deadpool_redis::redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(DbError::from)?;
        Ok(result.is_some())
    }

    pub async fn release_lock(&self, resource: &str) -> DbResult<bool> {
        let key = format!("{}{}", keys::LOCK, resource);
        self.delete(&key).await
    }
}
