//! Redis cache wrapper with graceful degradation.
//!
//! Every public operation swallows Redis failures: it logs a warning and reports a miss
//! (`None` / `false`). Callers fall through to recomputing the value, so the advisor is
//! fully functional without Redis.

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::CommonError;

#[derive(Clone)]
pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Build a cache for `url`. A missing or unparsable URL yields a cache that never hits.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| {
                    warn!(error = %e, url = u, "failed to create redis client, cache disabled")
                })
                .ok()
        });
        Self { client }
    }

    /// `false` when no usable URL was configured; an enabled cache may still be unreachable.
    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Send a PING. Returns `true` if Redis is reachable.
    pub async fn is_available(&self) -> bool {
        let Ok(mut conn) = self.connection().await else {
            return false;
        };
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.usable_connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()
            .flatten()
    }

    /// Fetch and deserialize a JSON value. Undecodable entries are treated as misses.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let json = self.get(key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    /// Set a value with a TTL in seconds. Returns `true` if successful.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.usable_connection().await else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    pub async fn set_json_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.set_with_ttl(key, &json, ttl_secs).await,
            Err(e) => {
                warn!(error = %e, key, "cache serialization failed");
                false
            }
        }
    }

    /// Delete all keys matching a prefix using SCAN (not KEYS, which blocks).
    /// Returns the number of deleted keys, or `None` if Redis was unreachable.
    pub async fn delete_by_prefix(&self, prefix: &str) -> Option<usize> {
        let mut conn = self.usable_connection().await?;

        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut deleted = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .inspect_err(|e| warn!(error = %e, pattern, "redis SCAN failed"))
                .ok()?;

            if !keys.is_empty() {
                conn.del::<_, ()>(&keys)
                    .await
                    .inspect_err(|e| {
                        warn!(error = %e, "redis batch DEL failed during prefix delete")
                    })
                    .ok()?;
                deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Some(deleted)
    }

    /// Connection for a data operation. A disabled cache is silent; real failures are logged.
    async fn usable_connection(&self) -> Option<MultiplexedConnection> {
        match self.connection().await {
            Ok(conn) => Some(conn),
            Err(CommonError::RedisDisabled) => None,
            Err(e) => {
                warn!(error = %e, "redis connection failed");
                None
            }
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CommonError> {
        let client = self.client.as_ref().ok_or(CommonError::RedisDisabled)?;
        Ok(client.get_multiplexed_async_connection().await?)
    }
}
