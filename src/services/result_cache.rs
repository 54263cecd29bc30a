// src/services/result_cache.rs
use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::Result;

pub const PREDICTION_RESULTS_KEY: &str = "prediction_results";

/// Single-slot key/value cache with per-entry expiry.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn try_get(&self, key: &str) -> Result<Option<String>>;
}

pub async fn set_json<T: Serialize + Sync>(
    cache: &dyn ResultCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let encoded = serde_json::to_string(value)?;
    cache.set(key, encoded, ttl).await
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn ResultCache, key: &str) -> Result<Option<T>> {
    match cache.try_get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct RedisResultCache {
    connection: MultiplexedConnection,
}

impl RedisResultCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        tracing::info!("✅ Connected to Redis result cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl ResultCache for RedisResultCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        // Redis rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn try_get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}

/// Process-local fallback used when no Redis URL is configured.
#[derive(Default)]
pub struct InMemoryResultCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now() + ttl;
        self.entries.lock().insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn try_get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
