// config.rs
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub redis_url: Option<String>,
    pub push_webhook_url: Option<String>,
    pub snapshot_retention_days: u64,
    pub flush_batch_size: usize,
    pub processing_chunk_size: usize,
    pub lookback_hours: u64,
    pub result_cache_ttl_secs: u64,
    pub processing_interval_secs: u64,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::configuration("DATABASE_URL must be set"))?;

        Ok(AppConfig {
            database_url,
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "match_telemetry".to_string()),
            redis_url: optional_var("REDIS_URL"),
            push_webhook_url: optional_var("PUSH_WEBHOOK_URL"),
            snapshot_retention_days: parsed_var("SNAPSHOT_RETENTION_DAYS", 30)?,
            // Store inserts are capped at 100 documents per call.
            flush_batch_size: parsed_var("FLUSH_BATCH_SIZE", 100usize)?.clamp(1, 100),
            processing_chunk_size: parsed_var("PROCESSING_CHUNK_SIZE", 5usize)?.max(1),
            lookback_hours: parsed_var("LOOKBACK_HOURS", 24)?,
            result_cache_ttl_secs: parsed_var("RESULT_CACHE_TTL_SECS", 300)?,
            processing_interval_secs: parsed_var("PROCESSING_INTERVAL_SECS", 600)?.max(1),
            port: parsed_var("PORT", 10000)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        })
    }

    pub fn snapshot_retention(&self) -> Duration {
        Duration::from_secs(self.snapshot_retention_days * 24 * 60 * 60)
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_hours * 60 * 60)
    }

    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.result_cache_ttl_secs)
    }

    pub fn processing_interval(&self) -> Duration {
        Duration::from_secs(self.processing_interval_secs)
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "database_name": self.database_name,
            "database_url_set": !self.database_url.is_empty(),
            "redis_cache": self.redis_url.is_some(),
            "push_webhook": self.push_webhook_url.is_some(),
            "snapshot_retention_days": self.snapshot_retention_days,
            "flush_batch_size": self.flush_batch_size,
            "processing_chunk_size": self.processing_chunk_size,
            "lookback_hours": self.lookback_hours,
            "result_cache_ttl_secs": self.result_cache_ttl_secs,
            "processing_interval_secs": self.processing_interval_secs,
            "port": self.port,
            "host": self.host,
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{} must be a number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
