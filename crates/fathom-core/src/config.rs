//! Worker configuration loaded from environment variables.

use std::env;

const DB_MAX_CONNECTIONS: u32 = 10;
const KAFKA_GROUP_ID: &str = "fathom-media-worker";
const KAFKA_POLL_INTERVAL_MS: u64 = 1000;
const KAFKA_MAX_BATCH_SIZE: usize = 50;
const THUMBNAIL_SIZES: &[u32] = &[256, 1024];

/// Media worker configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub kafka_brokers: String,
    pub kafka_group_id: String,
    pub kafka_poll_interval_ms: u64,
    pub kafka_max_batch_size: usize,
    pub s3_bucket: String,
    pub s3_region: String,
    /// Custom endpoint for S3-compatible providers (MinIO etc.).
    pub s3_endpoint: Option<String>,
    /// Bounding-box edge lengths for generated thumbnails, ascending.
    pub thumbnail_sizes: Vec<u32>,
}

impl Config {
    /// Load configuration from the environment. `DATABASE_URL`,
    /// `KAFKA_BROKERS` and `S3_BUCKET` are required; everything else has a
    /// default.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = require("DATABASE_URL")?;
        let kafka_brokers = require("KAFKA_BROKERS")?;
        let s3_bucket = require("S3_BUCKET")?;

        let thumbnail_sizes = match env::var("THUMBNAIL_SIZES") {
            Ok(raw) => parse_sizes(&raw)?,
            Err(_) => THUMBNAIL_SIZES.to_vec(),
        };

        Ok(Config {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            kafka_brokers,
            kafka_group_id: env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| KAFKA_GROUP_ID.to_string()),
            kafka_poll_interval_ms: parse_or("KAFKA_POLL_INTERVAL_MS", KAFKA_POLL_INTERVAL_MS),
            kafka_max_batch_size: parse_or("KAFKA_MAX_BATCH_SIZE", KAFKA_MAX_BATCH_SIZE),
            s3_bucket,
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            thumbnail_sizes,
        })
    }
}

fn require(key: &str) -> Result<String, anyhow::Error> {
    env::var(key).map_err(|_| anyhow::anyhow!("{} environment variable must be set", key))
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_sizes(raw: &str) -> Result<Vec<u32>, anyhow::Error> {
    let mut sizes = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let size: u32 = part
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid THUMBNAIL_SIZES entry: {}", part))?;
        sizes.push(size);
    }
    if sizes.is_empty() {
        anyhow::bail!("THUMBNAIL_SIZES must list at least one size");
    }
    sizes.sort_unstable();
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sizes() {
        assert_eq!(parse_sizes("256,1024").unwrap(), vec![256, 1024]);
        assert_eq!(parse_sizes("1024, 128").unwrap(), vec![128, 1024]);
        assert!(parse_sizes("256,big").is_err());
        assert!(parse_sizes("").is_err());
    }
}
