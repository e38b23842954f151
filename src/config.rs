use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub birdeye_api_key: String,
    pub moralis_api_key: String,
    pub webhook_url: Option<String>, // Optional, channel disabled when unset

    pub store_path: String,
    pub cache_ttl_secs: u64,

    pub ingestion_interval_secs: u64,
    pub vetting_interval_secs: u64,
    pub monitoring_interval_secs: u64,

    pub aggregator_networks: Vec<String>,
    pub market_cap_limit: u32,
    pub fetch_timeout_secs: u64,

    pub vetting_batch_size: usize,
    pub monitoring_batch_size: usize,
    pub batch_delay_ms: u64,
    pub vetting_stale_after_hours: i64,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Comma-separated list of aggregator networks
        let aggregator_networks = env::var("AGGREGATOR_NETWORKS")
            .unwrap_or_else(|_| "solana".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            birdeye_api_key: env::var("BIRDEYE_API_KEY")
                .context("BIRDEYE_API_KEY not set in environment")?,
            moralis_api_key: env::var("MORALIS_API_KEY")
                .context("MORALIS_API_KEY not set in environment")?,
            webhook_url: env::var("LISTING_WEBHOOK_URL").ok(), // Optional

            store_path: env::var("STORE_PATH")
                .unwrap_or_else(|_| "data/listings.json".to_string()),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),

            ingestion_interval_secs: env::var("INGESTION_INTERVAL_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .unwrap_or(1800),
            vetting_interval_secs: env::var("VETTING_INTERVAL_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap_or(600),
            monitoring_interval_secs: env::var("MONITORING_INTERVAL_SECS")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()
                .unwrap_or(1800),

            aggregator_networks,
            market_cap_limit: env::var("MARKET_CAP_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),

            vetting_batch_size: env::var("VETTING_BATCH_SIZE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            monitoring_batch_size: env::var("MONITORING_BATCH_SIZE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            batch_delay_ms: env::var("BATCH_DELAY_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            vetting_stale_after_hours: env::var("VETTING_STALE_AFTER_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
        })
    }
}
