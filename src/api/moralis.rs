//! Moralis API Client (holder-count provider)
//!
//! Supplies holder counts and top-holder distribution for the vetting
//! orchestrator, plus a market-cap style enrichment payload. Holder
//! counts are parsed defensively because the field name differs across
//! endpoint versions.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::FreshCache;
use crate::ingest::payload::parse_holder_count;
use crate::models::HolderShare;

const MORALIS_SOLANA_BASE_URL: &str = "https://solana-gateway.moralis.io";

/// One row from the top-holders endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopHolderRow {
    owner_address: String,
    #[serde(default)]
    percentage_relative_to_total_supply: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct TopHoldersResponse {
    #[serde(default)]
    result: Vec<TopHolderRow>,
}

#[derive(Debug, Clone)]
pub struct MoralisClient {
    api_key: String,
    client: Client,
    base_url: String,
    cache: FreshCache,
    cache_ttl: Duration,
}

impl MoralisClient {
    pub fn new(api_key: &str, cache: FreshCache, cache_ttl: Duration) -> Self {
        Self::with_base_url(MORALIS_SOLANA_BASE_URL, api_key, cache, cache_ttl)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        cache: FreshCache,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to create HTTP client for Moralis"),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl,
        }
    }

    /// Fetch holder count for a token. `None` when the provider has no
    /// answer; 403/rate-limit degrades the same way.
    pub async fn get_holder_count(&self, token_address: &str) -> Result<Option<u64>> {
        if let Some(cached) = self.cache.get("mo_holders", token_address).await {
            if let Some(count) = cached.as_u64() {
                return Ok(Some(count));
            }
        }

        let url = format!("{}/token/mainnet/holders/{}", self.base_url, token_address);
        debug!("Fetching holder count from Moralis for {}", token_address);

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Moralis holders endpoint")?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            warn!("Moralis API returned 403 - may be rate limited or endpoint requires paid tier");
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Moralis holders API error for {}: {} - {}", token_address, status, error_text);
            return Ok(None);
        }

        let raw: Value = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse Moralis holders response for {}: {:?}; ignoring", token_address, e);
                return Ok(None);
            }
        };

        let count = parse_holder_count(&raw);
        if let Some(count) = count {
            self.cache
                .set("mo_holders", token_address, Value::from(count), self.cache_ttl)
                .await;
        }
        Ok(count)
    }

    /// Fetch the top holders of a token with their supply share.
    pub async fn get_top_holders(
        &self,
        token_address: &str,
        limit: u32,
    ) -> Result<Vec<HolderShare>> {
        let url = format!(
            "{}/token/mainnet/{}/top-holders",
            self.base_url, token_address
        );
        debug!("Fetching top holders from Moralis for {}", token_address);

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .context("Failed to send request to Moralis top-holders endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Moralis top-holders API error for {}: {} - {}", token_address, status, error_text);
            return Ok(vec![]);
        }

        let parsed: TopHoldersResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse Moralis top-holders response for {}: {:?}; ignoring", token_address, e);
                return Ok(vec![]);
            }
        };

        Ok(parsed
            .result
            .into_iter()
            .filter_map(|row| {
                row.percentage_relative_to_total_supply.map(|pct| HolderShare {
                    address: row.owner_address,
                    percentage: pct,
                })
            })
            .collect())
    }
}
