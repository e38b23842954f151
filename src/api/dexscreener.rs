//! DexScreener API Client (market-pairs provider)
//!
//! Highest-volume feed. Discovers candidate tokens from the latest
//! profile lists, then pulls pair details in batches of 30 addresses.
//! All failures degrade to empty results; the ingestion cycle never
//! blocks on this provider.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::FreshCache;
use crate::ingest::payload::{DexPair, ProviderPayload};
use crate::models::FeedSource;

const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";

/// Addresses per pair-detail batch request.
const PAIR_BATCH_SIZE: usize = 30;

/// Entry from the token-profiles discovery endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenProfile {
    pub chain_id: String,
    pub token_address: String,
}

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: Client,
    base_url: String,
    cache: FreshCache,
    cache_ttl: Duration,
}

impl DexScreenerClient {
    pub fn new(cache: FreshCache, cache_ttl: Duration) -> Self {
        Self::with_base_url(DEXSCREENER_BASE_URL, cache, cache_ttl)
    }

    /// Base URL override, used by tests against a local mock server.
    pub fn with_base_url(base_url: &str, cache: FreshCache, cache_ttl: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to create HTTP client for DexScreener"),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl,
        }
    }

    /// Fetch the latest token profiles (candidate discovery).
    pub async fn get_latest_profiles(&self) -> Result<Vec<TokenProfile>> {
        let url = format!("{}/token-profiles/latest/v1", self.base_url);
        debug!("Fetching token profiles from DexScreener: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to DexScreener profiles endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("DexScreener profiles API error: {} - {}", status, error_text);
            return Ok(vec![]);
        }

        let profiles: Vec<TokenProfile> = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse DexScreener profiles response: {:?}; ignoring", e);
                return Ok(vec![]);
            }
        };

        debug!("DexScreener returned {} token profiles", profiles.len());
        Ok(profiles)
    }

    /// Fetch pair details for a batch of token addresses on one chain.
    pub async fn get_pairs(&self, chain_id: &str, addresses: &[String]) -> Result<Vec<DexPair>> {
        if addresses.is_empty() {
            return Ok(vec![]);
        }

        let joined = addresses.join(",");
        if let Some(cached) = self.cache.get("dex_pairs", &joined).await {
            if let Ok(pairs) = serde_json::from_value::<Vec<DexPair>>(cached) {
                return Ok(pairs);
            }
        }

        let url = format!("{}/tokens/v1/{}/{}", self.base_url, chain_id, joined);
        debug!("Fetching pair details from DexScreener ({} addresses)", addresses.len());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to DexScreener pairs endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("DexScreener pairs API error: {} - {}", status, error_text);
            return Ok(vec![]);
        }

        let pairs: Vec<DexPair> = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse DexScreener pairs response: {:?}; ignoring", e);
                return Ok(vec![]);
            }
        };

        if let Ok(value) = serde_json::to_value(&pairs) {
            self.cache.set("dex_pairs", &joined, value, self.cache_ttl).await;
        }

        Ok(pairs)
    }

    /// Fetch pairs for a single token, used by the monitoring sampler.
    pub async fn get_token_pairs(&self, chain_id: &str, address: &str) -> Result<Vec<DexPair>> {
        self.get_pairs(chain_id, &[address.to_string()]).await
    }

    /// Full discovery pass: profiles, then pair details per chain in
    /// batches. Returns the payload the merger consumes.
    pub async fn fetch_payload(&self) -> Result<ProviderPayload> {
        let profiles = self.get_latest_profiles().await?;

        // Group discovered addresses by chain before batching
        let mut by_chain: std::collections::HashMap<String, Vec<String>> =
            std::collections::HashMap::new();
        for profile in profiles {
            by_chain
                .entry(profile.chain_id)
                .or_default()
                .push(profile.token_address);
        }

        let mut pairs = Vec::new();
        for (chain_id, addresses) in by_chain {
            for batch in addresses.chunks(PAIR_BATCH_SIZE) {
                match self.get_pairs(&chain_id, batch).await {
                    Ok(mut batch_pairs) => pairs.append(&mut batch_pairs),
                    Err(e) => {
                        warn!("DexScreener batch fetch failed on {}: {:?}", chain_id, e);
                    }
                }
            }
        }

        info!("DexScreener: {} pairs fetched", pairs.len());
        Ok(ProviderPayload::DexPairs {
            source: FeedSource::DexScreener,
            pairs,
        })
    }
}
