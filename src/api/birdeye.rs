//! Birdeye API Client
//!
//! Two roles: chain-specific market-cap enrichment during ingestion, and
//! the security/creator lookups the vetting orchestrator needs
//! (mint/freeze authority, LP lock state, creator behaviour).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::FreshCache;
use crate::ingest::payload::{MarketCapEntry, ProviderPayload};
use crate::models::FeedSource;

const BIRDEYE_BASE_URL: &str = "https://public-api.birdeye.so";

// --- Response Structs ---

#[derive(Debug, Deserialize, Serialize, Clone)]
struct ApiResponse<T> {
    data: Option<T>,
    success: bool,
}

/// Token overview from /defi/token_overview.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenOverviewData {
    pub address: String,
    pub decimals: Option<u8>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub logo_uri: Option<String>,

    pub price: Option<f64>,
    pub mc: Option<f64>,
    pub supply: Option<f64>,
    pub liquidity: Option<f64>,

    pub v24h_usd: Option<f64>,
    pub v24h_change_percent: Option<f64>,
    pub trade24h: Option<u64>,
    pub holder: Option<u64>,
}

/// Security report from /defi/token_security. Everything optional;
/// missing data is the scorer's problem, not the client's.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenSecurityData {
    pub is_mintable: Option<bool>,
    pub is_freezable: Option<bool>,
    pub lp_lock_percentage: Option<f64>,
    pub lp_burned: Option<bool>,
    pub total_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub creator_address: Option<String>,
    pub creator_percentage: Option<f64>,
    pub creator_status: Option<String>,
    pub top10_holder_rate: Option<f64>,
    pub creator_token_count: Option<u32>,
    /// ISO timestamp of first mint, used to derive token age.
    pub creation_time: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct TokenListData {
    #[serde(default)]
    tokens: Vec<TokenListItem>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenListItem {
    address: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    liquidity: Option<f64>,
    #[serde(default)]
    v24h_usd: Option<f64>,
    #[serde(default)]
    mc: Option<f64>,
    #[serde(default)]
    holder: Option<u64>,
    #[serde(default)]
    logo_uri: Option<String>,
}

// --- Birdeye Client Implementation ---

#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    api_key: String,
    client: Client,
    base_url: String,
    cache: FreshCache,
    cache_ttl: Duration,
}

impl BirdeyeClient {
    pub fn new(api_key: &str, cache: FreshCache, cache_ttl: Duration) -> Self {
        Self::with_base_url(BIRDEYE_BASE_URL, api_key, cache, cache_ttl)
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
                .expect("Failed to create HTTP client for Birdeye"),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned + Serialize>(
        &self,
        endpoint: &str,
        op: &str,
        address: &str,
    ) -> Result<Option<T>> {
        if let Some(cached) = self.cache.get(op, address).await {
            if let Ok(data) = serde_json::from_value::<T>(cached) {
                return Ok(Some(data));
            }
        }

        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .query(&[("address", address)])
            .send()
            .await
            .with_context(|| format!("Failed to send request to Birdeye {}", endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Birdeye {} API error for {}: {} - {}", endpoint, address, status, error_text);
            return Ok(None);
        }

        let parsed: ApiResponse<T> = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse Birdeye {} response for {}: {:?}; ignoring", endpoint, address, e);
                return Ok(None);
            }
        };

        if !parsed.success {
            warn!("Birdeye {} reported failure for {}", endpoint, address);
            return Ok(None);
        }

        if let Some(ref data) = parsed.data {
            if let Ok(value) = serde_json::to_value(data) {
                self.cache.set(op, address, value, self.cache_ttl).await;
            }
        }

        Ok(parsed.data)
    }

    /// Fetch the token overview (market metrics + holder count).
    pub async fn get_token_overview(&self, token_address: &str) -> Result<Option<TokenOverviewData>> {
        debug!("Fetching token overview from Birdeye for {}", token_address);
        self.get_json("/defi/token_overview", "be_overview", token_address)
            .await
    }

    /// Fetch the token security report (authorities, LP locks, creator).
    pub async fn get_token_security(&self, token_address: &str) -> Result<Option<TokenSecurityData>> {
        debug!("Fetching token security from Birdeye for {}", token_address);
        self.get_json("/defi/token_security", "be_security", token_address)
            .await
    }

    /// Top tokens by 24h volume, used as the market-cap enrichment feed.
    pub async fn get_token_list(&self, limit: u32) -> Result<Vec<TokenListItem>> {
        let url = format!("{}/defi/tokenlist", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .query(&[
                ("sort_by", "v24hUSD"),
                ("sort_type", "desc"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Birdeye token list endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Birdeye token list API error: {} - {}", status, error_text);
            return Ok(vec![]);
        }

        let parsed: ApiResponse<TokenListData> = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse Birdeye token list response: {:?}; ignoring", e);
                return Ok(vec![]);
            }
        };

        Ok(parsed.data.map(|d| d.tokens).unwrap_or_default())
    }

    /// Market-cap payload for the merger. Birdeye is Solana-only here.
    pub async fn fetch_payload(&self, limit: u32) -> Result<ProviderPayload> {
        let tokens = self.get_token_list(limit).await?;
        let entries: Vec<MarketCapEntry> = tokens
            .into_iter()
            .map(|t| MarketCapEntry {
                chain_id: "solana".to_string(),
                address: t.address,
                symbol: t.symbol.unwrap_or_default(),
                name: t.name.unwrap_or_default(),
                price_usd: t.price,
                liquidity_usd: t.liquidity,
                volume_h24: t.v24h_usd,
                fdv: t.mc,
                holders: t.holder,
                logo_url: t.logo_uri,
                category: None,
            })
            .collect();

        info!("Birdeye: {} market-cap entries fetched", entries.len());
        Ok(ProviderPayload::MarketCap {
            source: FeedSource::Birdeye,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> BirdeyeClient {
        BirdeyeClient::with_base_url(
            &server.url(),
            "test-key",
            FreshCache::new(),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_token_security_parsing() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "success": true,
            "data": {
                "isMintable": false,
                "isFreezable": false,
                "lpLockPercentage": 95.5,
                "lpBurned": true,
                "totalSupply": 1000000000.0,
                "circulatingSupply": 990000000.0,
                "creatorAddress": "CreatorMint111",
                "creatorPercentage": 2.1,
                "top10HolderRate": 22.0
            }
        }"#;
        server
            .mock("GET", "/defi/token_security")
            .match_query(mockito::Matcher::UrlEncoded("address".into(), "MintAAA".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = test_client(&server);
        let security = client.get_token_security("MintAAA").await.unwrap().unwrap();

        assert_eq!(security.is_mintable, Some(false));
        assert_eq!(security.lp_lock_percentage, Some(95.5));
        assert_eq!(security.creator_address.as_deref(), Some("CreatorMint111"));
    }

    #[tokio::test]
    async fn test_unsuccessful_response_yields_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defi/token_overview")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "data": null}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        assert!(client.get_token_overview("MintAAA").await.unwrap().is_none());
    }
}
