//! GeckoTerminal API Client (secondary aggregator)
//!
//! Carries price/liquidity/volume refresh data but no transaction
//! counts, so the merger only lets it update records that already have
//! them. Responses follow the JSON:API shape: numeric values arrive as
//! strings under `attributes`, token addresses inside relationship ids.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::FreshCache;
use crate::ingest::payload::{AggregatorEntry, ProviderPayload};
use crate::models::FeedSource;

const GECKOTERMINAL_BASE_URL: &str = "https://api.geckoterminal.com/api/v2";

#[derive(Debug, Clone, Deserialize)]
struct PoolListResponse {
    #[serde(default)]
    data: Vec<PoolResource>,
}

#[derive(Debug, Clone, Deserialize)]
struct PoolResource {
    attributes: PoolAttributes,
    relationships: PoolRelationships,
}

#[derive(Debug, Clone, Deserialize)]
struct PoolAttributes {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    base_token_price_usd: Option<String>,
    #[serde(default)]
    reserve_in_usd: Option<String>,
    #[serde(default)]
    volume_usd: PoolWindowValues,
    #[serde(default)]
    price_change_percentage: PoolWindowValues,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PoolWindowValues {
    #[serde(default)]
    h24: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PoolRelationships {
    base_token: RelationshipWrapper,
}

#[derive(Debug, Clone, Deserialize)]
struct RelationshipWrapper {
    data: RelationshipData,
}

#[derive(Debug, Clone, Deserialize)]
struct RelationshipData {
    /// Relationship ids look like "solana_<address>".
    id: String,
}

fn parse_string_f64(value: &Option<String>) -> Option<f64> {
    value
        .as_ref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[derive(Debug, Clone)]
pub struct GeckoTerminalClient {
    client: Client,
    base_url: String,
    cache: FreshCache,
    cache_ttl: Duration,
}

impl GeckoTerminalClient {
    pub fn new(cache: FreshCache, cache_ttl: Duration) -> Self {
        Self::with_base_url(GECKOTERMINAL_BASE_URL, cache, cache_ttl)
    }

    pub fn with_base_url(base_url: &str, cache: FreshCache, cache_ttl: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(8))
                .build()
                .expect("Failed to create HTTP client for GeckoTerminal"),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl,
        }
    }

    /// Fetch trending pools on one network and map them to aggregator
    /// entries.
    pub async fn get_trending_entries(&self, network: &str) -> Result<Vec<AggregatorEntry>> {
        if let Some(cached) = self.cache.get("gt_trending", network).await {
            if let Ok(entries) = serde_json::from_value::<Vec<AggregatorEntry>>(cached) {
                return Ok(entries);
            }
        }

        let url = format!("{}/networks/{}/trending_pools", self.base_url, network);
        debug!("Fetching trending pools from GeckoTerminal: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to GeckoTerminal trending endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("GeckoTerminal API error for {}: {} - {}", network, status, error_text);
            return Ok(vec![]);
        }

        let parsed: PoolListResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse GeckoTerminal response for {}: {:?}; ignoring", network, e);
                return Ok(vec![]);
            }
        };

        let entries: Vec<AggregatorEntry> = parsed
            .data
            .into_iter()
            .filter_map(|pool| Self::entry_from_pool(network, pool))
            .collect();

        if let Ok(value) = serde_json::to_value(&entries) {
            self.cache.set("gt_trending", network, value, self.cache_ttl).await;
        }

        Ok(entries)
    }

    /// Convert one pool resource into an aggregator entry. Pools whose
    /// base-token relationship id doesn't carry an address are skipped.
    fn entry_from_pool(network: &str, pool: PoolResource) -> Option<AggregatorEntry> {
        let id = &pool.relationships.base_token.data.id;
        let address = id.split_once('_').map(|(_, addr)| addr.to_string())?;
        if address.is_empty() {
            return None;
        }

        // Pool names look like "AAA / SOL"; the base symbol is the prefix
        let symbol = pool
            .attributes
            .name
            .as_deref()
            .and_then(|n| n.split('/').next())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        Some(AggregatorEntry {
            chain_id: network.to_string(),
            address,
            symbol: symbol.clone(),
            name: symbol,
            price_usd: parse_string_f64(&pool.attributes.base_token_price_usd),
            liquidity_usd: parse_string_f64(&pool.attributes.reserve_in_usd),
            volume_h24: parse_string_f64(&pool.attributes.volume_usd.h24),
            price_change_h24: parse_string_f64(&pool.attributes.price_change_percentage.h24),
            fdv: None,
        })
    }

    /// Aggregator payload across the configured networks.
    pub async fn fetch_payload(&self, networks: &[String]) -> Result<ProviderPayload> {
        let mut entries = Vec::new();
        for network in networks {
            match self.get_trending_entries(network).await {
                Ok(mut network_entries) => entries.append(&mut network_entries),
                Err(e) => warn!("GeckoTerminal fetch failed for {}: {:?}", network, e),
            }
        }

        info!("GeckoTerminal: {} aggregator entries fetched", entries.len());
        Ok(ProviderPayload::Aggregator {
            source: FeedSource::GeckoTerminal,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trending_pools_parsing() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "data": [{
                "attributes": {
                    "name": "AAA / SOL",
                    "base_token_price_usd": "0.0125",
                    "reserve_in_usd": "42000.5",
                    "volume_usd": {"h24": "9000"},
                    "price_change_percentage": {"h24": "-4.2"}
                },
                "relationships": {
                    "base_token": {"data": {"id": "solana_MintAAA"}}
                }
            }]
        }"#;
        server
            .mock("GET", "/networks/solana/trending_pools")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = GeckoTerminalClient::with_base_url(
            &server.url(),
            FreshCache::new(),
            Duration::from_secs(60),
        );
        let entries = client.get_trending_entries("solana").await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address, "MintAAA");
        assert_eq!(entries[0].symbol, "AAA");
        assert_eq!(entries[0].price_usd, Some(0.0125));
        assert_eq!(entries[0].liquidity_usd, Some(42000.5));
        assert_eq!(entries[0].price_change_h24, Some(-4.2));
    }

    #[tokio::test]
    async fn test_malformed_body_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/networks/solana/trending_pools")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = GeckoTerminalClient::with_base_url(
            &server.url(),
            FreshCache::new(),
            Duration::from_secs(60),
        );
        assert!(client.get_trending_entries("solana").await.unwrap().is_empty());
    }
}
