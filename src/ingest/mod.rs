//! Feed ingestion pipeline
//!
//! One cycle fans out to the provider clients concurrently, merges the
//! payloads into canonical records, upserts them and pushes the
//! `{new, updated}` delta to the notification channel. A single atomic
//! in-flight guard serializes cycles; a superseded cycle simply
//! finishes and its writes are the latest at the store.

pub mod merge;
pub mod payload;
pub mod validators;

use anyhow::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::api::birdeye::BirdeyeClient;
use crate::api::dexscreener::DexScreenerClient;
use crate::api::geckoterminal::GeckoTerminalClient;
use crate::cache::FreshCache;
use crate::error::VetguardError;
use crate::notify::Notifier;
use crate::store::ListingStore;
use payload::ProviderPayload;

#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Networks polled on the aggregator feed.
    pub aggregator_networks: Vec<String>,
    /// Row limit for the market-cap enrichment feed.
    pub market_cap_limit: u32,
    /// Per-provider fetch timeout.
    pub fetch_timeout_secs: u64,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            aggregator_networks: vec!["solana".to_string()],
            market_cap_limit: 100,
            fetch_timeout_secs: 8,
        }
    }
}

/// Structured summary of one ingestion cycle.
#[derive(Debug, Default, Clone)]
pub struct IngestionSummary {
    pub providers_ok: usize,
    pub providers_failed: usize,
    pub records_merged: usize,
    pub new_listings: usize,
    pub updated_listings: usize,
    pub persist_failures: usize,
    pub duration_ms: u128,
}

pub struct FeedIngestor {
    dexscreener: Arc<DexScreenerClient>,
    geckoterminal: Arc<GeckoTerminalClient>,
    birdeye: Arc<BirdeyeClient>,
    store: Arc<dyn ListingStore>,
    notifier: Arc<Notifier>,
    cache: FreshCache,
    config: IngestorConfig,
    in_flight: AtomicBool,
}

impl FeedIngestor {
    pub fn new(
        dexscreener: Arc<DexScreenerClient>,
        geckoterminal: Arc<GeckoTerminalClient>,
        birdeye: Arc<BirdeyeClient>,
        store: Arc<dyn ListingStore>,
        notifier: Arc<Notifier>,
        cache: FreshCache,
        config: IngestorConfig,
    ) -> Self {
        Self {
            dexscreener,
            geckoterminal,
            birdeye,
            store,
            notifier,
            cache,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one ingestion cycle. Returns `CycleInFlight` when the prior
    /// cycle has not finished yet.
    pub async fn run_ingestion_cycle(&self) -> Result<IngestionSummary> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(VetguardError::CycleInFlight("ingestion".to_string()).into());
        }

        let summary = self.run_cycle_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(summary)
    }

    async fn run_cycle_inner(&self) -> IngestionSummary {
        let started = Instant::now();
        let mut summary = IngestionSummary::default();
        let fetch_timeout = Duration::from_secs(self.config.fetch_timeout_secs);

        // Concurrent provider fan-out; each fetch degrades to absence
        let (dex, aggregator, market_cap) = tokio::join!(
            fetch_payload("dexscreener", fetch_timeout, self.dexscreener.fetch_payload()),
            fetch_payload(
                "geckoterminal",
                fetch_timeout,
                self.geckoterminal.fetch_payload(&self.config.aggregator_networks),
            ),
            fetch_payload(
                "birdeye",
                fetch_timeout,
                self.birdeye.fetch_payload(self.config.market_cap_limit),
            ),
        );

        // Precedence is positional: pairs first, aggregator refresh,
        // market-cap enrichment last
        let mut payloads = Vec::new();
        for result in [dex, aggregator, market_cap] {
            match result {
                Some(payload) => {
                    summary.providers_ok += 1;
                    payloads.push(payload);
                }
                None => summary.providers_failed += 1,
            }
        }

        let merged = merge::merge(&payloads);
        summary.records_merged = merged.len();

        let mut new_keys = Vec::new();
        let mut updated_keys = Vec::new();
        for record in merged.values() {
            match self.store.upsert_market_metadata(record).await {
                Ok(true) => new_keys.push(record.key.clone()),
                Ok(false) => updated_keys.push(record.key.clone()),
                Err(e) => {
                    summary.persist_failures += 1;
                    warn!("Failed to upsert {}: {:?}", record.key, e);
                }
            }
        }
        summary.new_listings = new_keys.len();
        summary.updated_listings = updated_keys.len();

        // Best-effort delta push; never blocks persistence
        self.notifier.publish_listing_delta(&new_keys, &updated_keys).await;

        self.cache.purge_expired().await;

        summary.duration_ms = started.elapsed().as_millis();
        info!(
            "Ingestion cycle done: {}/{} providers, {} merged, {} new, {} updated, {} persist failures, {}ms",
            summary.providers_ok,
            summary.providers_ok + summary.providers_failed,
            summary.records_merged,
            summary.new_listings,
            summary.updated_listings,
            summary.persist_failures,
            summary.duration_ms
        );
        summary
    }
}

/// Bound one provider fetch with a timeout and convert every failure
/// mode to absence.
async fn fetch_payload<F>(name: &str, limit: Duration, fut: F) -> Option<ProviderPayload>
where
    F: Future<Output = Result<ProviderPayload>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(payload)) => Some(payload),
        Ok(Err(e)) => {
            warn!("Provider {} failed: {:?}", name, e);
            None
        }
        Err(_) => {
            warn!("Provider {} timed out after {:?}", name, limit);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chain, TokenKey};
    use crate::store::FileStore;

    fn temp_store() -> Arc<FileStore> {
        let path = std::env::temp_dir().join(format!("vetguard-ing-{}.json", uuid::Uuid::new_v4()));
        Arc::new(FileStore::new(path))
    }

    async fn ingestor_with_mock(server: &mockito::ServerGuard, store: Arc<FileStore>) -> FeedIngestor {
        let cache = FreshCache::new();
        FeedIngestor::new(
            Arc::new(DexScreenerClient::with_base_url(
                &server.url(),
                cache.clone(),
                Duration::from_secs(0),
            )),
            Arc::new(GeckoTerminalClient::with_base_url(
                &server.url(),
                cache.clone(),
                Duration::from_secs(0),
            )),
            Arc::new(BirdeyeClient::with_base_url(
                &server.url(),
                "k",
                cache.clone(),
                Duration::from_secs(0),
            )),
            store,
            Arc::new(Notifier::new(None)),
            cache,
            IngestorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_cycle_survives_all_providers_failing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let store = temp_store();
        let ingestor = ingestor_with_mock(&server, store).await;
        let summary = ingestor.run_ingestion_cycle().await.unwrap();

        // Providers degraded to empty payloads, nothing merged, no panic
        assert_eq!(summary.records_merged, 0);
        assert_eq!(summary.persist_failures, 0);
    }

    #[tokio::test]
    async fn test_full_cycle_merges_and_upserts() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/token-profiles/latest/v1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"chainId": "solana", "tokenAddress": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"}]"#)
            .create_async()
            .await;
        server
            .mock(
                "GET",
                "/tokens/v1/solana/EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{
                    "chainId": "solana",
                    "pairAddress": "Pair111",
                    "baseToken": {"address": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "symbol": "AAA", "name": "Token AAA"},
                    "quoteToken": {"address": "So11111111111111111111111111111111111111112", "symbol": "WSOL", "name": "Wrapped SOL"},
                    "priceUsd": "0.01",
                    "liquidity": {"usd": 50000.0},
                    "volume": {"h24": 10000.0},
                    "txns": {"h24": {"buys": 5, "sells": 3}}
                }]"#,
            )
            .create_async()
            .await;
        // Aggregator and market-cap feeds are down this cycle
        server
            .mock("GET", mockito::Matcher::Regex("^/networks/.*".to_string()))
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("GET", mockito::Matcher::Regex("^/defi/.*".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let store = temp_store();
        let ingestor = ingestor_with_mock(&server, store.clone()).await;
        let summary = ingestor.run_ingestion_cycle().await.unwrap();

        assert_eq!(summary.records_merged, 1);
        assert_eq!(summary.new_listings, 1);
        assert_eq!(summary.updated_listings, 0);

        let key = TokenKey::new(Chain::Solana, "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        assert!(store.find_record(&key).await.unwrap().is_some());

        // Second run: same record counts as updated, guard was released
        let summary = ingestor.run_ingestion_cycle().await.unwrap();
        assert_eq!(summary.new_listings, 0);
        assert_eq!(summary.updated_listings, 1);
    }
}
