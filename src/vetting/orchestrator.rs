//! Vetting Orchestrator
//!
//! Glue between the merged records and the pure scoring engine:
//! assembles `TokenVettingData` from the canonical record plus
//! supplementary security/holder lookups, scores, classifies and
//! persists. One token is never vetted twice concurrently; different
//! tokens proceed in small bounded batches to respect provider rate
//! limits.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::birdeye::{BirdeyeClient, TokenSecurityData};
use crate::api::moralis::MoralisClient;
use crate::models::{
    DeveloperInfo, HolderInfo, LpLock, SecurityInfo, TokenRecord, TokenVettingData, TradingInfo,
    VettingResults, VettingTokenInfo,
};
use crate::store::ListingStore;
use crate::vetting::scoring;

/// Tokens vetted concurrently within one batch.
const DEFAULT_BATCH_SIZE: usize = 5;
/// Pause between batches, keeps burst rates under provider limits.
const DEFAULT_BATCH_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// Vetting older than this is re-queued by the backlog query.
    pub stale_after: chrono::Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            stale_after: chrono::Duration::hours(24),
        }
    }
}

/// Outcome counts for one vetting cycle, logged as the cycle summary.
#[derive(Debug, Default, Clone)]
pub struct VettingCycleSummary {
    pub processed: usize,
    pub scored: usize,
    pub skipped_in_flight: usize,
    pub persist_failures: usize,
    pub duration_ms: u128,
}

pub struct VettingOrchestrator {
    birdeye: Arc<BirdeyeClient>,
    moralis: Arc<MoralisClient>,
    store: Arc<dyn ListingStore>,
    config: OrchestratorConfig,
    /// Keys currently being vetted; guards per-token serialization.
    in_flight: Mutex<HashSet<String>>,
}

impl VettingOrchestrator {
    pub fn new(
        birdeye: Arc<BirdeyeClient>,
        moralis: Arc<MoralisClient>,
        store: Arc<dyn ListingStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            birdeye,
            moralis,
            store,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Vet one token: assemble, score, persist. Returns `None` when the
    /// key is already being vetted. A persistence failure is logged and
    /// counted by the caller but never rolls back the computed results.
    pub async fn vet_record(&self, record: &TokenRecord) -> Option<VettingResults> {
        let key_str = record.key.to_string();
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(key_str.clone()) {
                debug!("Vetting already in flight for {}, skipping", key_str);
                return None;
            }
        }

        let results = self.vet_record_inner(record).await;

        let mut in_flight = self.in_flight.lock().await;
        in_flight.remove(&key_str);
        Some(results)
    }

    async fn vet_record_inner(&self, record: &TokenRecord) -> VettingResults {
        let data = self.assemble_vetting_data(record).await;
        let results = scoring::score(&data);

        info!(
            "Vetted {} ({}): score {}, risk {:?}, tier {}",
            record.symbol, record.key, results.overall_score, results.risk_level,
            results.eligible_tier
        );

        if let Err(e) = self.store.save_vetting_results(&results).await {
            // Surfaced via the cycle summary; the score itself stands.
            error!("Failed to persist vetting results for {}: {:?}", record.key, e);
        }

        results
    }

    /// Build the scoring input from the canonical record plus security
    /// and holder lookups. Every lookup failure degrades to absence.
    async fn assemble_vetting_data(&self, record: &TokenRecord) -> TokenVettingData {
        let address = &record.key.address;

        let security_data = match self.birdeye.get_token_security(address).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Security lookup failed for {}: {:?}", record.key, e);
                None
            }
        };

        let overview = match self.birdeye.get_token_overview(address).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Overview lookup failed for {}: {:?}", record.key, e);
                None
            }
        };

        // Holder count falls through the providers in precedence order
        let holder_count = match self.moralis.get_holder_count(address).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Holder count lookup failed for {}: {:?}", record.key, e);
                None
            }
        }
        .or(overview.as_ref().and_then(|o| o.holder))
        .or(record.market.holders);

        let top_holders = match self.moralis.get_top_holders(address, 10).await {
            Ok(holders) => holders,
            Err(e) => {
                warn!("Top holder lookup failed for {}: {:?}", record.key, e);
                vec![]
            }
        };

        let token_age_days = security_data
            .as_ref()
            .and_then(|s| s.creation_time.as_deref())
            .and_then(parse_age_days);

        let (security, developer) = match security_data {
            Some(data) => split_security(data),
            None => (SecurityInfo::default(), DeveloperInfo::default()),
        };

        TokenVettingData {
            token_info: VettingTokenInfo {
                key: record.key.clone(),
                symbol: record.symbol.clone(),
                name: record.name.clone(),
            },
            security,
            holders: HolderInfo {
                count: holder_count,
                top_holders,
            },
            developer,
            trading: TradingInfo {
                price: record
                    .market
                    .price_usd
                    .or(overview.as_ref().and_then(|o| o.price)),
                liquidity: record
                    .market
                    .liquidity_usd
                    .or(overview.as_ref().and_then(|o| o.liquidity)),
                volume_24h: Some(record.market.volume_h24),
                price_change_24h: record.market.price_change.h24,
                fdv: record.market.fdv.or(overview.as_ref().and_then(|o| o.mc)),
                holder_count,
            },
            token_age_days,
        }
    }

    /// Run one cycle over the store's vetting backlog.
    pub async fn run_vetting_cycle(&self) -> Result<VettingCycleSummary> {
        let started = Instant::now();
        let mut summary = VettingCycleSummary::default();

        let backlog = self.store.list_vetting_backlog(self.config.stale_after).await?;
        if backlog.is_empty() {
            debug!("Vetting backlog empty");
            return Ok(summary);
        }

        info!("Vetting cycle: {} tokens in backlog", backlog.len());

        for batch in backlog.chunks(self.config.batch_size.max(1)) {
            let outcomes = join_all(batch.iter().map(|record| self.vet_record(record))).await;
            for outcome in outcomes {
                summary.processed += 1;
                match outcome {
                    Some(_) => summary.scored += 1,
                    None => summary.skipped_in_flight += 1,
                }
            }
            tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
        }

        summary.duration_ms = started.elapsed().as_millis();
        info!(
            "Vetting cycle done: {} processed, {} scored, {} skipped, {}ms",
            summary.processed, summary.scored, summary.skipped_in_flight, summary.duration_ms
        );
        Ok(summary)
    }
}

/// Fractional days since an RFC3339 creation timestamp.
fn parse_age_days(creation_time: &str) -> Option<f64> {
    let created: DateTime<Utc> = DateTime::parse_from_rfc3339(creation_time)
        .ok()?
        .with_timezone(&Utc);
    let seconds = (Utc::now() - created).num_seconds();
    if seconds < 0 {
        return None;
    }
    Some(seconds as f64 / 86_400.0)
}

/// Split the provider security report into the scoring engine's
/// security and developer sections.
fn split_security(data: TokenSecurityData) -> (SecurityInfo, DeveloperInfo) {
    let mut lp_locks = Vec::new();
    if data.lp_burned == Some(true) {
        lp_locks.push(LpLock {
            tag: "burned".to_string(),
            percentage: data.lp_lock_percentage,
            unlock_at: None,
        });
    }

    let security = SecurityInfo {
        is_mintable: data.is_mintable,
        is_freezable: data.is_freezable,
        lp_lock_percentage: data.lp_lock_percentage,
        total_supply: data.total_supply,
        circulating_supply: data.circulating_supply,
        lp_locks,
    };
    let developer = DeveloperInfo {
        creator_address: data.creator_address,
        creator_balance_percent: data.creator_percentage,
        creator_status: data.creator_status,
        top10_holder_rate: data.top10_holder_rate,
        twitter_create_token_count: data.creator_token_count,
    };
    (security, developer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FreshCache;
    use crate::models::{Chain, FeedSource, MarketData, PriceChange, TokenKey, TxnStats};
    use crate::store::FileStore;

    fn record() -> TokenRecord {
        TokenRecord {
            key: TokenKey::new(Chain::Solana, "MintAAA"),
            symbol: "AAA".to_string(),
            name: "Token AAA".to_string(),
            market: MarketData {
                price_usd: Some(0.01),
                liquidity_usd: Some(60_000.0),
                fdv: Some(1_000_000.0),
                volume_h24: 10_000.0,
                price_change: PriceChange { h24: Some(4.0), ..Default::default() },
                txns: Some(TxnStats { h24_buys: Some(5), ..Default::default() }),
                holders: Some(150),
                pair_address: None,
                source: FeedSource::DexScreener,
            },
            logo_url: None,
            category: None,
        }
    }

    fn temp_store() -> Arc<FileStore> {
        let path = std::env::temp_dir().join(format!("vetguard-orch-{}.json", uuid::Uuid::new_v4()));
        Arc::new(FileStore::new(path))
    }

    #[tokio::test]
    async fn test_vet_record_persists_results() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/defi/token_security")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"success": true, "data": {
                    "isMintable": false, "isFreezable": false,
                    "lpLockPercentage": 95.0, "lpBurned": true,
                    "totalSupply": 1000000.0, "circulatingSupply": 990000.0,
                    "creatorAddress": "Creator1", "creatorPercentage": 1.0,
                    "top10HolderRate": 25.0,
                    "creationTime": "2024-01-01T00:00:00Z"
                }}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/token/mainnet/holders/MintAAA")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"totalHolders": 800}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/token/mainnet/MintAAA/top-holders")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result": [{"ownerAddress": "H1", "percentageRelativeToTotalSupply": 4.0}]}"#)
            .create_async()
            .await;

        let cache = FreshCache::new();
        let birdeye = Arc::new(BirdeyeClient::with_base_url(
            &server.url(),
            "k",
            cache.clone(),
            Duration::from_secs(1),
        ));
        let moralis = Arc::new(MoralisClient::with_base_url(
            &server.url(),
            "k",
            cache,
            Duration::from_secs(1),
        ));
        let store = temp_store();
        let orchestrator = VettingOrchestrator::new(
            birdeye,
            moralis,
            store.clone(),
            OrchestratorConfig::default(),
        );

        let rec = record();
        let results = orchestrator.vet_record(&rec).await.expect("not in flight");
        assert!(results.data_sufficient);
        assert!(results.overall_score >= 70);

        let persisted = store.latest_vetting(&rec.key).await.unwrap();
        assert!(persisted.is_some());
        assert_eq!(persisted.unwrap().overall_score, results.overall_score);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_penalized_score() {
        // No mock server routes at all: every lookup fails, scoring
        // still produces a result.
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let cache = FreshCache::new();
        let birdeye = Arc::new(BirdeyeClient::with_base_url(
            &server.url(),
            "k",
            cache.clone(),
            Duration::from_secs(1),
        ));
        let moralis = Arc::new(MoralisClient::with_base_url(
            &server.url(),
            "k",
            cache,
            Duration::from_secs(1),
        ));
        let orchestrator = VettingOrchestrator::new(
            birdeye,
            moralis,
            temp_store(),
            OrchestratorConfig::default(),
        );

        let results = orchestrator.vet_record(&record()).await.expect("not in flight");
        assert!(!results.data_sufficient);
        assert!(!results.missing_data.is_empty());
    }

    #[test]
    fn test_parse_age_days() {
        let recent = (Utc::now() - chrono::Duration::hours(36)).to_rfc3339();
        let age = parse_age_days(&recent).unwrap();
        assert!((age - 1.5).abs() < 0.05);

        assert!(parse_age_days("not a timestamp").is_none());
        // Future timestamps are treated as unknown
        let future = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        assert!(parse_age_days(&future).is_none());
    }
}
