//! Monitoring Sampler
//!
//! Re-observes already-vetted tokens on a fixed cadence: fetches the
//! current market/holder/activity metrics, diffs them against the most
//! recent prior snapshot, derives trends and raises alerts when a
//! threshold is crossed. A snapshot is always written, even on the
//! first sample (trends default to stable with no prior).

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::api::dexscreener::DexScreenerClient;
use crate::api::moralis::MoralisClient;
use crate::models::{
    Alert, AlertSeverity, AlertTrigger, MonitoringSnapshot, TokenKey, TokenRecord, Trend,
};
use crate::store::ListingStore;

/// Trend thresholds, percent change against the prior sample.
const LIQUIDITY_TREND_PCT: f64 = 5.0;
const HOLDER_TREND_PCT: f64 = 10.0;
const ACTIVITY_TREND_PCT: f64 = 10.0;

/// Alert thresholds.
const LIQUIDITY_DROP_ALERT_PCT: f64 = 20.0;
const HOLDER_LOSS_ALERT_PCT: f64 = 10.0;
const PRICE_CRASH_ALERT_PCT: f64 = -30.0;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 500,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MonitoringCycleSummary {
    pub sampled: usize,
    pub failures: usize,
    pub alerts_raised: usize,
    pub duration_ms: u128,
}

pub struct MonitoringSampler {
    dexscreener: Arc<DexScreenerClient>,
    moralis: Arc<MoralisClient>,
    store: Arc<dyn ListingStore>,
    config: SamplerConfig,
}

impl MonitoringSampler {
    pub fn new(
        dexscreener: Arc<DexScreenerClient>,
        moralis: Arc<MoralisClient>,
        store: Arc<dyn ListingStore>,
        config: SamplerConfig,
    ) -> Self {
        Self {
            dexscreener,
            moralis,
            store,
            config,
        }
    }

    /// Sample one token: fetch, diff against the prior snapshot, write
    /// the new snapshot and any alerts.
    pub async fn sample(&self, record: &TokenRecord) -> Result<MonitoringSnapshot> {
        let key = &record.key;

        let pairs = match self
            .dexscreener
            .get_token_pairs(key.chain.as_str(), &key.address)
            .await
        {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("Market fetch failed for {}: {:?}", key, e);
                vec![]
            }
        };

        // Deepest pair carries the canonical metrics
        let best_pair = pairs.iter().max_by(|a, b| {
            let la = a.liquidity.usd.unwrap_or(0.0);
            let lb = b.liquidity.usd.unwrap_or(0.0);
            la.partial_cmp(&lb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let holder_count = match self.moralis.get_holder_count(&key.address).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Holder fetch failed for {}: {:?}", key, e);
                None
            }
        };

        let (price_usd, liquidity_usd, volume_h24, price_change_h24, txn_count_h24) =
            match best_pair {
                Some(pair) => (
                    pair.price_usd
                        .as_ref()
                        .and_then(|s| s.trim().parse::<f64>().ok())
                        .filter(|v| v.is_finite()),
                    pair.liquidity.usd,
                    pair.volume.h24.unwrap_or(0.0),
                    pair.price_change.h24,
                    pair.txns.h24.buys.unwrap_or(0) + pair.txns.h24.sells.unwrap_or(0),
                ),
                None => (None, None, 0.0, None, 0),
            };

        let prior = self.store.latest_snapshot(key).await?;

        let snapshot = MonitoringSnapshot {
            key: key.clone(),
            scanned_at: chrono::Utc::now(),
            price_usd,
            liquidity_usd,
            volume_h24,
            price_change_h24,
            holder_count,
            txn_count_h24,
            liquidity_trend: trend_between(
                prior.as_ref().and_then(|p| p.liquidity_usd),
                liquidity_usd,
                LIQUIDITY_TREND_PCT,
            ),
            holder_trend: trend_between(
                prior.as_ref().and_then(|p| p.holder_count.map(|c| c as f64)),
                holder_count.map(|c| c as f64),
                HOLDER_TREND_PCT,
            ),
            activity_trend: trend_between(
                prior.as_ref().map(|p| p.txn_count_h24 as f64),
                Some(txn_count_h24 as f64),
                ACTIVITY_TREND_PCT,
            ),
        };

        // Alerts only fire against a prior sample
        let mut alerts_raised = 0;
        if let Some(ref prior) = prior {
            for alert in evaluate_alerts(key, prior, &snapshot) {
                info!(
                    "🚨 Alert for {}: {} ({:?}) - {}",
                    key, alert.trigger_type, alert.severity, alert.condition
                );
                // Best-effort per alert; one failed write never blocks
                // the others
                if let Err(e) = self.store.append_alert(&alert).await {
                    warn!("Failed to persist alert for {}: {:?}", key, e);
                } else {
                    alerts_raised += 1;
                }
            }
        }
        debug!("Sampled {}: {} alerts", key, alerts_raised);

        self.store.append_snapshot(&snapshot).await?;
        Ok(snapshot)
    }

    /// Run one monitoring cycle over every vetted token.
    pub async fn run_monitoring_cycle(&self) -> Result<MonitoringCycleSummary> {
        let started = Instant::now();
        let mut summary = MonitoringCycleSummary::default();

        let vetted = self.store.list_vetted().await?;
        if vetted.is_empty() {
            debug!("No vetted tokens to monitor");
            return Ok(summary);
        }

        info!("Monitoring cycle: {} vetted tokens", vetted.len());

        for batch in vetted.chunks(self.config.batch_size.max(1)) {
            let outcomes = join_all(batch.iter().map(|record| self.sample(record))).await;
            for outcome in outcomes {
                match outcome {
                    Ok(_) => summary.sampled += 1,
                    Err(e) => {
                        summary.failures += 1;
                        warn!("Sample failed: {:?}", e);
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
        }

        summary.duration_ms = started.elapsed().as_millis();
        info!(
            "Monitoring cycle done: {} sampled, {} failures, {}ms",
            summary.sampled, summary.failures, summary.duration_ms
        );
        Ok(summary)
    }
}

/// Classify the percent move from `prev` to `curr` against a threshold.
/// Unknown values on either side read as stable.
fn trend_between(prev: Option<f64>, curr: Option<f64>, threshold_pct: f64) -> Trend {
    let (prev, curr) = match (prev, curr) {
        (Some(p), Some(c)) if p > 0.0 => (p, c),
        _ => return Trend::Stable,
    };

    let change_pct = (curr - prev) / prev * 100.0;
    if change_pct > threshold_pct {
        Trend::Increasing
    } else if change_pct < -threshold_pct {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Evaluate the alert conditions independently; several may fire for
/// the same sample.
pub fn evaluate_alerts(
    key: &TokenKey,
    prior: &MonitoringSnapshot,
    current: &MonitoringSnapshot,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if let (Some(prev), Some(curr)) = (prior.liquidity_usd, current.liquidity_usd) {
        if prev > 0.0 {
            let drop_pct = (prev - curr) / prev * 100.0;
            if drop_pct > LIQUIDITY_DROP_ALERT_PCT {
                alerts.push(Alert::new(
                    key.clone(),
                    AlertSeverity::High,
                    AlertTrigger::LiquidityDrop,
                    format!("Liquidity fell {:.1}% (${:.0} -> ${:.0})", drop_pct, prev, curr),
                    format!("Liquidity drained {:.1}% since the last sample", drop_pct),
                ));
            }
        }
    }

    if let (Some(prev), Some(curr)) = (prior.holder_count, current.holder_count) {
        if prev > 0 {
            let drop_pct = (prev as f64 - curr as f64) / prev as f64 * 100.0;
            if drop_pct > HOLDER_LOSS_ALERT_PCT {
                alerts.push(Alert::new(
                    key.clone(),
                    AlertSeverity::Medium,
                    AlertTrigger::HolderLoss,
                    format!("Holders fell {:.1}% ({} -> {})", drop_pct, prev, curr),
                    format!("Token lost {:.1}% of holders since the last sample", drop_pct),
                ));
            }
        }
    }

    if let Some(change) = current.price_change_h24 {
        if change < PRICE_CRASH_ALERT_PCT {
            alerts.push(Alert::new(
                key.clone(),
                AlertSeverity::High,
                AlertTrigger::PriceCrash,
                format!("24h price change {:.1}%", change),
                format!("Price crashed {:.1}% over 24h", change),
            ));
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chain;
    use chrono::Utc;

    fn key() -> TokenKey {
        TokenKey::new(Chain::Solana, "MintAAA")
    }

    fn snapshot(liquidity: Option<f64>, holders: Option<u64>, txns: u64) -> MonitoringSnapshot {
        MonitoringSnapshot {
            key: key(),
            scanned_at: Utc::now(),
            price_usd: Some(0.01),
            liquidity_usd: liquidity,
            volume_h24: 1_000.0,
            price_change_h24: None,
            holder_count: holders,
            txn_count_h24: txns,
            liquidity_trend: Trend::Stable,
            holder_trend: Trend::Stable,
            activity_trend: Trend::Stable,
        }
    }

    #[tokio::test]
    async fn test_first_sample_has_all_trends_stable() {
        use crate::cache::FreshCache;
        use crate::models::{FeedSource, MarketData, PriceChange, TokenRecord};
        use crate::store::FileStore;
        use std::time::Duration;

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tokens/v1/solana/MintAAA")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{
                    "chainId": "solana",
                    "baseToken": {"address": "MintAAA", "symbol": "AAA", "name": "Token AAA"},
                    "quoteToken": {"address": "So11111111111111111111111111111111111111112", "symbol": "WSOL", "name": "Wrapped SOL"},
                    "priceUsd": "0.01",
                    "liquidity": {"usd": 40000.0},
                    "volume": {"h24": 9000.0},
                    "txns": {"h24": {"buys": 12, "sells": 8}}
                }]"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/token/mainnet/holders/MintAAA")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"totalHolders": 400}"#)
            .create_async()
            .await;

        let cache = FreshCache::new();
        let dexscreener = Arc::new(DexScreenerClient::with_base_url(
            &server.url(),
            cache.clone(),
            Duration::from_secs(0),
        ));
        let moralis = Arc::new(MoralisClient::with_base_url(
            &server.url(),
            "k",
            cache,
            Duration::from_secs(0),
        ));
        let path = std::env::temp_dir().join(format!("vetguard-mon-{}.json", uuid::Uuid::new_v4()));
        let store = Arc::new(FileStore::new(path));
        let sampler = MonitoringSampler::new(dexscreener, moralis, store.clone(), SamplerConfig::default());

        let record = TokenRecord {
            key: key(),
            symbol: "AAA".to_string(),
            name: "Token AAA".to_string(),
            market: MarketData {
                price_usd: Some(0.01),
                liquidity_usd: Some(40_000.0),
                fdv: None,
                volume_h24: 9_000.0,
                price_change: PriceChange::default(),
                txns: None,
                holders: Some(400),
                pair_address: None,
                source: FeedSource::DexScreener,
            },
            logo_url: None,
            category: None,
        };

        let snapshot = sampler.sample(&record).await.unwrap();
        assert_eq!(snapshot.liquidity_trend, Trend::Stable);
        assert_eq!(snapshot.holder_trend, Trend::Stable);
        assert_eq!(snapshot.activity_trend, Trend::Stable);
        assert_eq!(snapshot.liquidity_usd, Some(40_000.0));
        assert_eq!(snapshot.holder_count, Some(400));
        assert_eq!(snapshot.txn_count_h24, 20);

        // The snapshot was written even though there was no prior
        assert!(store.latest_snapshot(&key()).await.unwrap().is_some());
        // And no alerts fired without a prior sample
        assert!(store.list_alerts(&key()).await.unwrap().is_empty());
    }

    #[test]
    fn test_trend_classification_boundaries() {
        // +5% is stable, just above is increasing
        assert_eq!(trend_between(Some(100.0), Some(105.0), 5.0), Trend::Stable);
        assert_eq!(trend_between(Some(100.0), Some(105.1), 5.0), Trend::Increasing);
        assert_eq!(trend_between(Some(100.0), Some(94.9), 5.0), Trend::Decreasing);
        // Unknowns read as stable
        assert_eq!(trend_between(None, Some(100.0), 5.0), Trend::Stable);
        assert_eq!(trend_between(Some(100.0), None, 5.0), Trend::Stable);
        assert_eq!(trend_between(Some(0.0), Some(100.0), 5.0), Trend::Stable);
    }

    #[test]
    fn test_liquidity_drop_alert() {
        // $100k -> $75k is a 25% drop: one high-severity alert
        let prior = snapshot(Some(100_000.0), Some(500), 50);
        let current = snapshot(Some(75_000.0), Some(500), 50);

        let alerts = evaluate_alerts(&key(), &prior, &current);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert_eq!(alerts[0].trigger_type, AlertTrigger::LiquidityDrop);
        assert!(alerts[0].detected);
    }

    #[test]
    fn test_liquidity_drop_under_threshold_is_quiet() {
        let prior = snapshot(Some(100_000.0), Some(500), 50);
        let current = snapshot(Some(85_000.0), Some(500), 50);
        assert!(evaluate_alerts(&key(), &prior, &current).is_empty());
    }

    #[test]
    fn test_holder_loss_alert() {
        let prior = snapshot(Some(100_000.0), Some(1_000), 50);
        let current = snapshot(Some(100_000.0), Some(850), 50);

        let alerts = evaluate_alerts(&key(), &prior, &current);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
        assert_eq!(alerts[0].trigger_type, AlertTrigger::HolderLoss);
    }

    #[test]
    fn test_price_crash_alert() {
        let prior = snapshot(Some(100_000.0), Some(500), 50);
        let mut current = snapshot(Some(100_000.0), Some(500), 50);
        current.price_change_h24 = Some(-45.0);

        let alerts = evaluate_alerts(&key(), &prior, &current);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].trigger_type, AlertTrigger::PriceCrash);
    }

    #[test]
    fn test_multiple_alerts_fire_in_one_cycle() {
        let prior = snapshot(Some(100_000.0), Some(1_000), 50);
        let mut current = snapshot(Some(50_000.0), Some(800), 50);
        current.price_change_h24 = Some(-60.0);

        let alerts = evaluate_alerts(&key(), &prior, &current);
        assert_eq!(alerts.len(), 3);
    }
}
