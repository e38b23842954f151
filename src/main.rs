use anyhow::Result;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod api;
mod cache;
mod config;
mod error;
mod ingest;
mod models;
mod monitoring;
mod notify;
mod scheduler;
mod store;
mod vetting;

use crate::api::birdeye::BirdeyeClient;
use crate::api::dexscreener::DexScreenerClient;
use crate::api::geckoterminal::GeckoTerminalClient;
use crate::api::moralis::MoralisClient;
use crate::cache::FreshCache;
use crate::config::Config;
use crate::ingest::{FeedIngestor, IngestorConfig};
use crate::monitoring::{MonitoringSampler, SamplerConfig};
use crate::notify::Notifier;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::store::{FileStore, ListingStore};
use crate::vetting::{OrchestratorConfig, VettingOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load environment variables
    dotenv().ok();

    let config = Arc::new(Config::load()?);
    info!("Configuration loaded successfully");

    // Shared fresh-result cache
    let cache = FreshCache::new();
    let cache_ttl = Duration::from_secs(config.cache_ttl_secs);

    // Provider clients
    let dexscreener = Arc::new(DexScreenerClient::new(cache.clone(), cache_ttl));
    let geckoterminal = Arc::new(GeckoTerminalClient::new(cache.clone(), cache_ttl));
    let birdeye = Arc::new(BirdeyeClient::new(&config.birdeye_api_key, cache.clone(), cache_ttl));
    let moralis = Arc::new(MoralisClient::new(&config.moralis_api_key, cache.clone(), cache_ttl));
    info!("Provider clients initialized");

    // Listing store
    let store = Arc::new(FileStore::new(PathBuf::from(&config.store_path)));
    store.load().await?;
    let store: Arc<dyn ListingStore> = store;

    // Notification channel
    let notifier = Arc::new(Notifier::new(config.webhook_url.clone()));

    // Pipelines
    let ingestor = Arc::new(FeedIngestor::new(
        dexscreener.clone(),
        geckoterminal,
        birdeye.clone(),
        store.clone(),
        notifier,
        cache.clone(),
        IngestorConfig {
            aggregator_networks: config.aggregator_networks.clone(),
            market_cap_limit: config.market_cap_limit,
            fetch_timeout_secs: config.fetch_timeout_secs,
        },
    ));

    let orchestrator = Arc::new(VettingOrchestrator::new(
        birdeye,
        moralis.clone(),
        store.clone(),
        OrchestratorConfig {
            batch_size: config.vetting_batch_size,
            batch_delay_ms: config.batch_delay_ms,
            stale_after: chrono::Duration::hours(config.vetting_stale_after_hours),
        },
    ));

    let sampler = Arc::new(MonitoringSampler::new(
        dexscreener,
        moralis,
        store,
        SamplerConfig {
            batch_size: config.monitoring_batch_size,
            batch_delay_ms: config.batch_delay_ms,
        },
    ));

    // Start the periodic loops
    let scheduler = Scheduler::new(
        ingestor,
        orchestrator,
        sampler,
        SchedulerConfig {
            ingestion_interval_secs: config.ingestion_interval_secs,
            vetting_interval_secs: config.vetting_interval_secs,
            monitoring_interval_secs: config.monitoring_interval_secs,
        },
    );
    scheduler.start()?;
    info!("Vetguard running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    scheduler.stop();
    Ok(())
}
