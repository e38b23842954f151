//! Cycle scheduler
//!
//! Drives the three pipelines on independent cadences: ingestion,
//! vetting of the backlog, and monitoring. Each loop catches at its own
//! top level; no cycle error ever kills the trigger loop.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::ingest::FeedIngestor;
use crate::monitoring::MonitoringSampler;
use crate::vetting::VettingOrchestrator;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub ingestion_interval_secs: u64,
    pub vetting_interval_secs: u64,
    pub monitoring_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ingestion_interval_secs: 1_800,
            vetting_interval_secs: 600,
            monitoring_interval_secs: 1_800,
        }
    }
}

pub struct Scheduler {
    ingestor: Arc<FeedIngestor>,
    orchestrator: Arc<VettingOrchestrator>,
    sampler: Arc<MonitoringSampler>,
    config: SchedulerConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(
        ingestor: Arc<FeedIngestor>,
        orchestrator: Arc<VettingOrchestrator>,
        sampler: Arc<MonitoringSampler>,
        config: SchedulerConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            ingestor,
            orchestrator,
            sampler,
            config,
            shutdown_tx,
        }
    }

    /// Spawn the three pipeline loops.
    pub fn start(&self) -> Result<()> {
        info!(
            "Starting scheduler: ingestion {}s, vetting {}s, monitoring {}s",
            self.config.ingestion_interval_secs,
            self.config.vetting_interval_secs,
            self.config.monitoring_interval_secs
        );

        self.spawn_ingestion_loop();
        self.spawn_vetting_loop();
        self.spawn_monitoring_loop();
        Ok(())
    }

    pub fn stop(&self) {
        info!("Stopping scheduler...");
        let _ = self.shutdown_tx.send(());
    }

    fn spawn_ingestion_loop(&self) {
        let ingestor = self.ingestor.clone();
        let period = Duration::from_secs(self.config.ingestion_interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut timer = interval(period);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Ingestion loop received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        if let Err(e) = ingestor.run_ingestion_cycle().await {
                            error!("Ingestion cycle failed: {:?}", e);
                        }
                    }
                }
            }
        });
    }

    fn spawn_vetting_loop(&self) {
        let orchestrator = self.orchestrator.clone();
        let period = Duration::from_secs(self.config.vetting_interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut timer = interval(period);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Vetting loop received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        if let Err(e) = orchestrator.run_vetting_cycle().await {
                            error!("Vetting cycle failed: {:?}", e);
                        }
                    }
                }
            }
        });
    }

    fn spawn_monitoring_loop(&self) {
        let sampler = self.sampler.clone();
        let period = Duration::from_secs(self.config.monitoring_interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut timer = interval(period);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Monitoring loop received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        if let Err(e) = sampler.run_monitoring_cycle().await {
                            error!("Monitoring cycle failed: {:?}", e);
                        }
                    }
                }
            }
        });
    }
}
