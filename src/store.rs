//! Listing Store
//!
//! The persistence collaborator. The core only depends on the
//! `ListingStore` trait; the bundled implementation keeps everything in
//! memory behind an `RwLock` and persists to a JSON file, which is all
//! the read-after-write consistency this process needs.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::{Alert, MonitoringSnapshot, TokenKey, TokenRecord, VettingResults};

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn find_record(&self, key: &TokenKey) -> Result<Option<TokenRecord>>;

    /// Insert or overwrite the market view of a token. Returns `true`
    /// when the key was not present before (a new listing).
    async fn upsert_market_metadata(&self, record: &TokenRecord) -> Result<bool>;

    async fn save_vetting_results(&self, results: &VettingResults) -> Result<()>;
    async fn latest_vetting(&self, key: &TokenKey) -> Result<Option<VettingResults>>;

    /// Records that have never been vetted, or whose vetting is older
    /// than `stale_after`.
    async fn list_vetting_backlog(&self, stale_after: Duration) -> Result<Vec<TokenRecord>>;

    /// Records with a stored vetting result, the monitoring population.
    async fn list_vetted(&self) -> Result<Vec<TokenRecord>>;

    async fn append_snapshot(&self, snapshot: &MonitoringSnapshot) -> Result<()>;

    /// Most recent prior snapshot for a token.
    async fn latest_snapshot(&self, key: &TokenKey) -> Result<Option<MonitoringSnapshot>>;

    async fn append_alert(&self, alert: &Alert) -> Result<()>;
    async fn list_alerts(&self, key: &TokenKey) -> Result<Vec<Alert>>;
}

/// Everything the file store persists, in one JSON document. Maps are
/// keyed by the `chain|address` string form of the token key.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreState {
    records: HashMap<String, TokenRecord>,
    vetting: HashMap<String, VettingResults>,
    snapshots: HashMap<String, Vec<MonitoringSnapshot>>,
    alerts: Vec<Alert>,
}

/// JSON-file-backed listing store.
pub struct FileStore {
    state: Arc<RwLock<StoreState>>,
    persistence_path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            persistence_path: path,
        }
    }

    /// Load persisted state from disk, if any.
    pub async fn load(&self) -> Result<()> {
        if !self.persistence_path.exists() {
            debug!("Store file not found, starting empty");
            return Ok(());
        }

        let data = tokio::fs::read_to_string(&self.persistence_path).await?;
        if data.trim().is_empty() {
            return Ok(());
        }

        let loaded: StoreState = serde_json::from_str(&data)?;
        let mut state = self.state.write().await;
        *state = loaded;
        info!("Loaded {} token records from store", state.records.len());
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        if let Some(parent) = self.persistence_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let state = self.state.read().await;
        let data = serde_json::to_string_pretty(&*state)?;
        tokio::fs::write(&self.persistence_path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl ListingStore for FileStore {
    async fn find_record(&self, key: &TokenKey) -> Result<Option<TokenRecord>> {
        let state = self.state.read().await;
        Ok(state.records.get(&key.to_string()).cloned())
    }

    async fn upsert_market_metadata(&self, record: &TokenRecord) -> Result<bool> {
        let is_new = {
            let mut state = self.state.write().await;
            state
                .records
                .insert(record.key.to_string(), record.clone())
                .is_none()
        };
        if let Err(e) = self.save().await {
            warn!("Failed to persist store after upsert: {:?}", e);
        }
        Ok(is_new)
    }

    async fn save_vetting_results(&self, results: &VettingResults) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.vetting.insert(results.key.to_string(), results.clone());
        }
        self.save().await
    }

    async fn latest_vetting(&self, key: &TokenKey) -> Result<Option<VettingResults>> {
        let state = self.state.read().await;
        Ok(state.vetting.get(&key.to_string()).cloned())
    }

    async fn list_vetting_backlog(&self, stale_after: Duration) -> Result<Vec<TokenRecord>> {
        let state = self.state.read().await;
        let cutoff = Utc::now() - stale_after;
        Ok(state
            .records
            .values()
            .filter(|record| match state.vetting.get(&record.key.to_string()) {
                Some(results) => results.calculated_at < cutoff,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn list_vetted(&self) -> Result<Vec<TokenRecord>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|record| state.vetting.contains_key(&record.key.to_string()))
            .cloned()
            .collect())
    }

    async fn append_snapshot(&self, snapshot: &MonitoringSnapshot) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state
                .snapshots
                .entry(snapshot.key.to_string())
                .or_default()
                .push(snapshot.clone());
        }
        self.save().await
    }

    async fn latest_snapshot(&self, key: &TokenKey) -> Result<Option<MonitoringSnapshot>> {
        let state = self.state.read().await;
        Ok(state
            .snapshots
            .get(&key.to_string())
            .and_then(|rows| rows.iter().max_by_key(|s| s.scanned_at))
            .cloned())
    }

    async fn append_alert(&self, alert: &Alert) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.alerts.push(alert.clone());
        }
        self.save().await
    }

    async fn list_alerts(&self, key: &TokenKey) -> Result<Vec<Alert>> {
        let state = self.state.read().await;
        Ok(state
            .alerts
            .iter()
            .filter(|a| &a.key == key)
            .cloned()
            .collect())
    }
}
