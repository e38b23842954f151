//! Listing delta notifications
//!
//! Fire-and-forget webhook push of `{new, updated}` listing deltas after
//! each ingestion cycle. Strictly best-effort: a dead channel is logged
//! and forgotten, persistence never waits on it.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::TokenKey;

#[derive(Debug, Serialize)]
struct ListingDelta<'a> {
    new: &'a [TokenKey],
    updated: &'a [TokenKey],
}

#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// `webhook_url = None` disables the channel entirely.
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to create HTTP client for notifier"),
            webhook_url,
        }
    }

    /// Push a listing delta. Never returns an error; failures are
    /// logged and dropped.
    pub async fn publish_listing_delta(&self, new: &[TokenKey], updated: &[TokenKey]) {
        let url = match &self.webhook_url {
            Some(url) => url,
            None => {
                debug!("Notification channel disabled, skipping delta push");
                return;
            }
        };

        if new.is_empty() && updated.is_empty() {
            return;
        }

        let delta = ListingDelta { new, updated };
        match self.client.post(url).json(&delta).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Pushed listing delta: {} new, {} updated", new.len(), updated.len());
            }
            Ok(response) => {
                warn!("Notification channel returned {}", response.status());
            }
            Err(e) => {
                warn!("Failed to push listing delta: {:?}", e);
            }
        }
    }
}
