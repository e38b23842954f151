use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::token::TokenKey;

/// Three-way classification of a metric against its previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// One timestamped sample of a token's dynamic metrics. Append-only; the
/// "previous" snapshot for a token is the most recent prior row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSnapshot {
    pub key: TokenKey,
    pub scanned_at: DateTime<Utc>,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub volume_h24: f64,
    pub price_change_h24: Option<f64>,
    pub holder_count: Option<u64>,
    /// Buys + sells over 24h, the activity proxy.
    pub txn_count_h24: u64,
    pub liquidity_trend: Trend,
    pub holder_trend: Trend,
    pub activity_trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTrigger {
    LiquidityDrop,
    HolderLoss,
    PriceCrash,
}

impl std::fmt::Display for AlertTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertTrigger::LiquidityDrop => "liquidity_drop",
            AlertTrigger::HolderLoss => "holder_loss",
            AlertTrigger::PriceCrash => "price_crash",
        };
        f.write_str(s)
    }
}

/// Raised when a snapshot comparison crosses a threshold. Append-only,
/// never updated; dedup/ack state lives outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub key: TokenKey,
    pub severity: AlertSeverity,
    pub trigger_type: AlertTrigger,
    /// Which condition crossed, with the measured values.
    pub condition: String,
    pub message: String,
    pub detected: bool,
    pub detected_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        key: TokenKey,
        severity: AlertSeverity,
        trigger_type: AlertTrigger,
        condition: String,
        message: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            key,
            severity,
            trigger_type,
            condition,
            message,
            detected: true,
            detected_at: Utc::now(),
        }
    }
}
