use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::token::TokenKey;

/// Basic identity of the token being vetted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VettingTokenInfo {
    pub key: TokenKey,
    pub symbol: String,
    pub name: String,
}

/// One LP lock descriptor as reported by a security feed. `tag` is the
/// provider's label ("burned", a locker name, ...), `unlock_at` the lock
/// expiry when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpLock {
    pub tag: String,
    pub percentage: Option<f64>,
    pub unlock_at: Option<DateTime<Utc>>,
}

impl LpLock {
    pub fn is_burn(&self) -> bool {
        self.tag.to_ascii_lowercase().contains("burn")
    }
}

/// Token security state as exposed by providers. All fields optional:
/// missing data is penalized by the scorer, never fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub is_mintable: Option<bool>,
    pub is_freezable: Option<bool>,
    pub lp_lock_percentage: Option<f64>,
    pub total_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub lp_locks: Vec<LpLock>,
}

/// Share of supply held by a single account, percentage of total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderShare {
    pub address: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HolderInfo {
    pub count: Option<u64>,
    pub top_holders: Vec<HolderShare>,
}

/// Creator / developer behaviour signals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeveloperInfo {
    pub creator_address: Option<String>,
    /// Creator's current balance as a percentage of supply.
    pub creator_balance_percent: Option<f64>,
    /// Provider-reported creator status ("holding", "sold", ...).
    pub creator_status: Option<String>,
    pub top10_holder_rate: Option<f64>,
    /// How many tokens this creator has launched before.
    pub twitter_create_token_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradingInfo {
    pub price: Option<f64>,
    pub liquidity: Option<f64>,
    pub volume_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub fdv: Option<f64>,
    pub holder_count: Option<u64>,
}

/// Input contract for the scoring engine. Assembled fresh per scoring
/// invocation and never persisted; only the derived results are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenVettingData {
    pub token_info: VettingTokenInfo,
    pub security: SecurityInfo,
    pub holders: HolderInfo,
    pub developer: DeveloperInfo,
    pub trading: TradingInfo,
    /// Age in days, fractional for young tokens.
    pub token_age_days: Option<f64>,
}

/// One of the four independent sub-scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentScore {
    pub score: f64,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    InsufficientData,
}

/// Graduated eligibility label gating listing privileges.
/// Ordering: Stellar > Bloom > Sprout > Seed > New > None.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingTier {
    Stellar,
    Bloom,
    Sprout,
    Seed,
    New,
    None,
}

impl std::fmt::Display for ListingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ListingTier::Stellar => "stellar",
            ListingTier::Bloom => "bloom",
            ListingTier::Sprout => "sprout",
            ListingTier::Seed => "seed",
            ListingTier::New => "new",
            ListingTier::None => "none",
        };
        f.write_str(s)
    }
}

/// Output of one scoring call. Immutable once computed; a fresh value is
/// produced per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VettingResults {
    pub id: String,
    pub key: TokenKey,
    pub distribution: ComponentScore,
    pub liquidity: ComponentScore,
    pub dev_abandonment: ComponentScore,
    pub technical: ComponentScore,
    /// 0-100, higher = safer.
    pub overall_score: u32,
    pub risk_level: RiskLevel,
    pub eligible_tier: ListingTier,
    pub all_flags: Vec<String>,
    pub data_sufficient: bool,
    pub missing_data: Vec<String>,
    pub calculated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lp_lock_burn_tag() {
        let lock = LpLock {
            tag: "Burned".to_string(),
            percentage: Some(95.0),
            unlock_at: None,
        };
        assert!(lock.is_burn());

        let lock = LpLock {
            tag: "team-lock".to_string(),
            percentage: Some(50.0),
            unlock_at: None,
        };
        assert!(!lock.is_burn());
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(ListingTier::Stellar.to_string(), "stellar");
        assert_eq!(ListingTier::None.to_string(), "none");
    }
}
