//! Tier Classifier
//!
//! Maps an overall score plus age/liquidity/LP-lock inputs onto the
//! graduated listing tiers. Rules are evaluated from the highest tier
//! down and the first satisfied rule wins, so a token meeting Stellar's
//! bar never falls through to Bloom.

use chrono::Utc;

use crate::models::{ListingTier, LpLock};

/// Permanent lock assigned to burned LP tokens, in months.
const BURNED_LOCK_MONTHS: f64 = 999.0;

/// Requirements for one tier. `min_lock_months` of zero means the tier
/// has no lock requirement.
struct TierRule {
    tier: ListingTier,
    min_age_days: f64,
    min_liquidity_usd: f64,
    min_lock_months: f64,
    min_score: u32,
    /// Score bar when no lock duration is known; `None` disables the
    /// score-only path for the tier.
    fallback_min_score: Option<u32>,
}

const TIER_RULES: [TierRule; 4] = [
    TierRule {
        tier: ListingTier::Stellar,
        min_age_days: 60.0,
        min_liquidity_usd: 100_000.0,
        min_lock_months: 24.0,
        min_score: 70,
        fallback_min_score: Some(70),
    },
    TierRule {
        tier: ListingTier::Bloom,
        min_age_days: 30.0,
        min_liquidity_usd: 50_000.0,
        min_lock_months: 24.0,
        min_score: 50,
        fallback_min_score: Some(60),
    },
    TierRule {
        tier: ListingTier::Sprout,
        min_age_days: 21.0,
        min_liquidity_usd: 20_000.0,
        min_lock_months: 12.0,
        min_score: 50,
        fallback_min_score: Some(55),
    },
    TierRule {
        tier: ListingTier::Seed,
        min_age_days: 14.0,
        min_liquidity_usd: 10_000.0,
        min_lock_months: 6.0,
        min_score: 30,
        fallback_min_score: Some(50),
    },
];

/// Derive the effective lock horizon from the lock descriptors: a burn
/// tag means a permanent lock, otherwise the longest unlock horizon from
/// now, in months. `None` when no descriptor carries a duration.
pub fn effective_lock_months(locks: &[LpLock]) -> Option<f64> {
    if locks.iter().any(|l| l.is_burn()) {
        return Some(BURNED_LOCK_MONTHS);
    }

    let now = Utc::now();
    locks
        .iter()
        .filter_map(|l| l.unlock_at)
        .map(|unlock| {
            let days = (unlock - now).num_days() as f64;
            (days / 30.0).max(0.0)
        })
        .fold(None, |acc: Option<f64>, months| {
            Some(acc.map_or(months, |best| best.max(months)))
        })
}

/// Lock-month proxy from the lock percentage, used only on the fallback
/// paths when no lock duration is reported.
fn lock_months_proxy(lp_lock_percent: Option<f64>) -> f64 {
    match lp_lock_percent {
        Some(pct) if pct >= 90.0 => 12.0,
        Some(pct) if pct >= 50.0 => 6.0,
        _ => 0.0,
    }
}

/// Classify a token into its eligibility tier.
pub fn classify(
    score: u32,
    age_days: Option<f64>,
    lp_lock_percent: Option<f64>,
    lp_lock_months: Option<f64>,
    liquidity_usd: Option<f64>,
) -> ListingTier {
    let age = age_days.unwrap_or(0.0);
    let liquidity = liquidity_usd.unwrap_or(0.0);

    for rule in &TIER_RULES {
        if age < rule.min_age_days || liquidity < rule.min_liquidity_usd {
            continue;
        }

        match lp_lock_months {
            Some(months) => {
                if months >= rule.min_lock_months && score >= rule.min_score {
                    return rule.tier;
                }
            }
            None => {
                // No lock duration known: the percentage proxy may still
                // satisfy the lock requirement, else the score-only bar
                // applies.
                let proxy = lock_months_proxy(lp_lock_percent);
                if proxy >= rule.min_lock_months && score >= rule.min_score {
                    return rule.tier;
                }
                if let Some(fallback) = rule.fallback_min_score {
                    if score >= fallback {
                        return rule.tier;
                    }
                }
            }
        }
    }

    // Young tokens get the probationary tier on score alone
    if age < 14.0 && liquidity >= 5_000.0 && score >= 60 {
        return ListingTier::New;
    }

    ListingTier::None
}
