//! Risk Scoring Engine
//!
//! Pure, deterministic `score(data) -> VettingResults`. Four component
//! scorers each start at 100 and apply ordered deductions; bands within
//! one metric are mutually exclusive and the first match wins. Missing
//! inputs never abort scoring: absence becomes a penalty plus an
//! explanatory flag, and `data_sufficient`/`missing_data` are reported
//! for observability.

use chrono::Utc;

use crate::models::{
    ComponentScore, ListingTier, RiskLevel, TokenVettingData, VettingResults,
};
use crate::vetting::tier;

pub const WEIGHT_DISTRIBUTION: f64 = 0.25;
pub const WEIGHT_LIQUIDITY: f64 = 0.35;
pub const WEIGHT_DEV_ABANDONMENT: f64 = 0.20;
pub const WEIGHT_TECHNICAL: f64 = 0.20;

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// Score a token. Always produces a result; see module docs.
pub fn score(data: &TokenVettingData) -> VettingResults {
    let mut missing_data = Vec::new();

    let distribution = score_distribution(data, &mut missing_data);
    let liquidity = score_liquidity(data, &mut missing_data);
    let dev_abandonment = score_dev_abandonment(data, &mut missing_data);
    let technical = score_technical(data, &mut missing_data);

    let overall = WEIGHT_DISTRIBUTION * distribution.score
        + WEIGHT_LIQUIDITY * liquidity.score
        + WEIGHT_DEV_ABANDONMENT * dev_abandonment.score
        + WEIGHT_TECHNICAL * technical.score;
    let overall_score = overall.round() as u32;

    let risk_level = if overall_score >= 70 {
        RiskLevel::Low
    } else if overall_score >= 50 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    };

    let eligible_tier = classify_tier(data, overall_score);

    let mut all_flags = Vec::new();
    for component in [&distribution, &liquidity, &dev_abandonment, &technical] {
        all_flags.extend(component.flags.iter().cloned());
    }

    VettingResults {
        id: uuid::Uuid::new_v4().to_string(),
        key: data.token_info.key.clone(),
        distribution,
        liquidity,
        dev_abandonment,
        technical,
        overall_score,
        risk_level,
        eligible_tier,
        all_flags,
        data_sufficient: missing_data.is_empty(),
        missing_data,
        calculated_at: Utc::now(),
    }
}

fn classify_tier(data: &TokenVettingData, overall_score: u32) -> ListingTier {
    let lock_months = tier::effective_lock_months(&data.security.lp_locks);
    tier::classify(
        overall_score,
        data.token_age_days,
        data.security.lp_lock_percentage,
        lock_months,
        data.trading.liquidity,
    )
}

/// Holder distribution: concentration in the top 1/5/10 accounts and
/// holder count relative to token age.
fn score_distribution(data: &TokenVettingData, missing: &mut Vec<String>) -> ComponentScore {
    let mut score = 100.0;
    let mut flags = Vec::new();

    let top_holders = &data.holders.top_holders;
    let holder_count = data.holders.count;

    if top_holders.is_empty() {
        score -= 5.0;
        flags.push("❓ No holder distribution data available".to_string());
        missing.push("holder_distribution".to_string());
        if holder_count.is_none() {
            score -= 15.0;
            flags.push("❓ Holder count also unknown".to_string());
            missing.push("holder_count".to_string());
        }
    } else {
        let top1 = top_holders[0].percentage;
        if top1 > 20.0 {
            score -= 40.0;
            flags.push(format!("🔴 Top holder controls {:.1}% of supply", top1));
        } else if top1 > 15.0 {
            score -= 25.0;
            flags.push(format!("🟠 Top holder controls {:.1}% of supply", top1));
        } else if top1 > 10.0 {
            score -= 15.0;
            flags.push(format!("🟠 Top holder controls {:.1}% of supply", top1));
        } else if top1 < 5.0 {
            flags.push(format!("✅ Top holder share healthy ({:.1}%)", top1));
        }

        let top5: f64 = top_holders.iter().take(5).map(|h| h.percentage).sum();
        if top5 > 60.0 {
            score -= 30.0;
            flags.push(format!("🔴 Top 5 holders control {:.1}%", top5));
        } else if top5 > 45.0 {
            score -= 20.0;
            flags.push(format!("🟠 Top 5 holders control {:.1}%", top5));
        } else if top5 > 30.0 {
            score -= 10.0;
            flags.push(format!("🟠 Top 5 holders control {:.1}%", top5));
        }

        let top10: f64 = top_holders.iter().take(10).map(|h| h.percentage).sum();
        if top10 > 80.0 {
            score -= 25.0;
            flags.push(format!("🔴 Top 10 holders control {:.1}%", top10));
        } else if top10 > 65.0 {
            score -= 15.0;
            flags.push(format!("🟠 Top 10 holders control {:.1}%", top10));
        }
    }

    match (holder_count, data.token_age_days) {
        (Some(count), Some(age)) => {
            if age >= 30.0 && count < 100 {
                score -= 20.0;
                flags.push(format!("🟠 Only {} holders after {:.0} days", count, age));
            } else if age >= 60.0 && count < 250 {
                score -= 10.0;
                flags.push(format!("🟠 Only {} holders after {:.0} days", count, age));
            }
        }
        (None, _) if !top_holders.is_empty() => {
            // Count missing but distribution known; record it without the
            // double penalty applied above.
            missing.push("holder_count".to_string());
        }
        _ => {}
    }

    ComponentScore {
        score: clamp_score(score),
        flags,
    }
}

/// Liquidity safety: LP lock share, burn state, absolute liquidity depth.
fn score_liquidity(data: &TokenVettingData, missing: &mut Vec<String>) -> ComponentScore {
    let mut score = 100.0;
    let mut flags = Vec::new();

    // The aggregate lock share falls back to the per-lock descriptors
    let lp_lock = data.security.lp_lock_percentage.or_else(|| {
        let locked: f64 = data
            .security
            .lp_locks
            .iter()
            .filter_map(|l| l.percentage)
            .sum();
        if locked > 0.0 {
            Some(locked)
        } else {
            None
        }
    });
    let liquidity = data.trading.liquidity;
    let lp_burned = data.security.lp_locks.iter().any(|l| l.is_burn());

    match lp_lock {
        Some(pct) if pct >= 99.0 => {
            flags.push(format!("✅ LP fully locked ({:.1}%)", pct));
        }
        Some(pct) if pct >= 90.0 => {
            score -= 10.0;
            flags.push(format!("🟠 LP {:.1}% locked", pct));
        }
        Some(pct) if pct >= 80.0 => {
            score -= 20.0;
            flags.push(format!("🟠 LP only {:.1}% locked", pct));
        }
        Some(pct) if pct >= 50.0 => {
            score -= 40.0;
            flags.push(format!("🔴 LP only {:.1}% locked", pct));
        }
        Some(pct) if pct > 0.0 => {
            score -= 60.0;
            flags.push(format!("🔴 LP barely locked ({:.1}%)", pct));
        }
        Some(_) => {
            score -= 5.0;
            flags.push("🟠 LP unlocked (0%)".to_string());
        }
        None => {
            score -= 5.0;
            flags.push("❓ No LP lock data available".to_string());
            missing.push("lp_lock".to_string());
        }
    }

    if lp_burned && lp_lock.map(|p| p >= 90.0).unwrap_or(false) {
        score += 5.0;
        flags.push("✅ LP tokens burned".to_string());
    }

    match liquidity {
        Some(liq) => {
            let age = data.token_age_days.unwrap_or(0.0);
            if liq < 10_000.0 && age > 14.0 {
                score -= 15.0;
                flags.push(format!("🟠 Thin liquidity (${:.0}) for token age", liq));
            } else if liq >= 50_000.0 {
                flags.push(format!("✅ Deep liquidity (${:.0})", liq));
            } else if liq >= 20_000.0 {
                flags.push(format!("✅ Adequate liquidity (${:.0})", liq));
            }
        }
        None => {
            missing.push("liquidity".to_string());
            if lp_lock.is_none() {
                score -= 10.0;
                flags.push("❓ Neither LP lock nor liquidity known".to_string());
            }
        }
    }

    ComponentScore {
        score: clamp_score(score),
        flags,
    }
}

/// Developer behaviour: creator presence, retained balance, launch
/// history, concentration, and the community-takeover age floor.
fn score_dev_abandonment(data: &TokenVettingData, missing: &mut Vec<String>) -> ComponentScore {
    let mut score = 100.0;
    let mut flags = Vec::new();

    let dev = &data.developer;

    if dev.creator_address.is_none() {
        score -= 10.0;
        flags.push("❓ Creator address unknown".to_string());
        missing.push("creator".to_string());
    }

    let holding = dev
        .creator_status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("holding"))
        .unwrap_or(false);
    match dev.creator_balance_percent {
        Some(pct) if pct > 10.0 => {
            score -= 30.0;
            flags.push(format!("🔴 Creator still holds {:.1}% of supply", pct));
        }
        _ if holding => {
            score -= 30.0;
            flags.push("🔴 Creator reported as holding".to_string());
        }
        Some(pct) if pct > 5.0 => {
            score -= 15.0;
            flags.push(format!("🟠 Creator holds {:.1}% of supply", pct));
        }
        Some(pct) => {
            flags.push(format!("✅ Creator balance acceptable ({:.1}%)", pct));
        }
        None => {}
    }

    match dev.twitter_create_token_count {
        Some(count) if count > 5 => {
            score -= 15.0;
            flags.push(format!("🟠 Creator launched {} prior tokens", count));
        }
        Some(count) if count > 2 => {
            score -= 5.0;
            flags.push(format!("🟠 Creator launched {} prior tokens", count));
        }
        _ => {}
    }

    match dev.top10_holder_rate {
        Some(rate) if rate > 50.0 => {
            score -= 20.0;
            flags.push(format!("🔴 Top 10 holder rate {:.1}%", rate));
        }
        Some(rate) if rate > 35.0 => {
            score -= 10.0;
            flags.push(format!("🟠 Top 10 holder rate {:.1}%", rate));
        }
        _ => {}
    }

    match data.token_age_days {
        Some(age) if age < 14.0 => {
            score -= 40.0;
            flags.push(format!(
                "🟠 Token only {:.1} days old, community takeover unproven",
                age
            ));
        }
        None => missing.push("token_age".to_string()),
        _ => {}
    }

    ComponentScore {
        score: clamp_score(score),
        flags,
    }
}

/// Technical safety: mint/freeze authorities and supply circulation.
fn score_technical(data: &TokenVettingData, missing: &mut Vec<String>) -> ComponentScore {
    let mut score = 100.0;
    let mut flags = Vec::new();

    let security = &data.security;

    match (security.is_mintable, security.is_freezable) {
        (None, None) => {
            // No authority data at all: assume the worst, keep scoring.
            score -= 30.0;
            flags.push("❓ Authority data unavailable, assuming worst case".to_string());
            missing.push("mint_authority".to_string());
            missing.push("freeze_authority".to_string());
        }
        (mintable, freezable) => {
            if mintable.unwrap_or(false) {
                score -= 50.0;
                flags.push("🔴 Mint authority active, supply can be inflated".to_string());
            } else if mintable.is_some() {
                flags.push("✅ Mint authority revoked".to_string());
            } else {
                missing.push("mint_authority".to_string());
            }
            if freezable.unwrap_or(false) {
                score -= 40.0;
                flags.push("🔴 Freeze authority active, transfers can be frozen".to_string());
            } else if freezable.is_some() {
                flags.push("✅ Freeze authority revoked".to_string());
            } else {
                missing.push("freeze_authority".to_string());
            }
        }
    }

    match (security.circulating_supply, security.total_supply) {
        (Some(circulating), Some(total)) if total > 0.0 => {
            let ratio = circulating / total * 100.0;
            if ratio < 80.0 {
                score -= 15.0;
                flags.push(format!("🟠 Only {:.1}% of supply circulating", ratio));
            } else if ratio >= 95.0 {
                flags.push(format!("✅ {:.1}% of supply circulating", ratio));
            }
        }
        _ => missing.push("supply".to_string()),
    }

    ComponentScore {
        score: clamp_score(score),
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Chain, DeveloperInfo, HolderInfo, HolderShare, LpLock, SecurityInfo, TokenKey,
        TradingInfo, VettingTokenInfo,
    };

    /// Baseline with every signal nominal: well distributed, locked LP,
    /// clean creator, revoked authorities, mature token.
    fn nominal_data() -> TokenVettingData {
        TokenVettingData {
            token_info: VettingTokenInfo {
                key: TokenKey::new(Chain::Solana, "So11111111111111111111111111111111111111112"),
                symbol: "TKN".to_string(),
                name: "Token".to_string(),
            },
            security: SecurityInfo {
                is_mintable: Some(false),
                is_freezable: Some(false),
                lp_lock_percentage: Some(99.5),
                total_supply: Some(1_000_000_000.0),
                circulating_supply: Some(980_000_000.0),
                lp_locks: vec![LpLock {
                    tag: "burned".to_string(),
                    percentage: Some(99.5),
                    unlock_at: None,
                }],
            },
            holders: HolderInfo {
                count: Some(5_000),
                top_holders: vec![
                    HolderShare { address: "H1".to_string(), percentage: 3.0 },
                    HolderShare { address: "H2".to_string(), percentage: 2.5 },
                    HolderShare { address: "H3".to_string(), percentage: 2.0 },
                ],
            },
            developer: DeveloperInfo {
                creator_address: Some("Creator".to_string()),
                creator_balance_percent: Some(1.0),
                creator_status: Some("sold".to_string()),
                top10_holder_rate: Some(20.0),
                twitter_create_token_count: Some(1),
            },
            trading: TradingInfo {
                price: Some(0.01),
                liquidity: Some(150_000.0),
                volume_24h: Some(50_000.0),
                price_change_24h: Some(2.0),
                fdv: Some(10_000_000.0),
                holder_count: Some(5_000),
            },
            token_age_days: Some(90.0),
        }
    }

    #[test]
    fn test_nominal_token_scores_high() {
        let results = score(&nominal_data());
        assert!(results.overall_score >= 90, "got {}", results.overall_score);
        assert_eq!(results.risk_level, RiskLevel::Low);
        assert!(results.data_sufficient);
        assert!(results.missing_data.is_empty());
    }

    #[test]
    fn test_top_holder_25_percent_scores_60() {
        let mut data = nominal_data();
        data.holders.top_holders[0].percentage = 25.0;
        let results = score(&data);
        // 100 - 40 for the >20% band; holder count healthy so no more
        assert!((results.distribution.score - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mintable_and_freezable_scores_10() {
        let mut data = nominal_data();
        data.security.is_mintable = Some(true);
        data.security.is_freezable = Some(true);
        let results = score(&data);
        assert!((results.technical.score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_authority_data_penalized_not_fatal() {
        let mut data = nominal_data();
        data.security.is_mintable = None;
        data.security.is_freezable = None;
        let results = score(&data);
        assert!((results.technical.score - 70.0).abs() < f64::EPSILON);
        assert!(!results.data_sufficient);
        assert!(results.missing_data.contains(&"mint_authority".to_string()));
    }

    #[test]
    fn test_missing_holder_data_graceful_degradation() {
        let mut data = nominal_data();
        data.holders.top_holders.clear();
        data.holders.count = None;
        let results = score(&data);
        // -5 base, -15 because count is also unknown
        assert!((results.distribution.score - 80.0).abs() < f64::EPSILON);
        assert!(results.missing_data.contains(&"holder_distribution".to_string()));
        assert!(results.missing_data.contains(&"holder_count".to_string()));
    }

    #[test]
    fn test_empty_data_still_produces_score() {
        let data = TokenVettingData {
            token_info: VettingTokenInfo {
                key: TokenKey::new(Chain::Solana, "So11111111111111111111111111111111111111112"),
                symbol: String::new(),
                name: String::new(),
            },
            security: SecurityInfo::default(),
            holders: HolderInfo::default(),
            developer: DeveloperInfo::default(),
            trading: TradingInfo::default(),
            token_age_days: None,
        };
        let results = score(&data);
        assert!(results.overall_score <= 100);
        assert!(!results.data_sufficient);
        // Every unknown shows up for observability
        assert!(results.missing_data.contains(&"lp_lock".to_string()));
        assert!(results.missing_data.contains(&"token_age".to_string()));
    }

    #[test]
    fn test_score_bounds_hold_under_worst_case() {
        let mut data = nominal_data();
        data.holders.top_holders = vec![
            HolderShare { address: "H1".to_string(), percentage: 50.0 },
            HolderShare { address: "H2".to_string(), percentage: 20.0 },
            HolderShare { address: "H3".to_string(), percentage: 15.0 },
        ];
        data.holders.count = Some(10);
        data.security.is_mintable = Some(true);
        data.security.is_freezable = Some(true);
        data.security.lp_lock_percentage = Some(5.0);
        data.security.circulating_supply = Some(100.0);
        data.developer.creator_balance_percent = Some(40.0);
        data.developer.twitter_create_token_count = Some(20);
        data.developer.top10_holder_rate = Some(90.0);
        data.token_age_days = Some(2.0);

        let results = score(&data);
        for component in [
            &results.distribution,
            &results.liquidity,
            &results.dev_abandonment,
            &results.technical,
        ] {
            assert!(component.score >= 0.0 && component.score <= 100.0);
        }
        assert!(results.overall_score <= 100);
        assert_eq!(results.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHT_DISTRIBUTION + WEIGHT_LIQUIDITY + WEIGHT_DEV_ABANDONMENT + WEIGHT_TECHNICAL;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let data = nominal_data();
        let first = score(&data);
        let second = score(&data);
        assert_eq!(first.overall_score, second.overall_score);
        assert_eq!(first.all_flags, second.all_flags);
        assert_eq!(first.eligible_tier, second.eligible_tier);
    }
}
