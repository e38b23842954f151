//! Feed Merger
//!
//! Folds already-fetched provider payloads into one canonical
//! `TokenRecord` per (chain, address). Pure transformation: fetching is
//! the provider clients' job. Precedence within the fold is "last
//! validated write wins", except the documented per-class rules below.

use std::collections::HashMap;
use tracing::debug;

use crate::ingest::payload::{MergeCandidate, ProviderPayload, SourceClass};
use crate::ingest::validators::is_valid_address;
use crate::models::{Chain, MarketData, TokenKey, TokenRecord};

/// Merge provider payloads into the canonical record map. Idempotent:
/// merging the same payload set twice yields identical records.
pub fn merge(payloads: &[ProviderPayload]) -> HashMap<TokenKey, TokenRecord> {
    let mut records: HashMap<TokenKey, TokenRecord> = HashMap::new();

    for payload in payloads {
        for candidate in payload.normalize() {
            let chain = match Chain::from_identifier(&candidate.chain_id) {
                Some(chain) => chain,
                None => {
                    debug!(
                        "Dropping candidate {} on unmapped chain '{}'",
                        candidate.address, candidate.chain_id
                    );
                    continue;
                }
            };

            if !is_valid_address(chain, &candidate.address) {
                debug!(
                    "Dropping candidate with invalid {} address: {}",
                    chain, candidate.address
                );
                continue;
            }

            let key = TokenKey::new(chain, candidate.address.clone());
            match candidate.class {
                SourceClass::DexPairs => apply_dex_pairs(&mut records, key, candidate),
                SourceClass::Aggregator => apply_aggregator(&mut records, key, candidate),
                SourceClass::MarketCap => apply_market_cap(&mut records, key, candidate),
            }
        }
    }

    records
}

/// Market-pairs provider: full-record writes. A candidate is accepted
/// only when price, liquidity and 24h volume all parsed finite AND at
/// least one transaction count is present. When the same provider
/// already produced a record for the key, the higher-liquidity pair
/// wins.
fn apply_dex_pairs(
    records: &mut HashMap<TokenKey, TokenRecord>,
    key: TokenKey,
    candidate: MergeCandidate,
) {
    let (price, liquidity, volume) = match (
        candidate.price_usd,
        candidate.liquidity_usd,
        candidate.volume_h24,
    ) {
        (Some(p), Some(l), Some(v)) => (p, l, v),
        _ => {
            debug!("Dropping pair candidate {} missing price/liquidity/volume", key);
            return;
        }
    };
    if !candidate.txns.map(|t| t.has_any()).unwrap_or(false) {
        debug!("Dropping pair candidate {} with no transaction counts", key);
        return;
    }

    if let Some(existing) = records.get(&key) {
        if existing.market.source == candidate.source {
            let existing_liq = existing.market.liquidity_usd.unwrap_or(0.0);
            if liquidity <= existing_liq {
                debug!(
                    "Keeping higher-liquidity pair for {} ({} >= {})",
                    key, existing_liq, liquidity
                );
                return;
            }
        }
    }

    let record = TokenRecord {
        key: key.clone(),
        symbol: candidate.symbol,
        name: candidate.name,
        market: MarketData {
            price_usd: Some(price),
            liquidity_usd: Some(liquidity),
            fdv: candidate.fdv,
            volume_h24: volume,
            price_change: candidate.price_change,
            txns: candidate.txns,
            holders: None,
            pair_address: candidate.pair_address,
            source: candidate.source,
        },
        logo_url: candidate.logo_url,
        category: candidate.category,
    };
    records.insert(key, record);
}

/// Secondary aggregator carries no transaction data, so it only ever
/// refreshes records that already have some. It may overwrite
/// price/liquidity/volume/price-change but leaves `txns` untouched.
/// An aggregator-only entry with no prior record is dropped.
fn apply_aggregator(
    records: &mut HashMap<TokenKey, TokenRecord>,
    key: TokenKey,
    candidate: MergeCandidate,
) {
    let existing = match records.get_mut(&key) {
        Some(record) if record.market.txns.map(|t| t.has_any()).unwrap_or(false) => record,
        _ => {
            debug!("Dropping aggregator-only candidate {}", key);
            return;
        }
    };

    if let Some(price) = candidate.price_usd {
        existing.market.price_usd = Some(price);
    }
    if let Some(liquidity) = candidate.liquidity_usd {
        existing.market.liquidity_usd = Some(liquidity);
    }
    if let Some(volume) = candidate.volume_h24 {
        existing.market.volume_h24 = volume;
    }
    if candidate.price_change.h24.is_some() {
        existing.market.price_change.h24 = candidate.price_change.h24;
    }
    if let Some(fdv) = candidate.fdv {
        existing.market.fdv = Some(fdv);
    }
    existing.market.source = candidate.source;
}

/// Market-cap providers merge by union into an existing record: they only
/// fill fields the record is missing. Exception: a later provider in
/// this class may override `holders` with a larger non-zero count.
fn apply_market_cap(
    records: &mut HashMap<TokenKey, TokenRecord>,
    key: TokenKey,
    candidate: MergeCandidate,
) {
    let existing = match records.get_mut(&key) {
        Some(record) => record,
        None => {
            debug!("Dropping market-cap candidate {} with no prior record", key);
            return;
        }
    };

    if existing.market.price_usd.is_none() {
        existing.market.price_usd = candidate.price_usd;
    }
    if existing.market.liquidity_usd.is_none() {
        existing.market.liquidity_usd = candidate.liquidity_usd;
    }
    if existing.market.fdv.is_none() {
        existing.market.fdv = candidate.fdv;
    }
    if existing.market.volume_h24 == 0.0 {
        if let Some(volume) = candidate.volume_h24 {
            existing.market.volume_h24 = volume;
        }
    }
    if existing.logo_url.is_none() {
        existing.logo_url = candidate.logo_url;
    }
    if existing.category.is_none() {
        existing.category = candidate.category;
    }

    // Holders: first reporter wins unless a later one is strictly larger
    // and non-zero.
    match (existing.market.holders, candidate.holders) {
        (None, reported) => existing.market.holders = reported,
        (Some(current), Some(reported)) if reported > current && reported > 0 => {
            existing.market.holders = Some(reported);
        }
        _ => {}
    }
}
