//! Provider payload shapes and their normalization.
//!
//! Provider responses are inconsistent JSON; each payload class gets a
//! typed shape and one explicit normalization function into the shared
//! `MergeCandidate` intermediate. The merger only ever sees candidates,
//! never raw provider fields.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{finite, FeedSource, PriceChange, TxnStats};

lazy_static! {
    /// Quote-asset symbols that never identify the listed token side of a
    /// pair: wrapped natives and major stables.
    static ref QUOTE_ASSET_SYMBOLS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for sym in [
            "SOL", "WSOL", "ETH", "WETH", "BNB", "WBNB", "MATIC", "WMATIC", "POL",
            "USDC", "USDT", "DAI", "BUSD", "FDUSD",
        ] {
            s.insert(sym);
        }
        s
    };

    /// Known quote-asset addresses, for providers that report symbols
    /// unreliably.
    static ref QUOTE_ASSET_ADDRESSES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for addr in [
            // WSOL / USDC / USDT on Solana
            "So11111111111111111111111111111111111111112",
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
            // WETH / USDC / USDT on Ethereum
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "0xdAC17F958D2ee523a2206206994597C13D831ec7",
        ] {
            s.insert(addr);
        }
        s
    };
}

fn is_quote_asset(symbol: &str, address: &str) -> bool {
    QUOTE_ASSET_SYMBOLS.contains(symbol.to_ascii_uppercase().as_str())
        || QUOTE_ASSET_ADDRESSES.contains(address)
}

/// Which payload class a candidate came from; the merger's precedence
/// rules key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClass {
    DexPairs,
    Aggregator,
    MarketCap,
}

/// Shared intermediate record every payload normalizes into.
#[derive(Debug, Clone)]
pub struct MergeCandidate {
    pub chain_id: String,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub class: SourceClass,
    pub source: FeedSource,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub fdv: Option<f64>,
    pub volume_h24: Option<f64>,
    pub price_change: PriceChange,
    pub txns: Option<TxnStats>,
    pub holders: Option<u64>,
    pub pair_address: Option<String>,
    pub logo_url: Option<String>,
    pub category: Option<String>,
}

// ============================================================================
// Market-pairs payload (DexScreener shape)
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairToken {
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PairTxnWindow {
    #[serde(default)]
    pub buys: Option<u64>,
    #[serde(default)]
    pub sells: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PairTxns {
    #[serde(default)]
    pub h1: PairTxnWindow,
    #[serde(default)]
    pub h24: PairTxnWindow,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PairVolume {
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PairPriceChange {
    #[serde(default)]
    pub m5: Option<f64>,
    #[serde(default)]
    pub h1: Option<f64>,
    #[serde(default)]
    pub h6: Option<f64>,
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PairLiquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

/// One trading pair from the market-pairs provider. Prices arrive as
/// strings, liquidity/volume as numbers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    pub chain_id: String,
    #[serde(default)]
    pub pair_address: Option<String>,
    pub base_token: PairToken,
    pub quote_token: PairToken,
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub liquidity: PairLiquidity,
    #[serde(default)]
    pub volume: PairVolume,
    #[serde(default)]
    pub price_change: PairPriceChange,
    #[serde(default)]
    pub txns: PairTxns,
    #[serde(default)]
    pub fdv: Option<f64>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl DexPair {
    /// Resolve which side of the pair is the listed token. When the base
    /// side is a well-known quote asset (wrapped native, major stable),
    /// the counter-asset is the token.
    pub fn token_side(&self) -> &PairToken {
        if is_quote_asset(&self.base_token.symbol, &self.base_token.address) {
            &self.quote_token
        } else {
            &self.base_token
        }
    }
}

// ============================================================================
// Secondary aggregator payload (no transaction data)
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorEntry {
    pub chain_id: String,
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub liquidity_usd: Option<f64>,
    #[serde(default)]
    pub volume_h24: Option<f64>,
    #[serde(default)]
    pub price_change_h24: Option<f64>,
    #[serde(default)]
    pub fdv: Option<f64>,
}

// ============================================================================
// Chain-specific market-cap payload (multi-field enrichment)
// ============================================================================

/// Enrichment entry from a market-cap/holder provider. `holders` is
/// extracted by [`parse_holder_count`] because providers disagree on the
/// field name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCapEntry {
    pub chain_id: String,
    pub address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub liquidity_usd: Option<f64>,
    #[serde(default)]
    pub volume_h24: Option<f64>,
    #[serde(default)]
    pub fdv: Option<f64>,
    #[serde(default)]
    pub holders: Option<u64>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Pull a holder count out of a raw provider object, trying the field
/// name variants seen in the wild. Values may be numbers or strings.
pub fn parse_holder_count(raw: &serde_json::Value) -> Option<u64> {
    for field in ["totalHolders", "holderCount", "holders", "holder_count"] {
        let v = &raw[field];
        if let Some(n) = v.as_u64() {
            return Some(n);
        }
        if let Some(s) = v.as_str() {
            if let Ok(n) = s.trim().parse::<u64>() {
                return Some(n);
            }
        }
    }
    None
}

// ============================================================================
// Tagged payload union + normalization
// ============================================================================

/// One provider's already-fetched response, tagged by class.
#[derive(Debug, Clone)]
pub enum ProviderPayload {
    DexPairs {
        source: FeedSource,
        pairs: Vec<DexPair>,
    },
    Aggregator {
        source: FeedSource,
        entries: Vec<AggregatorEntry>,
    },
    MarketCap {
        source: FeedSource,
        entries: Vec<MarketCapEntry>,
    },
}

impl ProviderPayload {
    /// Normalize into the shared intermediate. Pure; no validation here
    /// beyond keeping parsed numbers finite. Validation and precedence
    /// belong to the merger.
    pub fn normalize(&self) -> Vec<MergeCandidate> {
        match self {
            ProviderPayload::DexPairs { source, pairs } => pairs
                .iter()
                .map(|pair| {
                    let token = pair.token_side();
                    let txns = TxnStats {
                        h1_buys: pair.txns.h1.buys,
                        h1_sells: pair.txns.h1.sells,
                        h24_buys: pair.txns.h24.buys,
                        h24_sells: pair.txns.h24.sells,
                    };
                    MergeCandidate {
                        chain_id: pair.chain_id.clone(),
                        address: token.address.clone(),
                        symbol: token.symbol.clone(),
                        name: token.name.clone(),
                        class: SourceClass::DexPairs,
                        source: *source,
                        price_usd: pair
                            .price_usd
                            .as_ref()
                            .and_then(|s| s.trim().parse::<f64>().ok())
                            .and_then(finite),
                        liquidity_usd: pair.liquidity.usd.and_then(finite),
                        fdv: pair.fdv.and_then(finite),
                        volume_h24: pair.volume.h24.and_then(finite),
                        price_change: PriceChange {
                            m5: pair.price_change.m5.and_then(finite),
                            h1: pair.price_change.h1.and_then(finite),
                            h6: pair.price_change.h6.and_then(finite),
                            h24: pair.price_change.h24.and_then(finite),
                        },
                        txns: Some(txns),
                        holders: None,
                        pair_address: pair.pair_address.clone(),
                        logo_url: pair.logo_url.clone(),
                        category: None,
                    }
                })
                .collect(),
            ProviderPayload::Aggregator { source, entries } => entries
                .iter()
                .map(|e| MergeCandidate {
                    chain_id: e.chain_id.clone(),
                    address: e.address.clone(),
                    symbol: e.symbol.clone(),
                    name: e.name.clone(),
                    class: SourceClass::Aggregator,
                    source: *source,
                    price_usd: e.price_usd.and_then(finite),
                    liquidity_usd: e.liquidity_usd.and_then(finite),
                    fdv: e.fdv.and_then(finite),
                    volume_h24: e.volume_h24.and_then(finite),
                    price_change: PriceChange {
                        h24: e.price_change_h24.and_then(finite),
                        ..PriceChange::default()
                    },
                    txns: None,
                    holders: None,
                    pair_address: None,
                    logo_url: None,
                    category: None,
                })
                .collect(),
            ProviderPayload::MarketCap { source, entries } => entries
                .iter()
                .map(|e| MergeCandidate {
                    chain_id: e.chain_id.clone(),
                    address: e.address.clone(),
                    symbol: e.symbol.clone(),
                    name: e.name.clone(),
                    class: SourceClass::MarketCap,
                    source: *source,
                    price_usd: e.price_usd.and_then(finite),
                    liquidity_usd: e.liquidity_usd.and_then(finite),
                    fdv: e.fdv.and_then(finite),
                    volume_h24: e.volume_h24.and_then(finite),
                    price_change: PriceChange::default(),
                    txns: None,
                    holders: e.holders,
                    pair_address: None,
                    logo_url: e.logo_url.clone(),
                    category: e.category.clone(),
                })
                .collect(),
        }
    }
}
