use serde::{Deserialize, Serialize};
use std::fmt;

/// Chains we reconcile feeds for. Identifier strings from providers are
/// mapped through an explicit table; anything unmapped stays `Unknown`
/// and is rejected upstream rather than silently bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Ethereum,
    Base,
    Bsc,
    Polygon,
    Unknown,
}

impl Chain {
    /// Map a provider chain identifier to a chain. Exact (case-insensitive)
    /// match against known aliases; returns `None` for unmapped inputs so
    /// callers can flag and drop them.
    pub fn from_identifier(id: &str) -> Option<Chain> {
        match id.trim().to_ascii_lowercase().as_str() {
            "solana" | "sol" => Some(Chain::Solana),
            "ethereum" | "eth" | "mainnet" => Some(Chain::Ethereum),
            "base" => Some(Chain::Base),
            "bsc" | "bnb" | "binance-smart-chain" => Some(Chain::Bsc),
            "polygon" | "matic" | "polygon-pos" => Some(Chain::Polygon),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical record key. Address stays case-sensitive (it matters on
/// Solana; EVM addresses are stored as received).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenKey {
    pub chain: Chain,
    pub address: String,
}

impl TokenKey {
    pub fn new(chain: Chain, address: impl Into<String>) -> Self {
        Self { chain, address: address.into() }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.chain, self.address)
    }
}

/// Which feed a market record (or the winning part of it) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    DexScreener,
    GeckoTerminal,
    Birdeye,
    Moralis,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedSource::DexScreener => "dexscreener",
            FeedSource::GeckoTerminal => "geckoterminal",
            FeedSource::Birdeye => "birdeye",
            FeedSource::Moralis => "moralis",
        };
        f.write_str(s)
    }
}

/// Buy/sell transaction counts over the trailing windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TxnStats {
    pub h1_buys: Option<u64>,
    pub h1_sells: Option<u64>,
    pub h24_buys: Option<u64>,
    pub h24_sells: Option<u64>,
}

impl TxnStats {
    /// At least one transaction-count field present.
    pub fn has_any(&self) -> bool {
        self.h1_buys.is_some()
            || self.h1_sells.is_some()
            || self.h24_buys.is_some()
            || self.h24_sells.is_some()
    }
}

/// Price change percentages over the trailing windows. `None` = unknown,
/// so callers never branch on field absence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

/// Market view of a token. Invariant: `price_usd`, `liquidity_usd` and
/// `volume_h24` are finite or absent, never NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub fdv: Option<f64>,
    pub volume_h24: f64,
    pub price_change: PriceChange,
    pub txns: Option<TxnStats>,
    pub holders: Option<u64>,
    pub pair_address: Option<String>,
    pub source: FeedSource,
}

/// Canonical per-token view after a merge cycle. Overwritten in place on
/// each refresh; never deleted by the merge step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub key: TokenKey,
    pub symbol: String,
    pub name: String,
    pub market: MarketData,
    pub logo_url: Option<String>,
    pub category: Option<String>,
}

/// Keep a parsed float only when it is finite. Guards the NaN invariant at
/// every point a provider number enters a record.
pub fn finite(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}
