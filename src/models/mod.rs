pub mod monitoring;
pub mod token;
pub mod vetting;

// Re-export commonly used types
pub use monitoring::{Alert, AlertSeverity, AlertTrigger, MonitoringSnapshot, Trend};
pub use token::{
    finite, Chain, FeedSource, MarketData, PriceChange, TokenKey, TokenRecord, TxnStats,
};
pub use vetting::{
    ComponentScore, DeveloperInfo, HolderInfo, HolderShare, ListingTier, LpLock, RiskLevel,
    SecurityInfo, TokenVettingData, TradingInfo, VettingResults, VettingTokenInfo,
};
