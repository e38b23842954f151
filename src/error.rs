use thiserror::Error;

#[derive(Debug, Error)]
pub enum VetguardError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Scoring error: {0}")]
    ScoringError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle already in flight: {0}")]
    CycleInFlight(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
