//! Per-chain address format validators.
//!
//! Kept separate from merge/scoring so each strategy stays unit-testable
//! on its own. A candidate whose address fails its chain's validator is
//! discarded by the merger regardless of source.

use crate::models::Chain;

/// Validate `address` against the format rules of `chain`.
pub fn is_valid_address(chain: Chain, address: &str) -> bool {
    match chain {
        Chain::Solana => is_valid_solana_mint(address),
        Chain::Ethereum | Chain::Base | Chain::Bsc | Chain::Polygon => {
            is_valid_evm_address(address)
        }
        // No format rules for an unknown chain means nothing passes.
        Chain::Unknown => false,
    }
}

/// Solana mints are 32-byte base58 strings (32-44 chars). Anything that
/// looks like an EVM address or a path-style identifier is rejected
/// before decoding.
fn is_valid_solana_mint(address: &str) -> bool {
    if address.len() < 32 || address.len() > 44 {
        return false;
    }
    if address.starts_with("0x") || address.contains('/') {
        return false;
    }
    match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes.len() == 32,
        Err(_) => false,
    }
}

/// EVM addresses: 0x-prefixed, 40 hex chars. Checksum casing is not
/// enforced here; addresses are stored as received.
fn is_valid_evm_address(address: &str) -> bool {
    if address.len() != 42 || !address.starts_with("0x") {
        return false;
    }
    address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
