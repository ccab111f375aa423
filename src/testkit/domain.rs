//! Builders for domain primitives used across tests.

use rust_decimal::Decimal;

use crate::domain::{MarketSnapshot, TokenAddress};

/// Address from a string.
pub fn address(id: &str) -> TokenAddress {
    TokenAddress::new(id)
}

/// Generate `n` addresses named `mint0`, `mint1`, ..., `mint{n-1}`.
pub fn addresses(n: usize) -> Vec<TokenAddress> {
    (0..n).map(|i| TokenAddress::new(format!("mint{i}"))).collect()
}

/// Snapshot carrying only a valuation.
pub fn valued(valuation: u64) -> MarketSnapshot {
    MarketSnapshot {
        valuation: Some(Decimal::from(valuation)),
        ..MarketSnapshot::default()
    }
}

/// Snapshot carrying only liquidity.
pub fn liquid(liquidity: u64) -> MarketSnapshot {
    MarketSnapshot {
        liquidity: Some(Decimal::from(liquidity)),
        ..MarketSnapshot::default()
    }
}
