//! Market data provider port.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{MarketSnapshot, ProviderTier, TokenAddress};
use crate::error::ProviderError;

/// Static description of a provider, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Unique provider name, as used in `router.provider_priority`.
    pub name: String,
    pub tier: ProviderTier,
    /// Cost charged against the daily budget per successful call.
    pub unit_cost: Decimal,
    /// Declared rank; lower ranks win merges when not listed in the
    /// configured priority.
    pub rank: u32,
}

impl ProviderProfile {
    #[must_use]
    pub fn new(name: impl Into<String>, tier: ProviderTier, unit_cost: Decimal, rank: u32) -> Self {
        Self {
            name: name.into(),
            tier,
            unit_cost,
            rank,
        }
    }
}

/// A source of market fields for a token.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider identity, tier and cost.
    fn profile(&self) -> &ProviderProfile;

    /// Fetch whatever fields this provider knows for `address`.
    ///
    /// Fields the provider does not supply are left `None`.
    async fn fetch_snapshot(
        &self,
        address: &TokenAddress,
    ) -> std::result::Result<MarketSnapshot, ProviderError>;
}
