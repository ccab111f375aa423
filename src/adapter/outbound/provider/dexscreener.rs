//! DexScreener provider (free tier).
//!
//! Uses `/token-pairs/v1/{chain}/{address}` and reads the most liquid pair.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::debug;

use super::http;
use super::settings::ProviderSettings;
use crate::domain::{MarketSnapshot, ProviderTier, TokenAddress};
use crate::error::ProviderError;
use crate::port::outbound::provider::{MarketDataProvider, ProviderProfile};

pub const NAME: &str = "dexscreener";
const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com";
const DEFAULT_CHAIN: &str = "solana";
const DEFAULT_RANK: u32 = 10;

#[derive(Debug, Deserialize)]
struct PairDto {
    #[serde(rename = "marketCap", default)]
    market_cap: Option<Decimal>,
    #[serde(default)]
    fdv: Option<Decimal>,
    #[serde(default)]
    liquidity: Option<LiquidityDto>,
    #[serde(default)]
    volume: Option<VolumeDto>,
}

#[derive(Debug, Deserialize)]
struct LiquidityDto {
    #[serde(default)]
    usd: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct VolumeDto {
    #[serde(default)]
    h24: Option<Decimal>,
}

impl PairDto {
    fn liquidity_usd(&self) -> Decimal {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .unwrap_or_default()
    }
}

/// DexScreener market data.
pub struct DexScreenerProvider {
    http: HttpClient,
    base_url: String,
    chain: String,
    profile: ProviderProfile,
}

impl DexScreenerProvider {
    #[must_use]
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Self {
        Self {
            http: http::client(timeout),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            chain: settings.network_or(DEFAULT_CHAIN),
            profile: ProviderProfile::new(
                NAME,
                settings.tier.unwrap_or(ProviderTier::Free),
                settings.unit_cost.unwrap_or(dec!(0)),
                settings.rank.unwrap_or(DEFAULT_RANK),
            ),
        }
    }

    fn snapshot_from(pairs: &[PairDto]) -> Result<MarketSnapshot, ProviderError> {
        let best = pairs
            .iter()
            .max_by_key(|pair| pair.liquidity_usd())
            .ok_or_else(|| ProviderError::NotFound {
                provider: NAME.to_string(),
            })?;

        Ok(MarketSnapshot {
            valuation: best.market_cap.filter(|v| !v.is_zero()).or(best.fdv),
            liquidity: best.liquidity.as_ref().and_then(|l| l.usd),
            volume_24h: best.volume.as_ref().and_then(|v| v.h24),
            ..MarketSnapshot::default()
        })
    }
}

#[async_trait]
impl MarketDataProvider for DexScreenerProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn fetch_snapshot(&self, address: &TokenAddress) -> Result<MarketSnapshot, ProviderError> {
        let url = format!("{}/token-pairs/v1/{}/{}", self.base_url, self.chain, address);
        debug!(provider = NAME, address = %address, "Fetching pairs");
        let pairs: Vec<PairDto> = http::get_json(self.http.get(&url), NAME).await?;
        Self::snapshot_from(&pairs)
    }
}
