//! GeckoTerminal provider (free tier).
//!
//! Uses `/networks/{network}/tokens/{address}`. Numeric attributes arrive as
//! strings.

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

pub const NAME: &str = "geckoterminal";
const DEFAULT_BASE_URL: &str = "https://api.geckoterminal.com/api/v2";
const DEFAULT_NETWORK: &str = "solana";
const DEFAULT_RANK: u32 = 20;
const ACCEPT: &str = "application/json;version=20230302";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    data: TokenData,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    attributes: TokenAttributes,
}

#[derive(Debug, Deserialize)]
struct TokenAttributes {
    #[serde(default)]
    market_cap_usd: Option<Decimal>,
    #[serde(default)]
    fdv_usd: Option<Decimal>,
    #[serde(default)]
    total_reserve_in_usd: Option<Decimal>,
    #[serde(default)]
    volume_usd: Option<VolumeDto>,
}

#[derive(Debug, Deserialize)]
struct VolumeDto {
    #[serde(default)]
    h24: Option<Decimal>,
}

/// GeckoTerminal market data.
pub struct GeckoTerminalProvider {
    http: HttpClient,
    base_url: String,
    network: String,
    profile: ProviderProfile,
}

impl GeckoTerminalProvider {
    #[must_use]
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Self {
        Self {
            http: http::client(timeout),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            network: settings.network_or(DEFAULT_NETWORK),
            profile: ProviderProfile::new(
                NAME,
                settings.tier.unwrap_or(ProviderTier::Free),
                settings.unit_cost.unwrap_or(dec!(0)),
                settings.rank.unwrap_or(DEFAULT_RANK),
            ),
        }
    }

    fn snapshot_from(response: TokenResponse) -> MarketSnapshot {
        let attributes = response.data.attributes;
        MarketSnapshot {
            valuation: attributes
                .market_cap_usd
                .filter(|v| !v.is_zero())
                .or(attributes.fdv_usd),
            liquidity: attributes.total_reserve_in_usd,
            volume_24h: attributes.volume_usd.and_then(|v| v.h24),
            ..MarketSnapshot::default()
        }
    }
}

#[async_trait]
impl MarketDataProvider for GeckoTerminalProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn fetch_snapshot(&self, address: &TokenAddress) -> Result<MarketSnapshot, ProviderError> {
        let url = format!("{}/networks/{}/tokens/{}", self.base_url, self.network, address);
        debug!(provider = NAME, address = %address, "Fetching token");
        let response: TokenResponse =
            http::get_json(self.http.get(&url).header("Accept", ACCEPT), NAME).await?;
        Ok(Self::snapshot_from(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> MarketSnapshot {
        GeckoTerminalProvider::snapshot_from(http::decode(NAME, body).unwrap())
    }

    #[test]
    fn reads_string_attributes() {
        let body = r#"{"data": {"id": "solana_x", "attributes": {
            "market_cap_usd": "52000.5",
            "fdv_usd": "60000",
            "total_reserve_in_usd": "8100.12",
            "volume_usd": {"h24": "1999.9"}
        }}}"#;
        let snapshot = parse(body);
        assert_eq!(snapshot.valuation, Some(dec!(52000.5)));
        assert_eq!(snapshot.liquidity, Some(dec!(8100.12)));
        assert_eq!(snapshot.volume_24h, Some(dec!(1999.9)));
    }

    #[test]
    fn null_market_cap_uses_fdv() {
        let body = r#"{"data": {"attributes": {"market_cap_usd": null, "fdv_usd": "123"}}}"#;
        let snapshot = parse(body);
        assert_eq!(snapshot.valuation, Some(dec!(123)));
        assert_eq!(snapshot.liquidity, None);
    }
}
