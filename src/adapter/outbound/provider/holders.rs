//! Top-holder report (paid tier, API key required).
//!
//! Concentration is the summed share of the ten largest holders, in percent.

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

pub const NAME: &str = "holders";
const DEFAULT_BASE_URL: &str = "https://api.holderscan.com/v0";
const DEFAULT_NETWORK: &str = "sol";
const DEFAULT_RANK: u32 = 40;
const TOP_HOLDERS: usize = 10;

#[derive(Debug, Deserialize)]
struct HoldersDto {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    holders: Vec<HolderDto>,
}

#[derive(Debug, Deserialize)]
struct HolderDto {
    pct: Decimal,
}

/// Holder distribution lookup.
pub struct HoldersProvider {
    http: HttpClient,
    base_url: String,
    network: String,
    api_key: String,
    profile: ProviderProfile,
}

impl HoldersProvider {
    #[must_use]
    pub fn new(settings: &ProviderSettings, api_key: String, timeout: Duration) -> Self {
        Self {
            http: http::client(timeout),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            network: settings.network_or(DEFAULT_NETWORK),
            api_key,
            profile: ProviderProfile::new(
                NAME,
                settings.tier.unwrap_or(ProviderTier::Paid),
                settings.unit_cost.unwrap_or(dec!(0.01)),
                settings.rank.unwrap_or(DEFAULT_RANK),
            ),
        }
    }

    fn snapshot_from(mut report: HoldersDto) -> MarketSnapshot {
        report.holders.sort_by(|a, b| b.pct.cmp(&a.pct));
        let concentration = (!report.holders.is_empty()).then(|| {
            report
                .holders
                .iter()
                .take(TOP_HOLDERS)
                .map(|h| h.pct)
                .sum::<Decimal>()
                .min(dec!(100))
        });

        MarketSnapshot {
            holder_count: report.total.filter(|n| *n > 0),
            concentration,
            ..MarketSnapshot::default()
        }
    }
}

#[async_trait]
impl MarketDataProvider for HoldersProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn fetch_snapshot(&self, address: &TokenAddress) -> Result<MarketSnapshot, ProviderError> {
        let url = format!("{}/{}/tokens/{}/holders", self.base_url, self.network, address);
        debug!(provider = NAME, address = %address, "Fetching holders");
        let request = self
            .http
            .get(&url)
            .query(&[("limit", TOP_HOLDERS)])
            .header("x-api-key", &self.api_key);
        let report: HoldersDto = http::get_json(request, NAME).await?;
        Ok(Self::snapshot_from(report))
    }
}
