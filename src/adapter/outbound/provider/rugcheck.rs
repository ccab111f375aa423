//! RugCheck security report (paid tier).

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

pub const NAME: &str = "rugcheck";
const DEFAULT_BASE_URL: &str = "https://api.rugcheck.xyz/v1";
const DEFAULT_RANK: u32 = 30;

#[derive(Debug, Deserialize)]
struct ReportDto {
    #[serde(default)]
    score_normalised: Option<Decimal>,
    #[serde(rename = "totalHolders", default)]
    total_holders: Option<u64>,
}

/// Token risk score and holder count.
pub struct RugCheckProvider {
    http: HttpClient,
    base_url: String,
    profile: ProviderProfile,
}

impl RugCheckProvider {
    #[must_use]
    pub fn new(settings: &ProviderSettings, timeout: Duration) -> Self {
        Self {
            http: http::client(timeout),
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            profile: ProviderProfile::new(
                NAME,
                settings.tier.unwrap_or(ProviderTier::Paid),
                settings.unit_cost.unwrap_or(dec!(0.002)),
                settings.rank.unwrap_or(DEFAULT_RANK),
            ),
        }
    }

    fn snapshot_from(report: ReportDto) -> MarketSnapshot {
        MarketSnapshot {
            security_score: report.score_normalised,
            holder_count: report.total_holders.filter(|n| *n > 0),
            ..MarketSnapshot::default()
        }
    }
}

#[async_trait]
impl MarketDataProvider for RugCheckProvider {
    fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    async fn fetch_snapshot(&self, address: &TokenAddress) -> Result<MarketSnapshot, ProviderError> {
        let url = format!("{}/tokens/{}/report", self.base_url, address);
        debug!(provider = NAME, address = %address, "Fetching report");
        let report: ReportDto = http::get_json(self.http.get(&url), NAME).await?;
        Ok(Self::snapshot_from(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_score_and_holders() {
        let body = r#"{"mint": "x", "score": 1200, "score_normalised": 12, "totalHolders": 4312, "risks": []}"#;
        let snapshot = RugCheckProvider::snapshot_from(http::decode(NAME, body).unwrap());
        assert_eq!(snapshot.security_score, Some(dec!(12)));
        assert_eq!(snapshot.holder_count, Some(4312));
        assert_eq!(snapshot.valuation, None);
    }

    #[test]
    fn missing_fields_stay_absent() {
        let snapshot = RugCheckProvider::snapshot_from(http::decode(NAME, "{}").unwrap());
        assert!(snapshot.is_empty());
    }
}
