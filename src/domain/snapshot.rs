//! Market snapshots and the per-scan analysis result.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::AnalysisDepth;
use super::id::TokenAddress;

/// Market fields reported by one provider or merged across several.
///
/// `None` means the field was not supplied. Providers report whatever subset
/// of fields they know about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub valuation: Option<Decimal>,
    pub liquidity: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub holder_count: Option<u64>,
    pub security_score: Option<Decimal>,
    pub concentration: Option<Decimal>,
}

/// Keep `current` if it holds a usable value, otherwise take `candidate`.
fn fill_decimal(current: &mut Option<Decimal>, candidate: Option<Decimal>) {
    if current.is_none() {
        if let Some(v) = candidate.filter(|v| !v.is_zero()) {
            *current = Some(v);
        }
    }
}

impl MarketSnapshot {
    /// Fill fields still missing here from a lower-priority snapshot.
    ///
    /// Zero and missing values never win a field.
    pub fn fill_from(&mut self, lower: &MarketSnapshot) {
        fill_decimal(&mut self.valuation, lower.valuation);
        fill_decimal(&mut self.liquidity, lower.liquidity);
        fill_decimal(&mut self.volume_24h, lower.volume_24h);
        if self.holder_count.is_none() {
            self.holder_count = lower.holder_count.filter(|n| *n > 0);
        }
        fill_decimal(&mut self.security_score, lower.security_score);
        fill_decimal(&mut self.concentration, lower.concentration);
    }

    /// Merge snapshots given in priority order, highest first.
    #[must_use]
    pub fn merge_in_priority<'a>(snapshots: impl IntoIterator<Item = &'a MarketSnapshot>) -> Self {
        let mut merged = Self::default();
        for snapshot in snapshots {
            merged.fill_from(snapshot);
        }
        merged
    }

    /// True when no field was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn valuation_or_zero(&self) -> Decimal {
        self.valuation.unwrap_or_default()
    }

    #[must_use]
    pub fn liquidity_or_zero(&self) -> Decimal {
        self.liquidity.unwrap_or_default()
    }

    #[must_use]
    pub fn volume_or_zero(&self) -> Decimal {
        self.volume_24h.unwrap_or_default()
    }

    #[must_use]
    pub fn holders_or_zero(&self) -> u64 {
        self.holder_count.unwrap_or_default()
    }
}

/// Outcome of one router analysis.
///
/// Produced and consumed within a single scan; only its snapshot is
/// persisted onto the token.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub address: TokenAddress,
    pub depth: AnalysisDepth,
    pub snapshot: MarketSnapshot,
    /// Providers that returned data, in priority order.
    pub providers: Vec<String>,
    /// Providers that failed or timed out.
    pub failed: Vec<String>,
    /// Cost incurred by this call.
    pub cost: Decimal,
    pub duration: Duration,
}

impl AnalysisResult {
    /// True when at least one provider contributed.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn higher_priority_non_null_wins() {
        let a = MarketSnapshot {
            liquidity: Some(dec!(300)),
            ..MarketSnapshot::default()
        };
        let b = MarketSnapshot {
            liquidity: Some(dec!(500)),
            ..MarketSnapshot::default()
        };
        let merged = MarketSnapshot::merge_in_priority([&a, &b]);
        assert_eq!(merged.liquidity, Some(dec!(300)));
    }

    #[test]
    fn null_or_zero_falls_through_to_lower_priority() {
        let a = MarketSnapshot {
            valuation: Some(dec!(0)),
            liquidity: None,
            holder_count: Some(0),
            ..MarketSnapshot::default()
        };
        let b = MarketSnapshot {
            valuation: Some(dec!(42)),
            liquidity: Some(dec!(500)),
            holder_count: Some(17),
            ..MarketSnapshot::default()
        };
        let merged = MarketSnapshot::merge_in_priority([&a, &b]);
        assert_eq!(merged.valuation, Some(dec!(42)));
        assert_eq!(merged.liquidity, Some(dec!(500)));
        assert_eq!(merged.holder_count, Some(17));
    }

    #[test]
    fn merging_nothing_is_zero_valued() {
        let merged = MarketSnapshot::merge_in_priority(std::iter::empty::<&MarketSnapshot>());
        assert!(merged.is_empty());
        assert_eq!(merged.valuation_or_zero(), Decimal::ZERO);
        assert_eq!(merged.holders_or_zero(), 0);
    }
}
