//! Append-only category transition records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::id::{TokenAddress, TransitionId};

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    /// Valuation moved into another band.
    ValuationBand,
    /// Scan task for a time-bounded category expired and was re-derived.
    DurationExpired,
    /// No successful scan within the idle window.
    IdleTimeout,
    /// Operator override.
    Manual,
    /// Token rejected by an external policy.
    Rejected,
}

impl TransitionReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValuationBand => "valuation_band",
            Self::DurationExpired => "duration_expired",
            Self::IdleTimeout => "idle_timeout",
            Self::Manual => "manual",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valuation_band" => Ok(Self::ValuationBand),
            "duration_expired" => Ok(Self::DurationExpired),
            "idle_timeout" => Ok(Self::IdleTimeout),
            "manual" => Ok(Self::Manual),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown transition reason: {other}")),
        }
    }
}

/// A category change, written exactly once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTransition {
    pub id: TransitionId,
    pub address: TokenAddress,
    pub from: Category,
    pub to: Category,
    /// Valuation at the time of the transition.
    pub valuation: Decimal,
    pub reason: TransitionReason,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl CategoryTransition {
    #[must_use]
    pub fn new(
        address: TokenAddress,
        from: Category,
        to: Category,
        valuation: Decimal,
        reason: TransitionReason,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransitionId::new(),
            address,
            from,
            to,
            valuation,
            reason,
            note: None,
            at,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_round_trips_through_its_name() {
        for reason in [
            TransitionReason::ValuationBand,
            TransitionReason::DurationExpired,
            TransitionReason::IdleTimeout,
            TransitionReason::Manual,
            TransitionReason::Rejected,
        ] {
            assert_eq!(reason.as_str().parse::<TransitionReason>(), Ok(reason));
        }
        assert!("vibes".parse::<TransitionReason>().is_err());
    }
}
