//! Lifecycle categories, analysis depth and provider tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;

/// Lifecycle category of a tracked token.
///
/// The five banded categories are ordered by valuation. `Archived` and
/// `Rejected` are absorbing: reachable from any banded category, never left.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nascent,
    Low,
    Medium,
    High,
    Peak,
    Archived,
    Rejected,
}

impl Category {
    /// All categories in rank order.
    pub const ALL: [Self; 7] = [
        Self::Nascent,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Peak,
        Self::Archived,
        Self::Rejected,
    ];

    /// Categories that may own a valuation band.
    pub const BANDED: [Self; 5] = [
        Self::Nascent,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Peak,
    ];

    /// Stable lowercase name used in config, storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nascent => "nascent",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Peak => "peak",
            Self::Archived => "archived",
            Self::Rejected => "rejected",
        }
    }

    /// Position in [`Category::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// True for `Archived` and `Rejected`.
    #[must_use]
    pub const fn is_absorbing(self) -> bool {
        matches!(self, Self::Archived | Self::Rejected)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| LifecycleError::UnknownCategory(s.to_string()))
    }
}

/// How much work a scan does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    /// Free/cheap providers only.
    #[default]
    Shallow,
    /// Adds paid providers.
    Deep,
}

impl AnalysisDepth {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Deep => "deep",
        }
    }

    /// Whether a provider of `tier` may be called at this depth.
    #[must_use]
    pub const fn admits(self, tier: ProviderTier) -> bool {
        match (self, tier) {
            (_, ProviderTier::Free) => true,
            (Self::Deep, ProviderTier::Paid) => true,
            (Self::Shallow, ProviderTier::Paid) => false,
        }
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost tier of a market data provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTier {
    #[default]
    Free,
    Paid,
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::Paid => f.write_str("paid"),
        }
    }
}
