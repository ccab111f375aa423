//! Tracked token record and field-level partial updates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::id::TokenAddress;
use super::snapshot::MarketSnapshot;

/// A tracked token.
///
/// The address is immutable. Category and valuation are owned by the state
/// machine; market fields are written by the router after each scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub address: TokenAddress,
    pub category: Category,
    pub valuation: Decimal,
    pub liquidity: Decimal,
    pub volume_24h: Decimal,
    pub holder_count: u64,
    /// Written only by deep analysis.
    pub security_score: Option<Decimal>,
    /// Written only by deep analysis.
    pub concentration: Option<Decimal>,
    /// Scans completed since the last category change.
    pub scan_count: u64,
    pub consecutive_failures: u32,
    pub created_at: DateTime<Utc>,
    pub category_changed_at: DateTime<Utc>,
    pub last_scanned_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Build a new token in `category` from a discovery snapshot.
    #[must_use]
    pub fn new(
        address: TokenAddress,
        category: Category,
        snapshot: &MarketSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            address,
            category,
            valuation: snapshot.valuation.unwrap_or_default(),
            liquidity: snapshot.liquidity.unwrap_or_default(),
            volume_24h: snapshot.volume_24h.unwrap_or_default(),
            holder_count: snapshot.holder_count.unwrap_or_default(),
            security_score: snapshot.security_score,
            concentration: snapshot.concentration,
            scan_count: 0,
            consecutive_failures: 0,
            created_at: now,
            category_changed_at: now,
            last_scanned_at: None,
        }
    }

    /// Apply every field present in `patch`, in order.
    pub fn apply(&mut self, patch: &TokenPatch) {
        for update in patch.updates() {
            match *update {
                FieldUpdate::Category { category, at } => {
                    self.category = category;
                    self.category_changed_at = at;
                    self.scan_count = 0;
                }
                FieldUpdate::Valuation(v) => self.valuation = v,
                FieldUpdate::Liquidity(v) => self.liquidity = v,
                FieldUpdate::Volume24h(v) => self.volume_24h = v,
                FieldUpdate::HolderCount(n) => self.holder_count = n,
                FieldUpdate::SecurityScore(v) => self.security_score = Some(v),
                FieldUpdate::Concentration(v) => self.concentration = Some(v),
                FieldUpdate::ScanSucceeded { at } => {
                    self.scan_count += 1;
                    self.last_scanned_at = Some(at);
                    self.consecutive_failures = 0;
                }
                FieldUpdate::ScanFailed => {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                }
            }
        }
    }

    /// Time the token was last known to be alive: last scan, else creation.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_scanned_at.unwrap_or(self.created_at)
    }
}

/// Name of a patchable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Category,
    Valuation,
    Liquidity,
    Volume24h,
    HolderCount,
    SecurityScore,
    Concentration,
    ScanSucceeded,
    ScanFailed,
}

/// A single field write.
///
/// `ScanSucceeded` and `ScanFailed` are relative updates that the repository
/// applies against the stored row, not a value computed by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldUpdate {
    Category { category: Category, at: DateTime<Utc> },
    Valuation(Decimal),
    Liquidity(Decimal),
    Volume24h(Decimal),
    HolderCount(u64),
    SecurityScore(Decimal),
    Concentration(Decimal),
    ScanSucceeded { at: DateTime<Utc> },
    ScanFailed,
}

impl FieldUpdate {
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::Category { .. } => FieldKind::Category,
            Self::Valuation(_) => FieldKind::Valuation,
            Self::Liquidity(_) => FieldKind::Liquidity,
            Self::Volume24h(_) => FieldKind::Volume24h,
            Self::HolderCount(_) => FieldKind::HolderCount,
            Self::SecurityScore(_) => FieldKind::SecurityScore,
            Self::Concentration(_) => FieldKind::Concentration,
            Self::ScanSucceeded { .. } => FieldKind::ScanSucceeded,
            Self::ScanFailed => FieldKind::ScanFailed,
        }
    }
}

/// Partial update to a token: the set of fields present, each at most once.
///
/// A field absent from the patch is left untouched by the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenPatch {
    updates: Vec<FieldUpdate>,
}

impl TokenPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field write.
    #[must_use]
    pub fn with(mut self, update: FieldUpdate) -> Self {
        self.set(update);
        self
    }

    /// Add or replace a field write in place.
    pub fn set(&mut self, update: FieldUpdate) {
        let kind = update.kind();
        if let Some(existing) = self.updates.iter_mut().find(|u| u.kind() == kind) {
            *existing = update;
        } else {
            self.updates.push(update);
        }
    }

    #[must_use]
    pub fn category(self, category: Category, at: DateTime<Utc>) -> Self {
        self.with(FieldUpdate::Category { category, at })
    }

    #[must_use]
    pub fn valuation(self, valuation: Decimal) -> Self {
        self.with(FieldUpdate::Valuation(valuation))
    }

    #[must_use]
    pub fn scan_succeeded(self, at: DateTime<Utc>) -> Self {
        self.with(FieldUpdate::ScanSucceeded { at })
    }

    #[must_use]
    pub fn scan_failed(self) -> Self {
        self.with(FieldUpdate::ScanFailed)
    }

    /// Market fields present in `snapshot`; deep-only fields are added only
    /// when the snapshot carries them.
    #[must_use]
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        let mut patch = Self::new();
        if let Some(v) = snapshot.valuation {
            patch.set(FieldUpdate::Valuation(v));
        }
        if let Some(v) = snapshot.liquidity {
            patch.set(FieldUpdate::Liquidity(v));
        }
        if let Some(v) = snapshot.volume_24h {
            patch.set(FieldUpdate::Volume24h(v));
        }
        if let Some(n) = snapshot.holder_count {
            patch.set(FieldUpdate::HolderCount(n));
        }
        if let Some(v) = snapshot.security_score {
            patch.set(FieldUpdate::SecurityScore(v));
        }
        if let Some(v) = snapshot.concentration {
            patch.set(FieldUpdate::Concentration(v));
        }
        patch
    }

    #[must_use]
    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }

    #[must_use]
    pub fn contains(&self, kind: FieldKind) -> bool {
        self.updates.iter().any(|u| u.kind() == kind)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn token() -> Token {
        Token::new(
            TokenAddress::new("tok"),
            Category::Low,
            &MarketSnapshot {
                valuation: Some(dec!(1000)),
                ..MarketSnapshot::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn absent_fields_are_untouched() {
        let mut t = token();
        t.concentration = Some(dec!(0.42));
        t.apply(&TokenPatch::new().valuation(dec!(2000)));
        assert_eq!(t.valuation, dec!(2000));
        assert_eq!(t.concentration, Some(dec!(0.42)));
    }

    #[test]
    fn later_write_of_same_field_replaces_earlier() {
        let patch = TokenPatch::new().valuation(dec!(1)).valuation(dec!(2));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.updates()[0], FieldUpdate::Valuation(dec!(2)));
    }

    #[test]
    fn category_write_resets_scan_counter() {
        let mut t = token();
        let now = Utc::now();
        t.apply(&TokenPatch::new().scan_succeeded(now));
        t.apply(&TokenPatch::new().scan_succeeded(now));
        assert_eq!(t.scan_count, 2);
        t.apply(&TokenPatch::new().category(Category::High, now));
        assert_eq!(t.scan_count, 0);
        assert_eq!(t.category_changed_at, now);
    }

    #[test]
    fn scan_outcomes_track_consecutive_failures() {
        let mut t = token();
        t.apply(&TokenPatch::new().scan_failed());
        t.apply(&TokenPatch::new().scan_failed());
        assert_eq!(t.consecutive_failures, 2);
        t.apply(&TokenPatch::new().scan_succeeded(Utc::now()));
        assert_eq!(t.consecutive_failures, 0);
        assert!(t.last_scanned_at.is_some());
    }

    #[test]
    fn snapshot_patch_skips_missing_deep_fields() {
        let snapshot = MarketSnapshot {
            valuation: Some(dec!(5)),
            liquidity: Some(dec!(6)),
            ..MarketSnapshot::default()
        };
        let patch = TokenPatch::from_snapshot(&snapshot);
        assert!(patch.contains(FieldKind::Valuation));
        assert!(patch.contains(FieldKind::Liquidity));
        assert!(!patch.contains(FieldKind::Concentration));
        assert!(!patch.contains(FieldKind::SecurityScore));
    }
}
