//! Scan cadence per category.

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::{AnalysisDepth, Category};
use crate::error::ConfigError;

/// How often, how deep and for how long a category is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub interval: Duration,
    /// Registration lifetime; `None` means the task lives until rebound.
    pub max_duration: Option<Duration>,
    pub depth: AnalysisDepth,
}

impl Cadence {
    #[must_use]
    pub const fn new(interval: Duration, depth: AnalysisDepth) -> Self {
        Self {
            interval,
            max_duration: None,
            depth,
        }
    }

    #[must_use]
    pub const fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }
}

/// Cadences keyed by category.
#[derive(Debug, Clone, Default)]
pub struct CadenceTable {
    cadences: HashMap<Category, Cadence>,
}

impl CadenceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the cadence for `category`.
    ///
    /// # Errors
    ///
    /// Rejects absorbing categories, zero intervals and zero durations.
    pub fn insert(&mut self, category: Category, cadence: Cadence) -> Result<(), ConfigError> {
        if category.is_absorbing() {
            return Err(ConfigError::InvalidValue {
                field: "categories.interval_secs",
                reason: format!("absorbing category {category} is never scanned"),
            });
        }
        if cadence.interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "categories.interval_secs",
                reason: format!("interval for {category} must be greater than 0"),
            });
        }
        if cadence.max_duration.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidValue {
                field: "categories.max_duration_secs",
                reason: format!("max duration for {category} must be greater than 0"),
            });
        }
        self.cadences.insert(category, cadence);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert) for canned tables.
    ///
    /// # Panics
    ///
    /// On an entry `insert` would reject.
    #[cfg(any(test, feature = "testkit"))]
    #[must_use]
    pub fn with(mut self, category: Category, cadence: Cadence) -> Self {
        if let Err(e) = self.insert(category, cadence) {
            panic!("invalid cadence for {category}: {e}");
        }
        self
    }

    #[must_use]
    pub fn get(&self, category: Category) -> Option<&Cadence> {
        self.cadences.get(&category)
    }

    /// Categories with a cadence, in rank order.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<_> = self.cadences.keys().copied().collect();
        categories.sort();
        categories
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cadences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cadences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absorbing_and_zero_interval() {
        let mut table = CadenceTable::new();
        let cadence = Cadence::new(Duration::from_secs(30), AnalysisDepth::Shallow);
        assert!(table.insert(Category::Archived, cadence).is_err());
        assert!(table
            .insert(
                Category::Low,
                Cadence::new(Duration::ZERO, AnalysisDepth::Shallow)
            )
            .is_err());
        assert!(table.insert(Category::Low, cadence).is_ok());
        assert_eq!(table.categories(), vec![Category::Low]);
    }

    #[test]
    #[should_panic(expected = "invalid cadence for archived")]
    fn builder_refuses_invalid_entries() {
        let _ = CadenceTable::new().with(
            Category::Archived,
            Cadence::new(Duration::from_secs(30), AnalysisDepth::Shallow),
        );
    }
}
