//! `[[categories]]` tables: valuation bands and scan cadences.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::application::scheduler::{Cadence, CadenceTable};
use crate::domain::{AnalysisDepth, Band, BandTable, Category};
use crate::error::ConfigError;

/// One banded category: its valuation range and how it is scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: Category,
    pub min: Decimal,
    /// Exclusive upper bound; omitted on the last band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Decimal>,
    pub interval_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<u64>,
    #[serde(default)]
    pub depth: AnalysisDepth,
}

impl CategoryConfig {
    fn new(
        name: Category,
        min: Decimal,
        max: Option<Decimal>,
        interval_secs: u64,
        depth: AnalysisDepth,
    ) -> Self {
        Self {
            name,
            min,
            max,
            interval_secs,
            max_duration_secs: None,
            depth,
        }
    }

    #[must_use]
    pub fn band(&self) -> Band {
        Band::new(self.name, self.min, self.max)
    }

    #[must_use]
    pub fn cadence(&self) -> Cadence {
        let cadence = Cadence::new(Duration::from_secs(self.interval_secs), self.depth);
        match self.max_duration_secs {
            Some(secs) => cadence.with_max_duration(Duration::from_secs(secs)),
            None => cadence,
        }
    }
}

/// Built-in five-band layout.
#[must_use]
pub fn default_categories() -> Vec<CategoryConfig> {
    use AnalysisDepth::{Deep, Shallow};

    let mut nascent = CategoryConfig::new(Category::Nascent, dec!(0), Some(dec!(1000)), 60, Shallow);
    nascent.max_duration_secs = Some(3600);

    vec![
        nascent,
        CategoryConfig::new(Category::Low, dec!(1000), Some(dec!(10000)), 300, Shallow),
        CategoryConfig::new(Category::Medium, dec!(10000), Some(dec!(30000)), 120, Shallow),
        CategoryConfig::new(Category::High, dec!(30000), Some(dec!(100000)), 30, Deep),
        CategoryConfig::new(Category::Peak, dec!(100000), None, 15, Deep),
    ]
}

/// Build and validate the band table.
///
/// # Errors
///
/// Any band layout error (gap, overlap, ordering, unbounded end).
pub fn band_table(categories: &[CategoryConfig]) -> Result<BandTable, ConfigError> {
    BandTable::new(categories.iter().map(CategoryConfig::band).collect())
}

/// Build and validate the cadence table.
///
/// # Errors
///
/// [`ConfigError::InvalidValue`] for zero intervals or durations.
pub fn cadence_table(categories: &[CategoryConfig]) -> Result<CadenceTable, ConfigError> {
    let mut table = CadenceTable::new();
    for category in categories {
        table.insert(category.name, category.cadence())?;
    }
    Ok(table)
}
