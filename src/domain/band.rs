//! Valuation bands and the validated band table.
//!
//! Each banded category owns a half-open range `[min, max)`. A [`BandTable`]
//! can only be built from bands that are contiguous and cover `[0, ∞)`, so a
//! lookup on any non-negative valuation always finds exactly one band.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::Category;
use crate::error::ConfigError;

/// A single valuation band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub category: Category,
    pub min: Decimal,
    /// Exclusive upper bound; `None` means unbounded.
    pub max: Option<Decimal>,
}

impl Band {
    #[must_use]
    pub fn new(category: Category, min: Decimal, max: Option<Decimal>) -> Self {
        Self { category, min, max }
    }

    /// Whether `valuation` falls in `[min, max)`.
    #[must_use]
    pub fn contains(&self, valuation: Decimal) -> bool {
        valuation >= self.min && self.max.map_or(true, |max| valuation < max)
    }
}

/// Validated, sorted set of bands.
#[derive(Debug, Clone)]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    /// Validate and build a band table.
    ///
    /// Bands may be given in any order; they are sorted by `min` first.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found: gaps, overlaps, a table that
    /// does not start at 0 or does not end unbounded, duplicate or absorbing
    /// categories, or bands whose order contradicts category rank.
    pub fn new(mut bands: Vec<Band>) -> Result<Self, ConfigError> {
        if bands.is_empty() {
            return Err(ConfigError::EmptyBands);
        }

        let mut seen = Vec::with_capacity(bands.len());
        for band in &bands {
            if band.category.is_absorbing() {
                return Err(ConfigError::AbsorbingBand(band.category));
            }
            if seen.contains(&band.category) {
                return Err(ConfigError::DuplicateBand(band.category));
            }
            seen.push(band.category);
            if let Some(max) = band.max {
                if max <= band.min {
                    return Err(ConfigError::BandInverted {
                        category: band.category,
                        min: band.min,
                        max,
                    });
                }
            }
        }

        bands.sort_by(|a, b| a.min.cmp(&b.min));

        let first = &bands[0];
        if first.min != Decimal::ZERO {
            return Err(ConfigError::BandStart {
                category: first.category,
                min: first.min,
            });
        }

        for pair in bands.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            let Some(lower_max) = lower.max else {
                return Err(ConfigError::UnboundedBeforeEnd {
                    category: lower.category,
                });
            };
            if lower_max < upper.min {
                return Err(ConfigError::BandGap {
                    lower: lower.category,
                    lower_max,
                    upper: upper.category,
                    upper_min: upper.min,
                });
            }
            if lower_max > upper.min {
                return Err(ConfigError::BandOverlap {
                    lower: lower.category,
                    lower_max,
                    upper: upper.category,
                    upper_min: upper.min,
                });
            }
            if upper.category <= lower.category {
                return Err(ConfigError::BandOrder {
                    lower: lower.category,
                    upper: upper.category,
                });
            }
        }

        let last = &bands[bands.len() - 1];
        if let Some(max) = last.max {
            return Err(ConfigError::BoundedEnd {
                category: last.category,
                max,
            });
        }

        Ok(Self { bands })
    }

    /// Find the band containing `valuation`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoMatchingBand`] for negative valuations. A
    /// validated table has no gaps, so this is the only failure.
    pub fn lookup(&self, valuation: Decimal) -> Result<&Band, ConfigError> {
        self.bands
            .iter()
            .find(|band| band.contains(valuation))
            .ok_or(ConfigError::NoMatchingBand { valuation })
    }

    /// Category whose band contains `valuation`.
    ///
    /// # Errors
    ///
    /// See [`BandTable::lookup`].
    pub fn category_for(&self, valuation: Decimal) -> Result<Category, ConfigError> {
        self.lookup(valuation).map(|band| band.category)
    }

    /// Band owned by `category`, if any.
    #[must_use]
    pub fn band(&self, category: Category) -> Option<&Band> {
        self.bands.iter().find(|band| band.category == category)
    }

    /// Whether `category` owns a band in this table.
    #[must_use]
    pub fn has_category(&self, category: Category) -> bool {
        self.band(category).is_some()
    }

    /// Banded categories in ascending valuation order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.bands.iter().map(|band| band.category)
    }

    #[must_use]
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }
}
