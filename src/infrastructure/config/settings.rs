//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; provider API keys come from the
//! environment only (`TIERWATCH_HOLDERS_API_KEY`).
//!
//! # Example
//!
//! ```no_run
//! use tierwatch::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use super::archival::ArchivalSettings;
use super::category::{self, default_categories, CategoryConfig};
use super::logging::LoggingConfig;
use super::router::RouterSettings;
use super::scheduler::SchedulerSettings;
use crate::adapter::outbound::provider::ProvidersConfig;
use crate::application::scheduler::CadenceTable;
use crate::domain::BandTable;
use crate::error::{ConfigError, Result};

/// Environment variable holding the `holders` provider API key.
pub const HOLDERS_API_KEY_ENV: &str = "TIERWATCH_HOLDERS_API_KEY";

/// Provider names the router knows how to build.
const KNOWN_PROVIDERS: [&str; 4] = ["dexscreener", "geckoterminal", "rugcheck", "holders"];

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`]. Every section is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database file.
    ///
    /// Defaults to "tierwatch.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Valuation bands and their scan cadences.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    #[serde(default)]
    pub router: RouterSettings,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub archival: ArchivalSettings,
}

fn default_database_path() -> String {
    "tierwatch.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            logging: LoggingConfig::default(),
            categories: default_categories(),
            scheduler: SchedulerSettings::default(),
            router: RouterSettings::default(),
            providers: ProvidersConfig::default(),
            archival: ArchivalSettings::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        // Secrets never come from the config file.
        config.providers.holders.api_key = std::env::var(HOLDERS_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// The first out-of-range value, or any band layout error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("logging.format", "must be \"pretty\" or \"json\""));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" });
        }

        self.bands()?;
        self.cadences()?;

        let scheduler = &self.scheduler;
        if scheduler.max_concurrent_scans == 0 {
            return Err(invalid("scheduler.max_concurrent_scans", "must be greater than 0"));
        }
        if scheduler.failure_threshold == 0 {
            return Err(invalid("scheduler.failure_threshold", "must be greater than 0"));
        }
        if scheduler.shutdown_grace_secs == 0 {
            return Err(invalid("scheduler.shutdown_grace_secs", "must be greater than 0"));
        }

        let router = &self.router;
        if router.daily_budget < Decimal::ZERO {
            return Err(invalid("router.daily_budget", "must be 0 or greater"));
        }
        if router.provider_timeout_ms == 0 {
            return Err(invalid("router.provider_timeout_ms", "must be greater than 0"));
        }
        let mut seen = HashSet::new();
        for name in &router.provider_priority {
            if !KNOWN_PROVIDERS.contains(&name.as_str()) {
                return Err(invalid(
                    "router.provider_priority",
                    format!("unknown provider {name:?}"),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(invalid(
                    "router.provider_priority",
                    format!("provider {name:?} listed twice"),
                ));
            }
        }

        for (name, settings) in self.providers.entries() {
            if settings.unit_cost.is_some_and(|cost| cost < Decimal::ZERO) {
                return Err(invalid(
                    "providers.unit_cost",
                    format!("{name}: must be 0 or greater"),
                ));
            }
            if let Some(base_url) = &settings.base_url {
                Url::parse(base_url).map_err(|e| {
                    invalid("providers.base_url", format!("{name}: {e}"))
                })?;
            }
        }

        if self.archival.enabled {
            if self.archival.idle_after_secs == 0 {
                return Err(invalid("archival.idle_after_secs", "must be greater than 0"));
            }
            if self.archival.check_interval_secs == 0 {
                return Err(invalid("archival.check_interval_secs", "must be greater than 0"));
            }
        }

        Ok(())
    }

    /// Validated band table.
    ///
    /// # Errors
    ///
    /// Gaps, overlaps and other layout errors.
    pub fn bands(&self) -> Result<BandTable, ConfigError> {
        category::band_table(&self.categories)
    }

    /// Validated cadence table.
    ///
    /// # Errors
    ///
    /// Zero intervals or durations.
    pub fn cadences(&self) -> Result<CadenceTable, ConfigError> {
        category::cadence_table(&self.categories)
    }

    /// Render the effective configuration back to TOML.
    ///
    /// # Errors
    ///
    /// Only if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.database, "tierwatch.db");
        assert_eq!(config.categories.len(), 5);
        assert!(!config.providers.holders.enabled);
        assert!(config.providers.dexscreener.enabled);
    }

    #[test]
    fn gap_between_bands_fails_validation() {
        let toml = r#"
            [[categories]]
            name = "low"
            min = 0
            max = 10000
            interval_secs = 300

            [[categories]]
            name = "high"
            min = 20000
            interval_secs = 30
            depth = "deep"
        "#;
        let err = Config::parse_toml(toml).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Config(ConfigError::BandGap { .. })
        ));
    }

    #[test]
    fn custom_bands_parse() {
        let toml = r#"
            [[categories]]
            name = "low"
            min = 0
            max = 10000
            interval_secs = 300

            [[categories]]
            name = "high"
            min = 10000
            interval_secs = 30
            max_duration_secs = 600
            depth = "deep"
        "#;
        let config = Config::parse_toml(toml).unwrap();
        let bands = config.bands().unwrap();
        assert_eq!(bands.category_for(dec!(9999)).unwrap(), Category::Low);
        assert_eq!(bands.category_for(dec!(10000)).unwrap(), Category::High);
    }

    #[test]
    fn unknown_priority_name_is_rejected() {
        let toml = r#"
            [router]
            provider_priority = ["dexscreener", "coinmarketcap"]
        "#;
        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let toml = r#"
            [providers.dexscreener]
            base_url = "not a url"
        "#;
        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn effective_config_round_trips() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let reparsed = Config::parse_toml(&rendered).unwrap();
        assert_eq!(reparsed.categories, config.categories);
        assert_eq!(reparsed.router, config.router);
    }
}
