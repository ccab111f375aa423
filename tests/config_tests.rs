use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal_macros::dec;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use tierwatch::application::pipeline::BudgetPolicy;
use tierwatch::domain::{AnalysisDepth, Category};
use tierwatch::error::{ConfigError, Error};
use tierwatch::infrastructure::bootstrap::{build_engine, engine_options};
use tierwatch::infrastructure::config::settings::Config;

fn write_temp_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn malformed_toml_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_config(&dir, "[scheduler\nmax_concurrent_scans = 4\n");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[test]
fn overlapping_bands_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_temp_config(
        &dir,
        r#"
[[categories]]
name = "low"
min = 0
max = 12000
interval_secs = 300

[[categories]]
name = "medium"
min = 10000
interval_secs = 120
"#,
    );
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::BandOverlap { .. })));
}

#[test]
fn absorbing_category_cannot_own_a_band() {
    let toml = r#"
[[categories]]
name = "low"
min = 0
max = 100
interval_secs = 300

[[categories]]
name = "archived"
min = 100
interval_secs = 300
"#;
    let err = assert_err!(Config::parse_toml(toml));
    assert!(matches!(err, Error::Config(ConfigError::AbsorbingBand(Category::Archived))));
}

#[test]
fn zero_interval_is_rejected() {
    let toml = r#"
[[categories]]
name = "low"
min = 0
interval_secs = 0
"#;
    let err = Config::parse_toml(toml).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue { field: "categories.interval_secs", .. })
    ));
}

#[test]
fn scheduler_and_router_sections_reach_the_engine() {
    let toml = r#"
[scheduler]
max_concurrent_scans = 3
failure_threshold = 7
shutdown_grace_secs = 2
stats_interval_secs = 0
restart_jitter = false

[router]
daily_budget = "4.5"
provider_priority = ["rugcheck", "dexscreener"]
provider_timeout_ms = 1500
on_budget_exceeded = "continue"
"#;
    let config = assert_ok!(Config::parse_toml(toml));
    let options = engine_options(&config);

    assert_eq!(options.scheduler.max_concurrent_scans, 3);
    assert_eq!(options.scheduler.failure_threshold, 7);
    assert_eq!(options.scheduler.shutdown_grace, Duration::from_secs(2));
    assert!(!options.scheduler.restart_jitter);
    assert_eq!(options.stats_interval, None);
    assert_eq!(options.router.daily_budget, dec!(4.5));
    assert_eq!(options.router.provider_priority, vec!["rugcheck", "dexscreener"]);
    assert_eq!(options.router.provider_timeout, Duration::from_millis(1500));
    assert_eq!(options.budget_policy, BudgetPolicy::Continue);
}

#[test]
fn default_tables_cover_every_banded_category() {
    let config = Config::default();
    let bands = config.bands().unwrap();
    let cadences = config.cadences().unwrap();
    for category in bands.categories() {
        assert!(cadences.get(category).is_some(), "{category} has no cadence");
    }
    assert_eq!(bands.category_for(dec!(0)).unwrap(), Category::Nascent);
    assert_eq!(bands.category_for(dec!(1000)).unwrap(), Category::Low);
    assert_eq!(bands.category_for(dec!(250000)).unwrap(), Category::Peak);
    assert_eq!(cadences.get(Category::Peak).unwrap().depth, AnalysisDepth::Deep);
    assert_eq!(
        cadences.get(Category::Nascent).unwrap().max_duration,
        Some(Duration::from_secs(3600))
    );
}

#[tokio::test]
async fn default_config_builds_a_startable_engine() {
    let config = Config::default();
    let engine = build_engine(&config, true).unwrap();
    assert_eq!(engine.start().await.unwrap(), 0);
    // Holders needs a key and is disabled by default.
    let names: Vec<_> = engine
        .router()
        .providers()
        .map(|p| p.profile().name.clone())
        .collect();
    assert_eq!(names, vec!["dexscreener", "geckoterminal", "rugcheck"]);
    engine.shutdown().await;
}

#[test]
fn example_config_is_valid_and_matches_defaults() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.toml");
    let config = assert_ok!(Config::load(path));
    let defaults = Config::default();
    assert_eq!(config.categories, defaults.categories);
    assert_eq!(config.router, defaults.router);
    assert!(!config.providers.holders.enabled);
    assert_eq!(config.providers.rugcheck.unit_cost, Some(dec!(0.002)));
}
