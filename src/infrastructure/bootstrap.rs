//! Composition root: builds an [`Engine`] from a [`Config`].

use tracing::info;

use super::config::settings::Config;
use super::factory::persistence::build_repository;
use super::factory::provider::build_providers;
use super::orchestration::{Engine, EngineOptions};
use crate::error::Result;

/// Translate configuration sections into engine options.
#[must_use]
pub fn engine_options(config: &Config) -> EngineOptions {
    EngineOptions {
        scheduler: config.scheduler.to_config(),
        router: config.router.to_config(),
        budget_policy: config.router.on_budget_exceeded,
        archival: config.archival.to_config(),
        stats_interval: config.scheduler.stats_interval(),
    }
}

/// Build the repository, providers and engine described by `config`.
///
/// # Errors
///
/// Band or cadence errors, or a database that cannot be opened.
pub fn build_engine(config: &Config, in_memory: bool) -> Result<Engine> {
    let bands = config.bands()?;
    let cadences = config.cadences()?;
    let repository = build_repository(config, in_memory)?;
    let providers = build_providers(&config.providers, config.router.provider_timeout());
    info!(
        bands = bands.bands().len(),
        providers = providers.len(),
        daily_budget = %config.router.daily_budget,
        "Engine configured"
    );
    Ok(Engine::new(
        repository,
        bands,
        cadences,
        providers,
        engine_options(config),
    ))
}
