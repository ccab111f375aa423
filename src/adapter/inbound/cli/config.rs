//! Handlers for the `config` command group.

use serde_json::json;

use super::command::ConfigArgs;
use super::{load_config, output};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

fn source(args: &ConfigArgs) -> String {
    args.config
        .as_ref()
        .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string())
}

/// Execute `config validate`.
pub fn execute_validate(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.validate",
            "valid": true,
            "source": source(args),
            "categories": config.categories.len(),
        }));
        return Ok(());
    }

    output::success("Configuration is valid");
    output::field("Source", source(args));
    output::field("Categories", config.categories.len());
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.show",
            "config": serde_json::to_value(&config)?,
        }));
        return Ok(());
    }

    print_summary(&config);
    output::section("Effective TOML");
    output::lines(&config.to_toml()?);
    Ok(())
}

fn print_summary(config: &Config) {
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Database", &config.database);

    output::section("Categories");
    for category in &config.categories {
        let range = match category.max {
            Some(max) => format!("[{}, {})", category.min, max),
            None => format!("[{}, ∞)", category.min),
        };
        let lifetime = category
            .max_duration_secs
            .map(|secs| format!(", expires after {secs}s"))
            .unwrap_or_default();
        output::field(
            category.name.as_str(),
            format!(
                "{range} every {}s, {}{lifetime}",
                category.interval_secs, category.depth
            ),
        );
    }

    output::section("Router");
    output::field("Daily budget", format!("${}", config.router.daily_budget));
    output::field("Priority", config.router.provider_priority.join(", "));
    output::field("Timeout", format!("{}ms", config.router.provider_timeout_ms));

    output::section("Providers");
    for (name, settings) in config.providers.entries() {
        output::field(name, if settings.enabled { "enabled" } else { "disabled" });
    }
    if config.providers.holders.enabled && config.providers.holders.api_key.is_none() {
        output::warning("holders is enabled but TIERWATCH_HOLDERS_API_KEY is not set");
    }

    output::section("Archival");
    if config.archival.enabled {
        output::field("Idle after", format!("{}s", config.archival.idle_after_secs));
    } else {
        output::field("Status", "disabled");
    }
}
