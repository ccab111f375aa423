//! Handlers for the `token` command group.
//!
//! These go through the repository and state machine; they never touch
//! storage directly and never start the scheduler.

use std::str::FromStr;

use serde_json::json;
use tabled::{Table, Tabled};

use super::command::{TokenAddArgs, TokenArgs, TokenForceArgs, TokenListArgs};
use super::{load_config, output};
use crate::domain::{Category, CategoryTransition, MarketSnapshot, Token, TokenAddress, TransitionReason};
use crate::error::{ConfigError, LifecycleError, Result};
use crate::infrastructure::bootstrap::build_engine;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::orchestration::Engine;

#[derive(Tabled)]
struct TokenRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Valuation")]
    valuation: String,
    #[tabled(rename = "Liquidity")]
    liquidity: String,
    #[tabled(rename = "Scans")]
    scans: u64,
    #[tabled(rename = "Last scan")]
    last_scan: String,
}

impl From<&Token> for TokenRow {
    fn from(token: &Token) -> Self {
        Self {
            address: token.address.to_string(),
            category: token.category.to_string(),
            valuation: token.valuation.to_string(),
            liquidity: token.liquidity.to_string(),
            scans: token.scan_count,
            last_scan: token
                .last_scanned_at
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
        }
    }
}

#[derive(Tabled)]
struct TransitionRow {
    #[tabled(rename = "At")]
    at: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Valuation")]
    valuation: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Note")]
    note: String,
}

impl From<&CategoryTransition> for TransitionRow {
    fn from(t: &CategoryTransition) -> Self {
        Self {
            at: t.at.format("%Y-%m-%d %H:%M:%S").to_string(),
            from: t.from.to_string(),
            to: t.to.to_string(),
            valuation: t.valuation.to_string(),
            reason: t.reason.to_string(),
            note: t.note.clone().unwrap_or_default(),
        }
    }
}

fn engine(config: &Config) -> Result<Engine> {
    build_engine(config, false)
}

async fn fetch(engine: &Engine, address: &TokenAddress) -> Result<Token> {
    engine
        .repository()
        .get(address)
        .await?
        .ok_or_else(|| LifecycleError::TokenNotFound(address.clone()).into())
}

fn print_token(token: &Token) {
    output::field("Address", &token.address);
    output::field("Category", token.category);
    output::field("Valuation", format!("${}", token.valuation));
    output::field("Liquidity", format!("${}", token.liquidity));
    output::field("Volume 24h", format!("${}", token.volume_24h));
    output::field("Holders", token.holder_count);
    if let Some(score) = token.security_score {
        output::field("Security", score);
    }
    if let Some(concentration) = token.concentration {
        output::field("Top-10 share", format!("{concentration}%"));
    }
    output::field("Scans", token.scan_count);
    if token.consecutive_failures > 0 {
        output::warning(&format!(
            "{} consecutive scan failures",
            token.consecutive_failures
        ));
    }
}

/// Execute `token add`.
pub async fn execute_add(args: &TokenAddArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let engine = engine(&config)?;
    let snapshot = MarketSnapshot {
        valuation: Some(args.valuation),
        liquidity: args.liquidity,
        ..MarketSnapshot::default()
    };
    let token = engine
        .machine()
        .track(TokenAddress::new(args.address.trim()), &snapshot)
        .await?;

    if output::is_json() {
        output::json_output(json!({ "command": "token.add", "token": token }));
        return Ok(());
    }
    output::success(&format!("Tracking {} as {}", token.address, token.category));
    Ok(())
}

/// Execute `token show`.
pub async fn execute_show(args: &TokenArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let engine = engine(&config)?;
    let token = fetch(&engine, &TokenAddress::new(args.address.trim())).await?;

    if output::is_json() {
        output::json_output(json!({ "command": "token.show", "token": token }));
        return Ok(());
    }
    print_token(&token);
    Ok(())
}

/// Execute `token history`.
pub async fn execute_history(args: &TokenArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let engine = engine(&config)?;
    let address = TokenAddress::new(args.address.trim());
    fetch(&engine, &address).await?;
    let transitions = engine.repository().transitions(&address).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "token.history",
            "address": address,
            "transitions": transitions,
        }));
        return Ok(());
    }

    output::section(&format!("Transitions for {address}"));
    if transitions.is_empty() {
        output::note("(none)");
        return Ok(());
    }
    let rows: Vec<TransitionRow> = transitions.iter().map(TransitionRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}

/// Execute `token force`.
pub async fn execute_force(args: &TokenForceArgs) -> Result<()> {
    let reason = TransitionReason::from_str(args.reason.trim()).map_err(|reason| {
        ConfigError::InvalidValue {
            field: "reason",
            reason,
        }
    })?;
    let config = load_config(&args.config)?;
    let engine = engine(&config)?;
    let transition = engine
        .machine()
        .force_transition_named(
            &TokenAddress::new(args.address.trim()),
            &args.category,
            reason,
            args.note.clone(),
        )
        .await?;

    if output::is_json() {
        output::json_output(json!({ "command": "token.force", "transition": transition }));
        return Ok(());
    }
    output::success(&format!(
        "{} moved {} -> {}",
        transition.address, transition.from, transition.to
    ));
    output::note("A running engine picks up the new cadence on its next scan of this token");
    Ok(())
}

/// Execute `token list`.
pub async fn execute_list(args: &TokenListArgs) -> Result<()> {
    let category = args
        .category
        .as_deref()
        .map(Category::from_str)
        .transpose()?;
    let config = load_config(&args.config)?;
    let engine = engine(&config)?;
    let tokens: Vec<Token> = engine
        .repository()
        .list()
        .await?
        .into_iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .collect();

    if output::is_json() {
        output::json_output(json!({ "command": "token.list", "tokens": tokens }));
        return Ok(());
    }
    if tokens.is_empty() {
        output::note("No tokens tracked");
        return Ok(());
    }
    let rows: Vec<TokenRow> = tokens.iter().map(TokenRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}
