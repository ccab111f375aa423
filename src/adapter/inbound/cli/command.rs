//! Command-line interface definitions.
//!
//! `tierwatch run` drives the engine; `config` and `token` are thin
//! administrative commands over the same repository and state machine.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Category lifecycle engine for valuation-banded token tracking
#[derive(Parser, Debug)]
#[command(name = "tierwatch")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine until Ctrl-C
    Run(RunArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Inspect and administer tracked tokens
    #[command(subcommand)]
    Token(TokenCommand),
}

impl Commands {
    /// Subcommand name for error context.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Config(_) => "config",
            Self::Token(_) => "token",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigArgs),
    /// Display the effective configuration with defaults applied.
    Show(ConfigArgs),
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Start tracking a token at a known valuation.
    Add(TokenAddArgs),
    /// Show one token.
    Show(TokenArgs),
    /// Show a token's category transitions, oldest first.
    History(TokenArgs),
    /// Move a token to a category regardless of its valuation.
    Force(TokenForceArgs),
    /// List tracked tokens.
    List(TokenListArgs),
}

/// Configuration source shared by every command.
#[derive(Parser, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the configuration file. Built-in defaults when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the SQLite database path.
    #[arg(long)]
    pub database: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Keep tokens in memory instead of SQLite.
    #[arg(long)]
    pub memory: bool,
}

#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// Token address.
    pub address: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Parser, Debug)]
pub struct TokenAddArgs {
    /// Token address.
    pub address: String,

    /// Current valuation in USD.
    #[arg(long)]
    pub valuation: Decimal,

    /// Current liquidity in USD.
    #[arg(long)]
    pub liquidity: Option<Decimal>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Parser, Debug)]
pub struct TokenForceArgs {
    /// Token address.
    pub address: String,

    /// Target category (e.g. "high", "archived").
    pub category: String,

    /// Reason code recorded with the transition.
    #[arg(long, default_value = "manual")]
    pub reason: String,

    /// Free-text note recorded with the transition.
    #[arg(long)]
    pub note: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Parser, Debug)]
pub struct TokenListArgs {
    /// Only tokens in this category.
    #[arg(long)]
    pub category: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_force_with_reason() {
        let cli = Cli::try_parse_from([
            "tierwatch", "token", "force", "mint1", "archived", "--reason", "rejected",
        ])
        .unwrap();
        match cli.command {
            Commands::Token(TokenCommand::Force(args)) => {
                assert_eq!(args.address, "mint1");
                assert_eq!(args.category, "archived");
                assert_eq!(args.reason, "rejected");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn repeated_verbose_flag_counts() {
        let cli = Cli::try_parse_from(["tierwatch", "-vv", "config", "show"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
