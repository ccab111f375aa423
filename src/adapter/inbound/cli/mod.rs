//! Administrative CLI.

pub mod command;
pub mod config;
pub mod output;
pub mod run;
pub mod token;

use command::{Cli, ColorChoice, Commands, ConfigArgs, ConfigCommand, TokenCommand};

use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Apply global flags and dispatch to the subcommand handler.
pub async fn execute(cli: Cli) -> Result<()> {
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.verbose));
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }

    match cli.command {
        Commands::Run(args) => run::execute(&args).await,
        Commands::Config(ConfigCommand::Validate(args)) => config::execute_validate(&args),
        Commands::Config(ConfigCommand::Show(args)) => config::execute_show(&args),
        Commands::Token(TokenCommand::Add(args)) => token::execute_add(&args).await,
        Commands::Token(TokenCommand::Show(args)) => token::execute_show(&args).await,
        Commands::Token(TokenCommand::History(args)) => token::execute_history(&args).await,
        Commands::Token(TokenCommand::Force(args)) => token::execute_force(&args).await,
        Commands::Token(TokenCommand::List(args)) => token::execute_list(&args).await,
    }
}

/// Load the configuration named by `args`, or the built-in defaults.
pub(crate) fn load_config(args: &ConfigArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::parse_toml("")?,
    };
    if let Some(database) = &args.database {
        config.database = database.to_string_lossy().into_owned();
    }
    Ok(config)
}
