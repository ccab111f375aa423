use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tierwatch::adapter::inbound::cli::{self, command::Cli, output};

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.name();
    cli::execute(cli)
        .await
        .with_context(|| format!("{command} failed"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
