//! Handler for the `run` command.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::warn;

use super::command::RunArgs;
use super::{load_config, output};
use crate::error::Result;
use crate::infrastructure::bootstrap::build_engine;
use crate::infrastructure::orchestration::run_with_shutdown;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if output::is_json() {
        config.logging.format = "json".into();
    }
    config.logging.apply_verbosity(output::verbosity());
    config.init_logging();

    let engine = Arc::new(build_engine(&config, args.memory)?);

    if !output::is_quiet() {
        output::header(env!("CARGO_PKG_VERSION"));
        output::field(
            "Storage",
            if args.memory { "memory" } else { config.database.as_str() },
        );
        output::field("Providers", engine.router().providers().count());
        output::field("Budget", format!("${}/day", config.router.daily_budget));
    }

    let mut transitions = engine.machine().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(t) => output::info(
                    &t.at.format("%H:%M:%S").to_string(),
                    t.reason.as_str(),
                    &format!("{} {} -> {} at {}", t.address, t.from, t.to, t.valuation),
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Transition feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let result = run_with_shutdown(Arc::clone(&engine), shutdown_rx).await;
    printer.abort();
    result
}
