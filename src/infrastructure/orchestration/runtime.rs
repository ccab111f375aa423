//! Engine runtime lifecycle.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::engine::Engine;
use crate::error::Result;

/// Start `engine` and keep it running until `shutdown` flips to true or its
/// sender is dropped.
pub async fn run_with_shutdown(engine: Arc<Engine>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let restored = engine.start().await?;
    info!(restored, "Engine running");

    loop {
        match shutdown.changed().await {
            Ok(()) => {
                if *shutdown.borrow() {
                    info!("Shutdown signal received");
                    break;
                }
            }
            Err(_) => {
                info!("Shutdown channel closed");
                break;
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
