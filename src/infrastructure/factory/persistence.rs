//! Persistence factory.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::memory::MemoryTokenRepository;
use crate::adapter::outbound::sqlite::database::connection::open;
use crate::adapter::outbound::sqlite::SqliteTokenRepository;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::repository::TokenRepository;

/// Open the configured SQLite database, or an in-memory store when
/// `in_memory` is set.
pub fn build_repository(config: &Config, in_memory: bool) -> Result<Arc<dyn TokenRepository>> {
    if in_memory {
        info!("Using in-memory token repository");
        return Ok(Arc::new(MemoryTokenRepository::new()));
    }
    let pool = open(&config.database)?;
    info!(database = %config.database, "Database initialized");
    Ok(Arc::new(SqliteTokenRepository::new(pool)))
}
