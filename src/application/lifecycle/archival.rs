//! Idle-token archival.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::machine::CategoryStateMachine;
use crate::domain::{Category, CategoryTransition, Token, TransitionReason};
use crate::error::{Error, Result};
use crate::port::outbound::repository::TokenRepository;

/// Archival settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivalConfig {
    pub enabled: bool,
    /// A token with no successful scan for this long is archived.
    pub idle_after: Duration,
    /// How often the engine sweeps.
    pub check_interval: Duration,
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_after: Duration::from_secs(86_400),
            check_interval: Duration::from_secs(600),
        }
    }
}

/// Moves idle tokens to [`Category::Archived`].
pub struct ArchivalPolicy {
    repository: Arc<dyn TokenRepository>,
    machine: Arc<CategoryStateMachine>,
    idle_after: chrono::Duration,
}

impl ArchivalPolicy {
    pub fn new(
        repository: Arc<dyn TokenRepository>,
        machine: Arc<CategoryStateMachine>,
        idle_after: Duration,
    ) -> Self {
        let idle_after = chrono::Duration::from_std(idle_after)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        Self {
            repository,
            machine,
            idle_after,
        }
    }

    /// Whether `token` has been idle past the threshold at `now`.
    #[must_use]
    pub fn is_idle(&self, token: &Token, now: DateTime<Utc>) -> bool {
        !token.category.is_absorbing() && now - token.last_activity() >= self.idle_after
    }

    /// Archive every idle token and return the transitions made.
    ///
    /// Idleness is checked again against the stored token before archiving,
    /// so a token scanned after the listing is kept. A token that changes
    /// underneath the sweep is looked at again on the next sweep.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<CategoryTransition>> {
        let tokens = self.repository.list().await?;
        let mut archived = Vec::new();

        for token in tokens.iter().filter(|t| self.is_idle(t, now)) {
            let idle_secs = (now - token.last_activity()).num_seconds();
            match self
                .machine
                .force_transition_if(
                    &token.address,
                    Category::Archived,
                    TransitionReason::IdleTimeout,
                    Some(format!("idle for {idle_secs}s")),
                    |current| self.is_idle(current, now),
                )
                .await
            {
                Ok(Some(record)) => archived.push(record),
                Ok(None) => {
                    debug!(address = %token.address, "Token active since listing, keeping");
                }
                Err(Error::Lifecycle(e)) if e.is_invalid_transition() => {
                    debug!(address = %token.address, error = %e, "Skipping archival");
                }
                Err(e) if e.is_persistence() => return Err(e),
                Err(e) => {
                    warn!(address = %token.address, error = %e, "Archival failed");
                }
            }
        }

        if !archived.is_empty() {
            info!(count = archived.len(), "Archived idle tokens");
        }
        Ok(archived)
    }
}
