//! Scan pipeline: the scan handler the engine registers for every category.
//!
//! One scan is collect, persist, then reconcile the category:
//!
//! ```text
//! ScanScheduler ──► ScanPipeline::scan
//!                       │ TieredDataRouter::collect   (providers, budget)
//!                       │ TieredDataRouter::persist   (fields present only)
//!                       ▼
//!                   CategoryStateMachine::apply_valuation_update
//!                       │
//!                       └──► ScanReport { transition } ──► scheduler rebind
//! ```

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::lifecycle::CategoryStateMachine;
use super::router::TieredDataRouter;
use super::scheduler::{ScanContext, ScanHandler, ScanReport};
use crate::domain::{AnalysisDepth, Category, TokenAddress, TokenPatch};
use crate::error::{Error, LifecycleError, Result};
use crate::port::outbound::repository::TokenRepository;

/// What to do with deep scans once the daily budget is spent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPolicy {
    /// Run deep scans as shallow until the budget resets.
    #[default]
    Downgrade,
    /// Keep calling paid providers; the ceiling is only reported.
    Continue,
}

impl FromStr for BudgetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "downgrade" => Ok(Self::Downgrade),
            "continue" => Ok(Self::Continue),
            other => Err(format!("unknown budget policy: {other}")),
        }
    }
}

/// Default [`ScanHandler`]: router analysis followed by category
/// reconciliation.
pub struct ScanPipeline {
    router: Arc<TieredDataRouter>,
    machine: Arc<CategoryStateMachine>,
    repository: Arc<dyn TokenRepository>,
    budget_policy: BudgetPolicy,
}

impl ScanPipeline {
    pub fn new(
        router: Arc<TieredDataRouter>,
        machine: Arc<CategoryStateMachine>,
        repository: Arc<dyn TokenRepository>,
        budget_policy: BudgetPolicy,
    ) -> Self {
        Self {
            router,
            machine,
            repository,
            budget_policy,
        }
    }

    /// Depth actually used for a scan requested at `requested`.
    #[must_use]
    pub fn effective_depth(&self, requested: AnalysisDepth) -> AnalysisDepth {
        match (requested, self.budget_policy) {
            (AnalysisDepth::Deep, BudgetPolicy::Downgrade) if self.router.is_daily_budget_exceeded() => {
                AnalysisDepth::Shallow
            }
            _ => requested,
        }
    }

    /// Bump the stored failure counter. Best effort: the scan already failed.
    async fn record_failure(&self, address: &TokenAddress) {
        if let Err(e) = self
            .repository
            .update(address, &TokenPatch::new().scan_failed())
            .await
        {
            debug!(address = %address, error = %e, "Failed to record scan failure");
        }
    }

    async fn run(&self, ctx: &ScanContext) -> Result<ScanReport> {
        let depth = self.effective_depth(ctx.depth);
        if depth != ctx.depth {
            debug!(address = %ctx.address, "Daily budget spent, downgrading to shallow scan");
        }

        let result = tokio::select! {
            biased;
            () = ctx.cancelled() => return Err(Error::Cancelled),
            result = self.router.collect(&ctx.address, depth) => result,
        };
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let persisted = self.router.persist(&result).await?;

        let transition = match result.snapshot.valuation {
            Some(valuation) => {
                self.machine
                    .apply_valuation_update(&ctx.address, valuation)
                    .await?
            }
            None => None,
        };

        debug!(
            address = %ctx.address,
            category = %ctx.category,
            depth = %depth,
            providers = result.providers.len(),
            failed = result.failed.len(),
            cost = %result.cost,
            duration_ms = result.duration.as_millis() as u64,
            "Scan complete"
        );

        let category = match &transition {
            Some(t) => Some(t.to),
            None => persisted.map(|token| token.category),
        };
        Ok(ScanReport {
            providers: result.providers.len(),
            cost: result.cost,
            transition,
            category,
        })
    }
}

#[async_trait]
impl ScanHandler for ScanPipeline {
    async fn scan(&self, ctx: ScanContext) -> Result<ScanReport> {
        match self.run(&ctx).await {
            Ok(report) => Ok(report),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                self.record_failure(&ctx.address).await;
                Err(e)
            }
        }
    }

    async fn on_expired(&self, ctx: ScanContext) -> Result<Option<Category>> {
        match self.machine.reconcile(&ctx.address).await {
            Ok(Some(transition)) => {
                info!(
                    address = %ctx.address,
                    from = %transition.from,
                    to = %transition.to,
                    "Category re-derived after expiry"
                );
                Ok(Some(transition.to))
            }
            Ok(None) => Ok(self.repository.get(&ctx.address).await?.map(|t| t.category)),
            Err(Error::Lifecycle(LifecycleError::TokenNotFound(_))) => {
                warn!(address = %ctx.address, "Expired task for unknown token, dropping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
