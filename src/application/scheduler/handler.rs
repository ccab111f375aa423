//! Scan handler contract and the values passed across it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::domain::{AnalysisDepth, Category, CategoryTransition, TokenAddress};
use crate::error::Result;

/// Everything a handler needs to run one scan.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub address: TokenAddress,
    /// Category the task was registered under.
    pub category: Category,
    pub depth: AnalysisDepth,
    /// Runs completed by this registration before this one.
    pub run: u64,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ScanContext {
    /// Context for a scan outside the scheduler; it is never cancelled.
    #[must_use]
    pub fn new(address: TokenAddress, category: Category, depth: AnalysisDepth) -> Self {
        Self {
            address,
            category,
            depth,
            run: 0,
            shutdown: None,
        }
    }

    #[must_use]
    pub(crate) fn with_shutdown(mut self, run: u64, shutdown: watch::Receiver<bool>) -> Self {
        self.run = run;
        self.shutdown = Some(shutdown);
        self
    }

    /// Whether the scheduler has begun shutting down.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once shutdown begins. Pending forever for detached contexts.
    pub async fn cancelled(&self) {
        match &self.shutdown {
            Some(rx) => {
                let mut rx = rx.clone();
                // A dropped sender means the scheduler is gone; treat as shutdown.
                let _ = rx.wait_for(|stop| *stop).await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// What a completed scan reports back to the scheduler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Providers that contributed data.
    pub providers: usize,
    pub cost: Decimal,
    /// Category change caused by this scan; the scheduler rebinds on it.
    pub transition: Option<CategoryTransition>,
    /// Category the token was stored under when the scan finished, if read.
    /// A value other than the registered one rebinds the task as well.
    pub category: Option<Category>,
}

/// Work run when a token's scan comes due.
#[async_trait]
pub trait ScanHandler: Send + Sync {
    /// Run one scan.
    async fn scan(&self, ctx: ScanContext) -> Result<ScanReport>;

    /// Category to re-register a token under after its task expired.
    ///
    /// `None` leaves the token unscheduled. The default keeps the category
    /// the task was registered under.
    async fn on_expired(&self, ctx: ScanContext) -> Result<Option<Category>> {
        Ok(Some(ctx.category))
    }
}

/// Result of one due tick.
#[derive(Debug, Clone, PartialEq)]
pub enum DueOutcome {
    /// The handler succeeded.
    Completed {
        transition: Option<CategoryTransition>,
    },
    /// The handler returned an error.
    Failed,
    /// A previous run for the token was still in flight.
    Skipped,
    /// The registration outlived its category's max duration and was
    /// re-derived; `next` is the category it was re-registered under.
    Expired { next: Option<Category> },
    /// No task is registered for the token.
    NotRegistered,
    /// The scheduler shut down before the run started.
    Cancelled,
}

impl DueOutcome {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
