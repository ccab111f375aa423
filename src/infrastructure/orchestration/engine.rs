//! Engine: the composition of repository, state machine, router and
//! scheduler, with an explicit start/shutdown lifecycle.
//!
//! ```text
//! discover ──► CategoryStateMachine::track ──► ScanScheduler::register_or_rebind
//!
//! ScanScheduler ──► ScanPipeline ──► TieredDataRouter ──► providers
//!                        │
//!                        └──► CategoryStateMachine::apply_valuation_update
//!                                     │ transition
//!                                     ▼
//!                             ScanScheduler rebinds the token
//! ```
//!
//! Callers outside the scan loop (`update_valuation`, `force_transition`)
//! get the transition back and the engine rebinds the scheduler for them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::lifecycle::{ArchivalConfig, ArchivalPolicy, CategoryStateMachine};
use crate::application::pipeline::{BudgetPolicy, ScanPipeline};
use crate::application::router::{RouterConfig, TieredDataRouter};
use crate::application::scheduler::{
    CadenceTable, DueOutcome, ScanScheduler, SchedulerConfig, SchedulerStats,
};
use crate::domain::{
    BandTable, Category, CategoryTransition, MarketSnapshot, Token, TokenAddress, TransitionReason,
};
use crate::error::{ConfigError, Result};
use crate::port::outbound::provider::MarketDataProvider;
use crate::port::outbound::repository::TokenRepository;

/// Runtime knobs that are not part of the band or cadence tables.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub scheduler: SchedulerConfig,
    pub router: RouterConfig,
    pub budget_policy: BudgetPolicy,
    pub archival: ArchivalConfig,
    /// Period of the stats log line; `None` disables it.
    pub stats_interval: Option<Duration>,
}

/// Category lifecycle engine.
pub struct Engine {
    repository: Arc<dyn TokenRepository>,
    machine: Arc<CategoryStateMachine>,
    router: Arc<TieredDataRouter>,
    scheduler: Arc<ScanScheduler>,
    archival: Option<(Arc<ArchivalPolicy>, Duration)>,
    stats_interval: Option<Duration>,
    started: AtomicBool,
    shutdown: watch::Sender<bool>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Wire every service. Nothing runs until [`start`](Self::start).
    pub fn new(
        repository: Arc<dyn TokenRepository>,
        bands: BandTable,
        cadences: CadenceTable,
        providers: Vec<Arc<dyn MarketDataProvider>>,
        options: EngineOptions,
    ) -> Self {
        let machine = Arc::new(CategoryStateMachine::new(
            Arc::clone(&repository),
            Arc::new(bands),
        ));
        let router = Arc::new(TieredDataRouter::new(
            providers,
            Arc::clone(&repository),
            &options.router,
        ));
        let scheduler = Arc::new(ScanScheduler::new(cadences, options.scheduler));
        let pipeline = Arc::new(ScanPipeline::new(
            Arc::clone(&router),
            Arc::clone(&machine),
            Arc::clone(&repository),
            options.budget_policy,
        ));
        scheduler.on_scan_due_all(pipeline);

        let archival = options.archival.enabled.then(|| {
            let policy = Arc::new(ArchivalPolicy::new(
                Arc::clone(&repository),
                Arc::clone(&machine),
                options.archival.idle_after,
            ));
            (policy, options.archival.check_interval)
        });

        let (shutdown, _) = watch::channel(false);
        Self {
            repository,
            machine,
            router,
            scheduler,
            archival,
            stats_interval: options.stats_interval,
            started: AtomicBool::new(false),
            shutdown,
            background: Mutex::new(Vec::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn TokenRepository> {
        &self.repository
    }

    pub fn machine(&self) -> &Arc<CategoryStateMachine> {
        &self.machine
    }

    pub fn router(&self) -> &Arc<TieredDataRouter> {
        &self.router
    }

    pub fn scheduler(&self) -> &Arc<ScanScheduler> {
        &self.scheduler
    }

    /// Check that every banded category can be scheduled.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingCadence`] or [`ConfigError::MissingHandler`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in self.machine.bands().categories() {
            if self.scheduler.cadence(category).is_none() {
                return Err(ConfigError::MissingCadence(category));
            }
        }
        self.scheduler.validate()
    }

    /// Validate, rebuild one scan task per live token and start background
    /// loops. Returns the number of tasks restored.
    ///
    /// # Errors
    ///
    /// Configuration errors, or a repository failure while listing tokens.
    pub async fn start(&self) -> Result<usize> {
        self.validate()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(self.scheduler.tasks().len());
        }

        let tokens = self.repository.list().await?;
        let mut restored = 0;
        for token in tokens.iter().filter(|t| !t.category.is_absorbing()) {
            self.scheduler.restore(&token.address, token.category)?;
            restored += 1;
        }
        info!(
            tokens = tokens.len(),
            restored,
            "Scan tasks restored"
        );

        let mut background = self.background.lock();
        if let Some((policy, every)) = &self.archival {
            background.push(self.spawn_archival(Arc::clone(policy), *every));
        }
        if let Some(every) = self.stats_interval {
            background.push(self.spawn_stats(every));
        }
        Ok(restored)
    }

    /// Track a newly discovered token and schedule its first scan.
    ///
    /// # Errors
    ///
    /// `TokenExists`, a valuation outside every band, or a storage failure.
    pub async fn discover(&self, address: TokenAddress, snapshot: &MarketSnapshot) -> Result<Token> {
        let token = self.machine.track(address, snapshot).await?;
        self.scheduler
            .register_or_rebind(&token.address, token.category)?;
        Ok(token)
    }

    /// Apply an externally observed valuation, re-cadencing on transition.
    ///
    /// # Errors
    ///
    /// See [`CategoryStateMachine::apply_valuation_update`].
    pub async fn update_valuation(
        &self,
        address: &TokenAddress,
        valuation: Decimal,
    ) -> Result<Option<CategoryTransition>> {
        let transition = self.machine.apply_valuation_update(address, valuation).await?;
        if let Some(t) = &transition {
            self.scheduler.handle_category_change(address, t.from, t.to)?;
        }
        Ok(transition)
    }

    /// Administrative override, re-cadencing or retiring the token.
    ///
    /// # Errors
    ///
    /// See [`CategoryStateMachine::force_transition`].
    pub async fn force_transition(
        &self,
        address: &TokenAddress,
        to: Category,
        reason: TransitionReason,
        note: Option<String>,
    ) -> Result<CategoryTransition> {
        let transition = self
            .machine
            .force_transition(address, to, reason, note)
            .await?;
        self.scheduler
            .handle_category_change(address, transition.from, transition.to)?;
        Ok(transition)
    }

    /// Run one scan for `address` now, outside its cadence.
    pub async fn scan_now(&self, address: &TokenAddress) -> DueOutcome {
        self.scheduler.on_due(address).await
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    #[must_use]
    pub fn daily_spend(&self) -> Decimal {
        self.router.daily_spend()
    }

    /// Stop background loops, then the scheduler within its grace period.
    pub async fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        let handles: Vec<_> = self.background.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Background task failed");
                }
            }
        }
        self.scheduler.stop().await;
        info!("Engine stopped");
    }

    fn spawn_archival(&self, policy: Arc<ArchivalPolicy>, every: Duration) -> JoinHandle<()> {
        let scheduler = Arc::clone(&self.scheduler);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }
                match policy.sweep(Utc::now()).await {
                    Ok(archived) => {
                        for transition in archived {
                            scheduler.retire(&transition.address);
                        }
                    }
                    Err(e) => warn!(error = %e, "Archival sweep failed"),
                }
            }
            debug!("Archival loop stopped");
        })
    }

    fn spawn_stats(&self, every: Duration) -> JoinHandle<()> {
        let scheduler = Arc::clone(&self.scheduler);
        let router = Arc::clone(&self.router);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }
                let stats = scheduler.stats();
                info!(
                    active = stats.active(),
                    in_flight = stats.in_flight,
                    completed = stats.completed(),
                    failed = stats.failed(),
                    failing = stats.failing.len(),
                    spend = %router.daily_spend(),
                    budget_exceeded = router.is_daily_budget_exceeded(),
                    "Scheduler stats"
                );
            }
            debug!("Stats loop stopped");
        })
    }
}

