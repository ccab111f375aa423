//! Scan scheduler service.
//!
//! # Architecture
//!
//! ```text
//! register_or_rebind ──► TokenSlot ──► timer task (one per registration)
//!                            │               │ sleep_until(next_due)
//!                            │               ▼
//!                            │           fire() ── Semaphore permit ──► ScanHandler
//!                            │               │
//!                            └── in_flight ◄─┘ report.transition ──► rebind
//! ```
//!
//! A rebind replaces the registration under the slot lock and cancels the old
//! timer. A run already in flight finishes under its old identity; the new
//! registration's cadence applies from the next decision on.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tokio::sync::{watch, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::cadence::{Cadence, CadenceTable};
use super::handler::{DueOutcome, ScanContext, ScanHandler, ScanReport};
use super::stats::{SchedulerStats, StatsRegistry};
use super::task::{Registration, ScanTask, TokenSlot};
use crate::domain::{AnalysisDepth, Category, TokenAddress};
use crate::error::{ConfigError, Error, Result};

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on scans running at once.
    pub max_concurrent_scans: usize,
    /// Consecutive failures after which a token is flagged.
    pub failure_threshold: u32,
    /// How long `stop` waits for in-flight scans before aborting them.
    pub shutdown_grace: Duration,
    /// Spread first runs over one interval when restoring tasks at startup.
    pub restart_jitter: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: num_cpus::get().max(1) * 4,
            failure_threshold: 5,
            shutdown_grace: Duration::from_secs(10),
            restart_jitter: true,
        }
    }
}

/// What a due tick may do, decided under the slot lock.
enum Claim {
    Run {
        category: Category,
        depth: AnalysisDepth,
        run: u64,
    },
    Expired(ScanTask),
    Skipped(Category),
    Missing,
}

/// Owns one scan task per registered token and runs them on cadence.
pub struct ScanScheduler {
    cadences: CadenceTable,
    config: SchedulerConfig,
    handlers: RwLock<HashMap<Category, Arc<dyn ScanHandler>>>,
    slots: DashMap<TokenAddress, Arc<TokenSlot>>,
    permits: Arc<Semaphore>,
    stats: StatsRegistry,
    shutdown: watch::Sender<bool>,
    /// Timers of superseded registrations that may still be finishing a run.
    lingering: Mutex<Vec<JoinHandle<()>>>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
}

impl ScanScheduler {
    pub fn new(cadences: CadenceTable, config: SchedulerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        let permits = Arc::new(Semaphore::new(config.max_concurrent_scans.max(1)));
        Self {
            cadences,
            config,
            handlers: RwLock::new(HashMap::new()),
            slots: DashMap::new(),
            permits,
            stats: StatsRegistry::default(),
            shutdown,
            lingering: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Register the handler run for tokens in `category`.
    pub fn on_scan_due(&self, category: Category, handler: Arc<dyn ScanHandler>) {
        self.handlers.write().insert(category, handler);
    }

    /// Register one handler for every category with a cadence.
    pub fn on_scan_due_all(&self, handler: Arc<dyn ScanHandler>) {
        let mut handlers = self.handlers.write();
        for category in self.cadences.categories() {
            handlers.insert(category, Arc::clone(&handler));
        }
    }

    /// Check that every category with a cadence has a handler.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingHandler`] for the first category without one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let handlers = self.handlers.read();
        for category in self.cadences.categories() {
            if !handlers.contains_key(&category) {
                return Err(ConfigError::MissingHandler(category));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn cadence(&self, category: Category) -> Option<Cadence> {
        self.cadences.get(category).copied()
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Ensure exactly one task exists for `address`, with the cadence of
    /// `category`. The first run is one interval from now.
    ///
    /// Replaces any existing task. Absorbing categories retire the token
    /// instead.
    ///
    /// # Errors
    ///
    /// Missing cadence or handler for `category`, or [`Error::Cancelled`]
    /// once the scheduler is stopping.
    pub fn register_or_rebind(self: &Arc<Self>, address: &TokenAddress, category: Category) -> Result<()> {
        let Some(cadence) = self.cadence_for(address, category)? else {
            return Ok(());
        };
        self.bind(address, category, cadence, cadence.interval);
        Ok(())
    }

    /// Like [`register_or_rebind`](Self::register_or_rebind) but the first run
    /// is placed at a random offset within one interval when restart jitter
    /// is enabled. Used when rebuilding tasks at startup.
    ///
    /// # Errors
    ///
    /// See [`register_or_rebind`](Self::register_or_rebind).
    pub fn restore(self: &Arc<Self>, address: &TokenAddress, category: Category) -> Result<()> {
        let Some(cadence) = self.cadence_for(address, category)? else {
            return Ok(());
        };
        let first_delay = if self.config.restart_jitter {
            rand::thread_rng().gen_range(Duration::ZERO..cadence.interval)
        } else {
            cadence.interval
        };
        self.bind(address, category, cadence, first_delay);
        Ok(())
    }

    /// Rebind after a category change reported by the state machine.
    ///
    /// A no-op when the task is already registered under `to`.
    ///
    /// # Errors
    ///
    /// See [`register_or_rebind`](Self::register_or_rebind).
    pub fn handle_category_change(
        self: &Arc<Self>,
        address: &TokenAddress,
        from: Category,
        to: Category,
    ) -> Result<()> {
        let current = self.task(address).map(|t| t.category);
        if current == Some(to) {
            return Ok(());
        }
        if current.is_some_and(|c| c != from) {
            debug!(
                address = %address,
                registered = ?current,
                from = %from,
                to = %to,
                "Registered category differs from transition source"
            );
        }
        if to.is_absorbing() {
            self.retire(address);
            return Ok(());
        }
        self.register_or_rebind(address, to)
    }

    /// Drop the task for `address`. Returns false if none was registered.
    ///
    /// A run already in flight is allowed to finish.
    pub fn retire(&self, address: &TokenAddress) -> bool {
        let Some(slot) = self.slots.get(address).map(|s| Arc::clone(s.value())) else {
            return false;
        };
        let mut state = slot.state.lock();
        let removed = match state.registration.take() {
            Some(registration) => {
                debug!(address = %address, category = %registration.task.category, "Scan task retired");
                self.supersede(registration);
                true
            }
            None => false,
        };
        if !slot.is_in_flight() && !state.detached {
            state.detached = true;
            self.slots.remove_if(address, |_, s| Arc::ptr_eq(s, &slot));
        }
        removed
    }

    /// Run the due logic for `address` now.
    ///
    /// Timers call this on schedule; tests and operators may call it
    /// directly. Overlap protection and expiry apply either way.
    pub async fn on_due(self: &Arc<Self>, address: &TokenAddress) -> DueOutcome {
        let Some(slot) = self.slots.get(address).map(|s| Arc::clone(s.value())) else {
            return DueOutcome::NotRegistered;
        };
        let generation = {
            let state = slot.state.lock();
            match &state.registration {
                Some(registration) => registration.task.generation,
                None => return DueOutcome::NotRegistered,
            }
        };
        self.fire(&slot, generation).await
    }

    /// Snapshot of the task registered for `address`.
    #[must_use]
    pub fn task(&self, address: &TokenAddress) -> Option<ScanTask> {
        let slot = self.slots.get(address).map(|s| Arc::clone(s.value()))?;
        let state = slot.state.lock();
        state.registration.as_ref().map(|r| r.task.clone())
    }

    #[must_use]
    pub fn is_registered(&self, address: &TokenAddress) -> bool {
        self.task(address).is_some()
    }

    /// Snapshots of every registered task, ordered by address.
    #[must_use]
    pub fn tasks(&self) -> Vec<ScanTask> {
        let mut tasks: Vec<_> = self
            .all_slots()
            .iter()
            .filter_map(|slot| slot.state.lock().registration.as_ref().map(|r| r.task.clone()))
            .collect();
        tasks.sort_by(|a, b| a.address.cmp(&b.address));
        tasks
    }

    /// Per-category counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot(self.in_flight.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stop all timers and wait up to the grace period for in-flight scans.
    ///
    /// Handlers see cancellation through [`ScanContext::cancelled`]. Anything
    /// still running after the grace period is aborted.
    pub async fn stop(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        self.permits.close();

        let mut handles = Vec::new();
        for slot in self.all_slots() {
            let mut state = slot.state.lock();
            if let Some(registration) = state.registration.take() {
                self.stats.deactivated(registration.task.category);
                registration.cancel.notify_one();
                handles.extend(registration.handle);
            }
            state.detached = true;
        }
        handles.extend(self.lingering.lock().drain(..));
        self.slots.clear();

        let count = handles.len();
        let finished = tokio::time::timeout(self.config.shutdown_grace, join_all(handles.iter_mut()))
            .await
            .is_ok();
        if finished {
            info!(tasks = count, "Scheduler stopped");
        } else {
            for handle in &handles {
                handle.abort();
            }
            warn!(
                tasks = count,
                grace_secs = self.config.shutdown_grace.as_secs(),
                "Shutdown grace period elapsed, aborted in-flight scans"
            );
        }
    }

    /// Resolve the cadence for a registration, or `None` for absorbing
    /// categories (which retire the token).
    fn cadence_for(&self, address: &TokenAddress, category: Category) -> Result<Option<Cadence>> {
        if self.is_shutting_down() {
            return Err(Error::Cancelled);
        }
        if category.is_absorbing() {
            self.retire(address);
            return Ok(None);
        }
        let cadence = self
            .cadence(category)
            .ok_or(ConfigError::MissingCadence(category))?;
        if !self.handlers.read().contains_key(&category) {
            return Err(ConfigError::MissingHandler(category).into());
        }
        Ok(Some(cadence))
    }

    fn bind(self: &Arc<Self>, address: &TokenAddress, category: Category, cadence: Cadence, first_delay: Duration) {
        loop {
            let slot = Arc::clone(
                self.slots
                    .entry(address.clone())
                    .or_insert_with(|| Arc::new(TokenSlot::new(address.clone())))
                    .value(),
            );
            let mut state = slot.state.lock();
            if state.detached {
                // Lost a race with retire; the map now holds a fresh slot.
                continue;
            }

            let mut carried_failures = 0;
            if let Some(previous) = state.registration.take() {
                carried_failures = previous.task.consecutive_failures;
                self.supersede(previous);
            }

            let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
            let mut task = ScanTask::new(
                address.clone(),
                category,
                &cadence,
                Instant::now(),
                first_delay,
                generation,
            );
            task.consecutive_failures = carried_failures;
            let cancel = Arc::new(Notify::new());
            let handle = tokio::spawn(Arc::clone(self).run_timer(
                Arc::clone(&slot),
                generation,
                Arc::clone(&cancel),
            ));

            debug!(
                address = %address,
                category = %category,
                interval_secs = cadence.interval.as_secs(),
                first_delay_ms = first_delay.as_millis() as u64,
                "Scan task registered"
            );
            state.registration = Some(Registration {
                task,
                cancel,
                handle: Some(handle),
            });
            self.stats.registered(category);
            return;
        }
    }

    /// Cancel a replaced registration's timer without touching its run.
    fn supersede(&self, registration: Registration) {
        self.stats.deactivated(registration.task.category);
        registration.cancel.notify_one();
        if let Some(handle) = registration.handle {
            let mut lingering = self.lingering.lock();
            lingering.retain(|h| !h.is_finished());
            lingering.push(handle);
        }
    }

    async fn run_timer(self: Arc<Self>, slot: Arc<TokenSlot>, generation: u64, cancel: Arc<Notify>) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            if *shutdown.borrow() {
                break;
            }
            let Some(wake_at) = slot.wake_at(generation) else {
                break;
            };
            tokio::select! {
                () = cancel.notified() => break,
                _ = shutdown.changed() => break,
                () = tokio::time::sleep_until(wake_at) => {}
            }
            // A direct `on_due` may have pushed the next run back while we slept.
            match slot.wake_at(generation) {
                None => break,
                Some(at) if at > Instant::now() => continue,
                Some(_) => {}
            }
            match self.fire(&slot, generation).await {
                DueOutcome::Expired { .. } | DueOutcome::NotRegistered | DueOutcome::Cancelled => break,
                DueOutcome::Completed { .. } | DueOutcome::Failed | DueOutcome::Skipped => {}
            }
        }
    }

    fn claim(&self, slot: &TokenSlot, generation: u64) -> Claim {
        let now = Instant::now();
        let mut state = slot.state.lock();
        let Some(registration) = state
            .registration
            .as_mut()
            .filter(|r| r.task.generation == generation)
        else {
            return Claim::Missing;
        };

        if registration.task.is_expired(now) {
            let category = registration.task.category;
            if let Some(expired) = state.registration.take() {
                expired.cancel.notify_one();
                self.stats.deactivated(category);
                self.stats.expired(category);
                return Claim::Expired(expired.task);
            }
            return Claim::Missing;
        }

        if !slot.try_begin() {
            registration.task.skipped += 1;
            registration.task.next_due = now + registration.task.interval;
            self.stats.skipped(registration.task.category);
            return Claim::Skipped(registration.task.category);
        }

        Claim::Run {
            category: registration.task.category,
            depth: registration.task.depth,
            run: registration.task.completed,
        }
    }

    async fn fire(self: &Arc<Self>, slot: &Arc<TokenSlot>, generation: u64) -> DueOutcome {
        let address = slot.address.clone();
        let (category, depth, run) = match self.claim(slot, generation) {
            Claim::Run {
                category,
                depth,
                run,
            } => (category, depth, run),
            Claim::Expired(task) => return self.expire(task).await,
            Claim::Skipped(category) => {
                debug!(address = %address, category = %category, "Scan still in flight, skipping tick");
                return DueOutcome::Skipped;
            }
            Claim::Missing => return DueOutcome::NotRegistered,
        };

        let mut shutdown = self.shutdown.subscribe();
        let permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
            _ = shutdown.changed() => None,
        };
        let Some(permit) = permit else {
            slot.finish();
            self.release_if_idle(slot);
            return DueOutcome::Cancelled;
        };

        let handler = self.handlers.read().get(&category).cloned();
        let ctx = ScanContext::new(address.clone(), category, depth)
            .with_shutdown(run, self.shutdown.subscribe());

        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let result = match handler {
            Some(handler) => match AssertUnwindSafe(handler.scan(ctx)).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(Error::Scan(format!("handler for {category} panicked"))),
            },
            None => Err(ConfigError::MissingHandler(category).into()),
        };
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        drop(permit);
        slot.finish();

        let outcome = self.record(slot, generation, category, result);
        self.release_if_idle(slot);
        outcome
    }

    fn record(
        self: &Arc<Self>,
        slot: &TokenSlot,
        generation: u64,
        category: Category,
        result: Result<ScanReport>,
    ) -> DueOutcome {
        let address = &slot.address;
        let completed_at = Instant::now();

        if matches!(result, Err(Error::Cancelled)) {
            debug!(address = %address, category = %category, "Scan cancelled");
            return DueOutcome::Cancelled;
        }

        // Task counters belong to the registration that started the run. A
        // run that outlived a rebind only shows up in the category stats.
        let consecutive = {
            let mut state = slot.state.lock();
            state
                .registration
                .as_mut()
                .filter(|registration| registration.task.generation == generation)
                .map(|registration| {
                    let task = &mut registration.task;
                    if result.is_ok() {
                        task.completed += 1;
                        task.consecutive_failures = 0;
                    } else {
                        task.failed += 1;
                        task.consecutive_failures = task.consecutive_failures.saturating_add(1);
                    }
                    task.next_due = completed_at + task.interval;
                    task.consecutive_failures
                })
        };

        match result {
            Ok(report) => {
                self.stats.completed(category);
                if self.stats.clear_failing(address) {
                    info!(address = %address, category = %category, "Token scans recovered");
                }
                let moved = match (&report.transition, report.category) {
                    (Some(transition), _) => Some((transition.from, transition.to)),
                    (None, Some(current)) if current != category => {
                        debug!(
                            address = %address,
                            registered = %category,
                            current = %current,
                            "Category changed outside the scan"
                        );
                        Some((category, current))
                    }
                    _ => None,
                };
                if let Some((from, to)) = moved {
                    if let Err(e) = self.handle_category_change(address, from, to) {
                        warn!(address = %address, error = %e, "Failed to rebind after transition");
                    }
                }
                DueOutcome::Completed {
                    transition: report.transition,
                }
            }
            Err(e) => {
                self.stats.failed(category);
                warn!(
                    address = %address,
                    category = %category,
                    consecutive_failures = ?consecutive,
                    error = %e,
                    "Scan failed"
                );
                let Some(consecutive) = consecutive else {
                    return DueOutcome::Failed;
                };
                if consecutive > self.config.failure_threshold {
                    if consecutive == self.config.failure_threshold + 1 {
                        warn!(
                            address = %address,
                            category = %category,
                            consecutive_failures = consecutive,
                            threshold = self.config.failure_threshold,
                            "Token exceeded failure threshold"
                        );
                    }
                    self.stats.mark_failing(address, consecutive);
                }
                DueOutcome::Failed
            }
        }
    }

    async fn expire(self: &Arc<Self>, task: ScanTask) -> DueOutcome {
        let address = task.address.clone();
        info!(
            address = %address,
            category = %task.category,
            completed = task.completed,
            "Scan task expired"
        );

        let handler = self.handlers.read().get(&task.category).cloned();
        let ctx = ScanContext::new(address.clone(), task.category, task.depth)
            .with_shutdown(task.completed, self.shutdown.subscribe());
        let next = match handler {
            Some(handler) => match handler.on_expired(ctx).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(address = %address, error = %e, "Failed to re-derive category, keeping previous");
                    Some(task.category)
                }
            },
            None => Some(task.category),
        };

        if let Some(category) = next {
            if !self.is_registered(&address) {
                if let Err(e) = self.register_or_rebind(&address, category) {
                    warn!(address = %address, category = %category, error = %e, "Failed to re-register expired task");
                }
            }
        } else if let Some(slot) = self.slots.get(&address).map(|s| Arc::clone(s.value())) {
            self.release_if_idle(&slot);
        }
        DueOutcome::Expired { next }
    }

    /// Remove a slot that has neither a registration nor a run in flight.
    fn release_if_idle(&self, slot: &Arc<TokenSlot>) {
        let mut state = slot.state.lock();
        if state.registration.is_none() && !state.detached && !slot.is_in_flight() {
            state.detached = true;
            self.slots.remove_if(&slot.address, |_, s| Arc::ptr_eq(s, slot));
        }
    }

    fn all_slots(&self) -> Vec<Arc<TokenSlot>> {
        self.slots.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}
