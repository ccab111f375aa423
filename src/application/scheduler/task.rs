//! Per-token scan task state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::cadence::Cadence;
use crate::domain::{AnalysisDepth, Category, TokenAddress};

/// Snapshot of a registered scan task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTask {
    pub address: TokenAddress,
    pub category: Category,
    pub depth: AnalysisDepth,
    pub interval: Duration,
    pub max_duration: Option<Duration>,
    pub registered_at: Instant,
    pub next_due: Instant,
    pub expires_at: Option<Instant>,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub consecutive_failures: u32,
    /// Bumped on every registration; a stale timer never acts on a newer
    /// task.
    pub generation: u64,
}

impl ScanTask {
    pub(crate) fn new(
        address: TokenAddress,
        category: Category,
        cadence: &Cadence,
        now: Instant,
        first_delay: Duration,
        generation: u64,
    ) -> Self {
        Self {
            address,
            category,
            depth: cadence.depth,
            interval: cadence.interval,
            max_duration: cadence.max_duration,
            registered_at: now,
            next_due: now + first_delay,
            expires_at: cadence.max_duration.map(|d| now + d),
            completed: 0,
            failed: 0,
            skipped: 0,
            consecutive_failures: 0,
            generation,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Earliest of the next due time and the expiry time.
    #[must_use]
    pub fn wake_at(&self) -> Instant {
        match self.expires_at {
            Some(at) if at < self.next_due => at,
            _ => self.next_due,
        }
    }
}

/// A live registration: the task plus the timer driving it.
pub(crate) struct Registration {
    pub(crate) task: ScanTask,
    pub(crate) cancel: Arc<Notify>,
    pub(crate) handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub(crate) struct SlotState {
    pub(crate) registration: Option<Registration>,
    /// Set once the slot is removed from the scheduler map; a detached slot
    /// never takes a new registration.
    pub(crate) detached: bool,
}

/// Scheduler bookkeeping for one token.
///
/// The in-flight flag lives here rather than on the registration so that it
/// survives rebinds: a run started under an old category still blocks a run
/// under the new one.
pub(crate) struct TokenSlot {
    pub(crate) address: TokenAddress,
    in_flight: AtomicBool,
    pub(crate) state: Mutex<SlotState>,
}

impl TokenSlot {
    pub(crate) fn new(address: TokenAddress) -> Self {
        Self {
            address,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(SlotState::default()),
        }
    }

    /// Claim the right to run. False if a run is already in flight.
    pub(crate) fn try_begin(&self) -> bool {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn finish(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wake time of the registration with `generation`, if still current.
    pub(crate) fn wake_at(&self, generation: u64) -> Option<Instant> {
        let state = self.state.lock();
        state
            .registration
            .as_ref()
            .filter(|r| r.task.generation == generation)
            .map(|r| r.task.wake_at())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn wake_at_prefers_earlier_expiry() {
        let now = Instant::now();
        let cadence = Cadence::new(Duration::from_secs(60), AnalysisDepth::Deep)
            .with_max_duration(Duration::from_secs(30));
        let task = ScanTask::new(TokenAddress::new("tok"), Category::Peak, &cadence, now, cadence.interval, 1);
        assert_eq!(task.wake_at(), now + Duration::from_secs(30));
        assert!(!task.is_expired(now));
        assert!(task.is_expired(now + Duration::from_secs(30)));
    }

    #[test]
    fn only_one_run_may_begin() {
        let slot = TokenSlot::new(TokenAddress::new("tok"));
        assert!(slot.try_begin());
        assert!(!slot.try_begin());
        slot.finish();
        assert!(slot.try_begin());
    }
}
