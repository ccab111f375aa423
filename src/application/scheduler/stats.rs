//! Scheduler counters.
//!
//! Counters are plain atomics so reading stats never blocks a scan.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::domain::{Category, TokenAddress};

#[derive(Debug, Default)]
struct CategoryCounters {
    active: AtomicU64,
    registered: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    expired: AtomicU64,
}

/// Live counters shared by the scheduler and its tasks.
#[derive(Debug, Default)]
pub(crate) struct StatsRegistry {
    categories: [CategoryCounters; Category::ALL.len()],
    failing: DashMap<TokenAddress, u32>,
}

impl StatsRegistry {
    fn counters(&self, category: Category) -> &CategoryCounters {
        &self.categories[category.index()]
    }

    pub(crate) fn registered(&self, category: Category) {
        let c = self.counters(category);
        c.active.fetch_add(1, Ordering::Relaxed);
        c.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn deactivated(&self, category: Category) {
        let _ = self.counters(category).active.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |n| Some(n.saturating_sub(1)),
        );
    }

    pub(crate) fn completed(&self, category: Category) {
        self.counters(category).completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self, category: Category) {
        self.counters(category).failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn skipped(&self, category: Category) {
        self.counters(category).skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn expired(&self, category: Category) {
        self.counters(category).expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_failing(&self, address: &TokenAddress, consecutive: u32) {
        self.failing.insert(address.clone(), consecutive);
    }

    /// Returns true if the token was flagged before.
    pub(crate) fn clear_failing(&self, address: &TokenAddress) -> bool {
        self.failing.remove(address).is_some()
    }

    pub(crate) fn snapshot(&self, in_flight: usize) -> SchedulerStats {
        let categories = Category::ALL
            .into_iter()
            .map(|category| {
                let c = self.counters(category);
                CategoryStats {
                    category,
                    active: c.active.load(Ordering::Relaxed),
                    registered: c.registered.load(Ordering::Relaxed),
                    completed: c.completed.load(Ordering::Relaxed),
                    failed: c.failed.load(Ordering::Relaxed),
                    skipped: c.skipped.load(Ordering::Relaxed),
                    expired: c.expired.load(Ordering::Relaxed),
                }
            })
            .collect();

        let mut failing: Vec<_> = self
            .failing
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        failing.sort();

        SchedulerStats {
            categories,
            in_flight,
            failing,
        }
    }
}

/// Counters for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: Category,
    /// Tasks currently registered.
    pub active: u64,
    /// Registrations ever made, including rebinds.
    pub registered: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub expired: u64,
}

/// Point-in-time scheduler statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub categories: Vec<CategoryStats>,
    /// Scans currently running.
    pub in_flight: usize,
    /// Tokens whose consecutive failures exceed the threshold.
    pub failing: Vec<(TokenAddress, u32)>,
}

impl SchedulerStats {
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&CategoryStats> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Total registered tasks across categories.
    #[must_use]
    pub fn active(&self) -> u64 {
        self.categories.iter().map(|c| c.active).sum()
    }

    #[must_use]
    pub fn completed(&self) -> u64 {
        self.categories.iter().map(|c| c.completed).sum()
    }

    #[must_use]
    pub fn failed(&self) -> u64 {
        self.categories.iter().map(|c| c.failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_never_underflows() {
        let stats = StatsRegistry::default();
        stats.deactivated(Category::Low);
        stats.registered(Category::Low);
        stats.registered(Category::High);
        stats.deactivated(Category::Low);
        let snapshot = stats.snapshot(0);
        assert_eq!(snapshot.category(Category::Low).unwrap().active, 0);
        assert_eq!(snapshot.category(Category::Low).unwrap().registered, 1);
        assert_eq!(snapshot.active(), 1);
    }

    #[test]
    fn failing_tokens_are_listed_until_cleared() {
        let stats = StatsRegistry::default();
        let address = TokenAddress::new("tok");
        stats.mark_failing(&address, 6);
        assert_eq!(stats.snapshot(0).failing, vec![(address.clone(), 6)]);
        assert!(stats.clear_failing(&address));
        assert!(stats.snapshot(0).failing.is_empty());
    }
}
