use std::sync::Arc;
use std::time::Duration;

use tierwatch::application::scheduler::{
    Cadence, CadenceTable, ScanHandler, ScanScheduler, SchedulerConfig,
};
use tierwatch::domain::{AnalysisDepth, Category};
use tierwatch::testkit::config;

/// Scheduler over the canonical cadences with `handler` for every category.
pub fn scheduler(handler: Arc<dyn ScanHandler>) -> Arc<ScanScheduler> {
    scheduler_with(handler, config::cadences(), config::scheduler())
}

pub fn scheduler_with(
    handler: Arc<dyn ScanHandler>,
    cadences: CadenceTable,
    config: SchedulerConfig,
) -> Arc<ScanScheduler> {
    let scheduler = Arc::new(ScanScheduler::new(cadences, config));
    scheduler.on_scan_due_all(handler);
    scheduler
}

/// Millisecond cadences for real-time stress tests.
pub fn fast_cadences() -> CadenceTable {
    CadenceTable::new()
        .with(
            Category::Low,
            Cadence::new(Duration::from_millis(7), AnalysisDepth::Shallow),
        )
        .with(
            Category::Medium,
            Cadence::new(Duration::from_millis(5), AnalysisDepth::Shallow),
        )
        .with(
            Category::High,
            Cadence::new(Duration::from_millis(3), AnalysisDepth::Deep),
        )
}
