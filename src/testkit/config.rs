//! Canonical test configurations.
//!
//! Single source of truth for band and cadence tables used across tests:
//!
//! | Category | Band               | Interval | Depth   |
//! |----------|--------------------|----------|---------|
//! | low      | [0, 10 000)        | 300s     | shallow |
//! | medium   | [10 000, 30 000)   | 120s     | shallow |
//! | high     | [30 000, ∞)        | 30s      | deep    |

use std::time::Duration;

use rust_decimal_macros::dec;

use crate::application::router::RouterConfig;
use crate::application::scheduler::{Cadence, CadenceTable, SchedulerConfig};
use crate::domain::{AnalysisDepth, Band, BandTable, Category};
use crate::infrastructure::orchestration::EngineOptions;

pub fn bands() -> BandTable {
    BandTable::new(vec![
        Band::new(Category::Low, dec!(0), Some(dec!(10000))),
        Band::new(Category::Medium, dec!(10000), Some(dec!(30000))),
        Band::new(Category::High, dec!(30000), None),
    ])
    .expect("canonical bands are valid")
}

pub fn cadences() -> CadenceTable {
    CadenceTable::new()
        .with(
            Category::Low,
            Cadence::new(Duration::from_secs(300), AnalysisDepth::Shallow),
        )
        .with(
            Category::Medium,
            Cadence::new(Duration::from_secs(120), AnalysisDepth::Shallow),
        )
        .with(
            Category::High,
            Cadence::new(Duration::from_secs(30), AnalysisDepth::Deep),
        )
}

/// Deterministic scheduler: no restart jitter, short grace period.
pub fn scheduler() -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent_scans: 16,
        failure_threshold: 3,
        shutdown_grace: Duration::from_secs(1),
        restart_jitter: false,
    }
}

pub fn router() -> RouterConfig {
    RouterConfig {
        provider_priority: Vec::new(),
        provider_timeout: Duration::from_secs(2),
        daily_budget: dec!(1),
    }
}

pub fn engine_options() -> EngineOptions {
    EngineOptions {
        scheduler: scheduler(),
        router: router(),
        ..EngineOptions::default()
    }
}
