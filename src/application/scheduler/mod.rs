//! Per-token scan scheduling.
//!
//! Every tracked token in a banded category has exactly one scan task whose
//! cadence follows its category. Tasks run on a bounded pool and never
//! overlap for the same token.

mod cadence;
mod handler;
mod service;
mod stats;
mod task;

pub use cadence::{Cadence, CadenceTable};
pub use handler::{DueOutcome, ScanContext, ScanHandler, ScanReport};
pub use service::{ScanScheduler, SchedulerConfig};
pub use stats::{CategoryStats, SchedulerStats};
pub use task::ScanTask;
