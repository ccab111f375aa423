//! Category lifecycle: band matching, transitions and archival.

mod archival;
mod lock;
mod machine;

pub use archival::{ArchivalConfig, ArchivalPolicy};
pub use machine::CategoryStateMachine;
