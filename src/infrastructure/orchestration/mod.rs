//! Runtime orchestration.

pub mod engine;
pub mod runtime;

pub use engine::{Engine, EngineOptions};
pub use runtime::run_with_shutdown;
