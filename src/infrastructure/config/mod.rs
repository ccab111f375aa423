//! Infrastructure configuration modules.

pub mod archival;
pub mod category;
pub mod logging;
pub mod router;
pub mod scheduler;
pub mod settings;
