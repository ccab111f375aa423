//! Tiered market data routing with a daily spend ledger.

mod budget;
mod service;

pub use budget::DailyBudget;
pub use service::{RouterConfig, TieredDataRouter};
