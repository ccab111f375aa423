//! Outbound adapters (driven side).

pub mod memory;
pub mod provider;
pub mod sqlite;
