//! Outbound ports (driven side): interfaces implemented by outbound adapters.

pub mod provider;
pub mod repository;
