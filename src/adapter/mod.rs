//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - Administrative CLI
//! - [`outbound`] - Token repositories and market data providers

pub mod inbound;
pub mod outbound;
