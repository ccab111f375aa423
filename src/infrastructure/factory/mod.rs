//! Factory modules for building infrastructure components.
//!
//! Provides factory functions that construct fully-configured components
//! from application configuration.
//!
//! # Submodules
//!
//! - [`persistence`] - Token repository construction
//! - [`provider`] - Market data provider construction

pub mod persistence;
pub mod provider;
