//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! business logic: configuration, component construction and the runtime
//! lifecycle.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`factory`] - Component factory functions
//! - [`orchestration`] - Engine and runtime lifecycle

pub mod bootstrap;
pub mod config;
pub mod factory;
pub mod orchestration;
