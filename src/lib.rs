//! Tierwatch - Category lifecycle engine for valuation-banded token tracking.
//!
//! Every tracked token sits in exactly one category. Its valuation decides
//! which band (and therefore which category) it belongs to, the category
//! decides how often and how deeply it is scanned, and every scan may move
//! it to a different band.
//!
//! # Architecture
//!
//! - **`domain`** - Categories, bands, tokens, snapshots and transitions
//! - **`port`** - `TokenRepository` and `MarketDataProvider` traits
//! - **`application`** - The three engine services
//!   - `CategoryStateMachine` - band matching and atomic transitions
//!   - `ScanScheduler` - one cadence-driven scan task per token
//!   - `TieredDataRouter` - free/paid provider fan-out with a daily budget
//! - **`adapter`** - SQLite and in-memory storage, HTTP providers, the CLI
//! - **`infrastructure`** - Configuration, wiring and the engine runtime
//!
//! # Features
//!
//! - `testkit` - Mock providers, handlers and canonical configurations for
//!   integration tests
//!
//! # Example
//!
//! ```no_run
//! use tierwatch::infrastructure::bootstrap::build_engine;
//! use tierwatch::infrastructure::config::settings::Config;
//!
//! # async fn demo() -> tierwatch::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let engine = build_engine(&config, false)?;
//! engine.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
