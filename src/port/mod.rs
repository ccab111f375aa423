//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams where adapters plug in: token storage and market data
//! providers. The application layer only ever sees these traits, wired as
//! `Arc<dyn Trait>` by the bootstrap code.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                                                       ▼
//! ┌───────────────────┐                            ┌─────────────────────┐
//! │ TokenRepository   │                            │ MarketDataProvider  │
//! │ (memory, sqlite)  │                            │ (dexscreener, ...)  │
//! └───────────────────┘                            └─────────────────────┘
//! ```
//!
//! Note: the `ScanHandler` trait lives in `application::scheduler` since it
//! is an internal extension point rather than an external dependency.

pub mod outbound;

pub use outbound::provider::{MarketDataProvider, ProviderProfile};
pub use outbound::repository::{CommitOutcome, TokenRepository};
