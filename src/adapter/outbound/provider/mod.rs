//! HTTP market data providers.
//!
//! Each provider maps one upstream API onto a partial [`MarketSnapshot`]:
//!
//! | Provider        | Tier | Fields                                  |
//! |-----------------|------|-----------------------------------------|
//! | `dexscreener`   | free | valuation, liquidity, 24h volume        |
//! | `geckoterminal` | free | valuation, liquidity, 24h volume        |
//! | `rugcheck`      | paid | security score, holder count            |
//! | `holders`       | paid | top-10 concentration, holder count      |
//!
//! [`MarketSnapshot`]: crate::domain::MarketSnapshot

pub mod dexscreener;
pub mod geckoterminal;
pub mod holders;
mod http;
pub mod rugcheck;
pub mod settings;

pub use dexscreener::DexScreenerProvider;
pub use geckoterminal::GeckoTerminalProvider;
pub use holders::HoldersProvider;
pub use rugcheck::RugCheckProvider;
pub use settings::{ProviderSettings, ProvidersConfig};
