//! Market data provider factory.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapter::outbound::provider::{
    dexscreener, geckoterminal, holders, rugcheck, DexScreenerProvider, GeckoTerminalProvider,
    HoldersProvider, ProvidersConfig, RugCheckProvider,
};
use crate::infrastructure::config::settings::HOLDERS_API_KEY_ENV;
use crate::port::outbound::provider::MarketDataProvider;

/// Build every enabled provider.
///
/// Providers that need an API key are skipped with a warning when the key
/// is missing.
pub fn build_providers(
    config: &ProvidersConfig,
    timeout: Duration,
) -> Vec<Arc<dyn MarketDataProvider>> {
    let mut providers: Vec<Arc<dyn MarketDataProvider>> = Vec::new();

    for (name, settings) in config.entries() {
        if !settings.enabled {
            continue;
        }
        let provider: Arc<dyn MarketDataProvider> = match name {
            dexscreener::NAME => Arc::new(DexScreenerProvider::new(settings, timeout)),
            geckoterminal::NAME => Arc::new(GeckoTerminalProvider::new(settings, timeout)),
            rugcheck::NAME => Arc::new(RugCheckProvider::new(settings, timeout)),
            holders::NAME => match &settings.api_key {
                Some(key) => Arc::new(HoldersProvider::new(settings, key.clone(), timeout)),
                None => {
                    warn!("{HOLDERS_API_KEY_ENV} not set, holders provider disabled");
                    continue;
                }
            },
            other => {
                warn!(provider = other, "Unknown provider, skipping");
                continue;
            }
        };
        let profile = provider.profile();
        info!(
            provider = %profile.name,
            tier = %profile.tier,
            unit_cost = %profile.unit_cost,
            "Provider enabled"
        );
        providers.push(provider);
    }

    if providers.is_empty() {
        warn!("No market data providers enabled");
    }
    providers
}
