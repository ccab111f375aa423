//! Provider configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ProviderTier;

/// Settings for one `[providers.<name>]` table.
///
/// Unset fields fall back to the provider's built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Cost per successful call, charged against the daily budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<ProviderTier>,
    /// Declared rank used when the provider is not in `router.provider_priority`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Chain or network id, for providers that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Loaded from the environment, never from the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: None,
            unit_cost: None,
            tier: None,
            rank: None,
            network: None,
            api_key: None,
        }
    }
}

impl ProviderSettings {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub(crate) fn network_or(&self, default: &str) -> String {
        self.network.clone().unwrap_or_else(|| default.to_string())
    }
}

/// All `[providers.*]` tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub dexscreener: ProviderSettings,
    #[serde(default)]
    pub geckoterminal: ProviderSettings,
    #[serde(default)]
    pub rugcheck: ProviderSettings,
    /// Needs `TIERWATCH_HOLDERS_API_KEY`; off unless enabled.
    #[serde(default = "ProviderSettings::disabled")]
    pub holders: ProviderSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            dexscreener: ProviderSettings::default(),
            geckoterminal: ProviderSettings::default(),
            rugcheck: ProviderSettings::default(),
            holders: ProviderSettings::disabled(),
        }
    }
}

impl ProvidersConfig {
    /// `(name, settings)` for every provider, in declared rank order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &ProviderSettings); 4] {
        [
            ("dexscreener", &self.dexscreener),
            ("geckoterminal", &self.geckoterminal),
            ("rugcheck", &self.rugcheck),
            ("holders", &self.holders),
        ]
    }
}
