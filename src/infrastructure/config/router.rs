//! `[router]` section.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::pipeline::BudgetPolicy;
use crate::application::router::RouterConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Daily ceiling on paid provider spend, in USD.
    #[serde(default = "default_daily_budget")]
    pub daily_budget: Decimal,
    /// Merge order, highest priority first.
    #[serde(default = "default_provider_priority")]
    pub provider_priority: Vec<String>,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default)]
    pub on_budget_exceeded: BudgetPolicy,
}

fn default_daily_budget() -> Decimal {
    Decimal::from(25)
}

fn default_provider_priority() -> Vec<String> {
    ["dexscreener", "geckoterminal", "rugcheck", "holders"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_provider_timeout_ms() -> u64 {
    5_000
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            daily_budget: default_daily_budget(),
            provider_priority: default_provider_priority(),
            provider_timeout_ms: default_provider_timeout_ms(),
            on_budget_exceeded: BudgetPolicy::default(),
        }
    }
}

impl RouterSettings {
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    #[must_use]
    pub fn to_config(&self) -> RouterConfig {
        RouterConfig {
            provider_priority: self.provider_priority.clone(),
            provider_timeout: self.provider_timeout(),
            daily_budget: self.daily_budget,
        }
    }
}
