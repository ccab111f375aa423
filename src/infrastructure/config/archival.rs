//! `[archival]` section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::lifecycle::ArchivalConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivalSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_idle_after_secs")]
    pub idle_after_secs: u64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

fn default_idle_after_secs() -> u64 {
    86_400
}

fn default_check_interval_secs() -> u64 {
    600
}

impl Default for ArchivalSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_after_secs: default_idle_after_secs(),
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

impl ArchivalSettings {
    #[must_use]
    pub fn to_config(&self) -> ArchivalConfig {
        ArchivalConfig {
            enabled: self.enabled,
            idle_after: Duration::from_secs(self.idle_after_secs),
            check_interval: Duration::from_secs(self.check_interval_secs),
        }
    }
}
