//! `[scheduler]` section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::scheduler::SchedulerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_max_concurrent_scans")]
    pub max_concurrent_scans: usize,
    /// Consecutive failures before a token is reported.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// How often the engine logs scheduler stats. 0 disables the log.
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
    #[serde(default = "default_restart_jitter")]
    pub restart_jitter: bool,
}

fn default_max_concurrent_scans() -> usize {
    SchedulerConfig::default().max_concurrent_scans
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_stats_interval_secs() -> u64 {
    60
}

fn default_restart_jitter() -> bool {
    true
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_scans: default_max_concurrent_scans(),
            failure_threshold: default_failure_threshold(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            stats_interval_secs: default_stats_interval_secs(),
            restart_jitter: default_restart_jitter(),
        }
    }
}

impl SchedulerSettings {
    #[must_use]
    pub fn to_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent_scans: self.max_concurrent_scans,
            failure_threshold: self.failure_threshold,
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
            restart_jitter: self.restart_jitter,
        }
    }

    #[must_use]
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }
}
