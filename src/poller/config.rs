use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the polling scheduler
#[derive(Clone, Debug, Deserialize)]
pub struct PollerConfig {
    /// Entity ids to poll
    #[serde(default)]
    pub entities: Vec<String>,

    /// Interval between fetch rounds (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum fetches in flight during a round
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// History window replayed before polling starts (seconds, 0 disables)
    #[serde(default)]
    pub bootstrap_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_concurrency() -> usize {
    2
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            poll_interval_ms: default_poll_interval_ms(),
            concurrency: default_concurrency(),
            bootstrap_secs: 0,
        }
    }
}

impl PollerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn bootstrap_window(&self) -> Duration {
        Duration::from_secs(self.bootstrap_secs)
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            bail!("poller concurrency must be at least 1");
        }
        if self.poll_interval_ms == 0 {
            bail!("poller interval must be greater than zero");
        }
        if self.entities.is_empty() {
            bail!("no entities configured to poll");
        }
        Ok(())
    }
}
