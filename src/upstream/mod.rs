//! Remote state source.
//!
//! The poller only talks to [`StateSource`]; [`HomeAssistantClient`] is the
//! production implementation backed by the Home Assistant REST API.

mod client;
mod ping;

pub use client::{HomeAssistantClient, HomeAssistantConfig};
pub use ping::{ping_with_backoff, PingBackoff};

use crate::state::StateRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of current and historical entity state.
#[async_trait]
pub trait StateSource: Send + Sync {
    /// Fetch the current state of one entity.
    async fn fetch_current_state(&self, entity_id: &str) -> Result<StateRecord>;

    /// Fetch state changes for one entity between `start` and `end`.
    ///
    /// Returns one series per matched entity; callers filtering on a single
    /// entity id expect exactly one series back.
    async fn fetch_history(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        significant_only: bool,
    ) -> Result<Vec<Vec<StateRecord>>>;

    /// Check that the source is reachable and accepts our credentials.
    async fn ping(&self) -> Result<()>;
}
