use crate::poller::config::PollerConfig;
use crate::state::StateStore;
use crate::upstream::StateSource;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval_at, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Polls the state source for a fixed set of entities.
///
/// Every tick runs one fetch round: one task per entity, at most
/// `concurrency` in flight, and the round only ends once every task has
/// finished. Rounds never overlap; ticks missed while a round overruns are
/// skipped rather than queued.
pub struct PollScheduler {
    config: PollerConfig,
    source: Arc<dyn StateSource>,
    store: Arc<dyn StateStore>,
}

impl PollScheduler {
    /// Create a scheduler, rejecting an unusable configuration up front
    pub fn new(
        config: PollerConfig,
        source: Arc<dyn StateSource>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self> {
        config.validate().context("Invalid poller configuration")?;

        Ok(Self {
            config,
            source,
            store,
        })
    }

    /// Run until `cancel` fires.
    ///
    /// Replays the bootstrap window first when one is configured, then
    /// services ticks. The first tick fires one full interval after start.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = self.config.poll_interval();

        info!(
            entities = ?self.config.entities,
            interval_ms = self.config.poll_interval_ms,
            concurrency = self.config.concurrency,
            "Starting poller"
        );

        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        // Skip missed ticks to prevent backlog when a round overruns
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if !self.config.bootstrap_window().is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Poller stopped during bootstrap");
                    return;
                }
                _ = self.bootstrap(&cancel) => {}
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Poller stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.fetch_round(&cancel).await;
                }
            }
        }
    }

    /// Fetch the current state of every entity and write successes to the store.
    ///
    /// Returns the number of entities fetched successfully.
    pub async fn fetch_round(&self, cancel: &CancellationToken) -> usize {
        let started = Instant::now();

        let fetched = self
            .fetch_concurrent(|entity_id| {
                fetch_entity(
                    Arc::clone(&self.source),
                    Arc::clone(&self.store),
                    entity_id,
                    cancel.clone(),
                )
            })
            .await;

        debug!(
            fetched = fetched,
            entities = self.config.entities.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetch round complete"
        );

        fetched
    }

    /// Replay each entity's significant state changes over the bootstrap window.
    ///
    /// Returns the number of entities seeded.
    pub async fn bootstrap(&self, cancel: &CancellationToken) -> usize {
        let window = self.config.bootstrap_window();
        let end = Utc::now();
        let start = match chrono::Duration::from_std(window) {
            Ok(window) => end - window,
            Err(e) => {
                warn!(error = %e, "Bootstrap window out of range, skipping bootstrap");
                return 0;
            }
        };

        info!(window_secs = window.as_secs(), "Bootstrapping entities");

        let seeded = self
            .fetch_concurrent(|entity_id| {
                fetch_entity_history(
                    Arc::clone(&self.source),
                    Arc::clone(&self.store),
                    entity_id,
                    (start, end),
                    cancel.clone(),
                )
            })
            .await;

        info!(
            seeded = seeded,
            entities = self.config.entities.len(),
            "Bootstrap complete"
        );

        seeded
    }

    /// Run `task` once per entity with at most `concurrency` running at a time.
    ///
    /// A permit is acquired before each task is spawned and released when the
    /// task finishes; returns once every task has completed, with the number
    /// of tasks that reported success.
    async fn fetch_concurrent<F, Fut>(&self, task: F) -> usize
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();

        for entity_id in &self.config.entities {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Fetch semaphore closed");
                    break;
                }
            };

            let fut = task(entity_id.clone());
            tasks.spawn(async move {
                let ok = fut.await;
                drop(permit);
                ok
            });
        }

        let mut succeeded = 0;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(true) => succeeded += 1,
                Ok(false) => {}
                Err(e) => error!(error = %e, "Fetch task failed"),
            }
        }

        succeeded
    }
}

async fn fetch_entity(
    source: Arc<dyn StateSource>,
    store: Arc<dyn StateStore>,
    entity_id: String,
    cancel: CancellationToken,
) -> bool {
    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(entity_id = %entity_id, "Fetch cancelled");
            return false;
        }
        result = source.fetch_current_state(&entity_id) => result,
    };

    match result {
        Ok(record) => {
            store.set(record);
            true
        }
        Err(e) => {
            warn!(entity_id = %entity_id, error = %e, "Failed to get state");
            false
        }
    }
}

async fn fetch_entity_history(
    source: Arc<dyn StateSource>,
    store: Arc<dyn StateStore>,
    entity_id: String,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
    cancel: CancellationToken,
) -> bool {
    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(entity_id = %entity_id, "History fetch cancelled");
            return false;
        }
        result = source.fetch_history(&entity_id, start, end, true) => result,
    };

    let mut series = match result {
        Ok(series) => series,
        Err(e) => {
            warn!(entity_id = %entity_id, error = %e, "Failed to get state change history");
            return false;
        }
    };

    // Filtering on a single entity id, so exactly one series is expected
    if series.len() != 1 {
        warn!(
            entity_id = %entity_id,
            series = series.len(),
            "Unexpected state change history returned"
        );
        return false;
    }

    let records = series.remove(0);
    debug!(entity_id = %entity_id, records = records.len(), "Replaying history");

    for record in records {
        store.set(record);
    }

    true
}
