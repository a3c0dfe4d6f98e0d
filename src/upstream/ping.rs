use crate::upstream::StateSource;
use anyhow::{bail, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

/// Retry policy for the startup connectivity check
#[derive(Clone, Debug)]
pub struct PingBackoff {
    /// Delay before the first retry; doubled after every failure
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for PingBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

/// Ping the source until it answers, backing off exponentially between attempts.
///
/// Returns the last error once `max_retries` retries have failed, or an
/// error immediately when `cancel` fires while waiting.
pub async fn ping_with_backoff(
    source: &dyn StateSource,
    backoff: &PingBackoff,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut delay = backoff.initial_delay;
    let mut attempt = 0;

    loop {
        trace!(attempt = attempt + 1, "Pinging Home Assistant");

        let err = match source.ping().await {
            Ok(()) => {
                info!(attempts = attempt + 1, "Home Assistant reachable");
                return Ok(());
            }
            Err(e) => e,
        };

        if attempt >= backoff.max_retries {
            return Err(err.context(format!(
                "Home Assistant unreachable after {} attempts",
                attempt + 1
            )));
        }

        warn!(
            attempt = attempt + 1,
            max_retries = backoff.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Ping failed, backing off"
        );

        tokio::select! {
            _ = cancel.cancelled() => bail!("Startup ping cancelled"),
            _ = tokio::time::sleep(delay) => {}
        }

        delay = (delay * 2).min(backoff.max_delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateRecord;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Source whose ping fails a fixed number of times before succeeding
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl StateSource for FlakySource {
        async fn fetch_current_state(&self, _entity_id: &str) -> Result<StateRecord> {
            Err(anyhow!("unused"))
        }

        async fn fetch_history(
            &self,
            _entity_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _significant_only: bool,
        ) -> Result<Vec<Vec<StateRecord>>> {
            Err(anyhow!("unused"))
        }

        async fn ping(&self) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(anyhow!("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    fn fast_backoff() -> PingBackoff {
        PingBackoff {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_retries: 3,
        }
    }

    #[tokio::test]
    async fn test_ping_succeeds_first_try() {
        let source = FlakySource { failures: 0, calls: AtomicU32::new(0) };
        ping_with_backoff(&source, &fast_backoff(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ping_recovers_within_retries() {
        let source = FlakySource { failures: 3, calls: AtomicU32::new(0) };
        ping_with_backoff(&source, &fast_backoff(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_ping_gives_up_after_max_retries() {
        let source = FlakySource { failures: 10, calls: AtomicU32::new(0) };
        let err = ping_with_backoff(&source, &fast_backoff(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert!(err.to_string().contains("after 4 attempts"));
    }

    #[tokio::test]
    async fn test_ping_cancelled_while_backing_off() {
        let source = FlakySource { failures: 10, calls: AtomicU32::new(0) };
        let backoff = PingBackoff {
            initial_delay: Duration::from_secs(60),
            ..fast_backoff()
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = ping_with_backoff(&source, &backoff, &cancel).await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ping_aborts_when_cancelled_from_another_task() {
        let source = FlakySource { failures: 10, calls: AtomicU32::new(0) };
        let backoff = PingBackoff {
            initial_delay: Duration::from_secs(60),
            ..fast_backoff()
        };
        let cancel = CancellationToken::new();

        let signal = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            signal.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            ping_with_backoff(&source, &backoff, &cancel),
        )
        .await
        .expect("ping kept backing off after cancellation")
        .unwrap_err();

        assert!(err.to_string().contains("cancelled"));
        assert!(cancel.is_cancelled());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
