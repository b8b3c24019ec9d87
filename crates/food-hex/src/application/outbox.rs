use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use food_types::ports::event_publisher::EventPublisher;
use food_types::ports::order_repository::{OutboxRepository, RepoError};
use tokio::time::MissedTickBehavior;

/// How long a publisher owns an entry before anyone else may send it.
/// Outlasts the webhook publisher's request timeout.
pub const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(30);

/// End of a claim taken at `now`.
pub fn lease_end(now: DateTime<Utc>, lease: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lease)
        .ok()
        .and_then(|lease| now.checked_add_signed(lease))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Clone, Debug)]
pub struct OutboxSettings {
    /// Pause between sweeps of undelivered entries
    pub poll_interval: Duration,
    /// Entries that failed this many times are no longer retried
    pub max_attempts: u32,
    /// Entries picked up per sweep
    pub batch_size: usize,
    /// Claim held on each picked-up entry while it is being published
    pub claim_lease: Duration,
}

impl Default for OutboxSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: 5,
            batch_size: 50,
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub dispatched: usize,
    pub failed: usize,
    pub exhausted: usize,
}

/// Re-delivers outbox entries whose immediate publish did not go through.
///
/// Entries are claimed before publishing, so an entry still owned by the
/// immediate attempt or by another dispatcher is skipped.
pub struct OutboxDispatcher {
    outbox: Arc<dyn OutboxRepository>,
    publisher: Arc<dyn EventPublisher>,
    settings: OutboxSettings,
}

impl OutboxDispatcher {
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        publisher: Arc<dyn EventPublisher>,
        settings: OutboxSettings,
    ) -> Self {
        Self {
            outbox,
            publisher,
            settings,
        }
    }

    pub async fn dispatch_pending(&self) -> Result<DispatchReport, RepoError> {
        let now = Utc::now();
        let pending = self
            .outbox
            .claim_pending(
                self.settings.max_attempts,
                self.settings.batch_size,
                now,
                lease_end(now, self.settings.claim_lease),
            )
            .await?;
        let mut report = DispatchReport::default();

        for entry in pending {
            match self.publisher.publish(&entry.event).await {
                Ok(()) => {
                    self.outbox.mark_dispatched(entry.id).await?;
                    report.dispatched += 1;
                    tracing::debug!(
                        outbox_id = entry.id,
                        attempt = entry.attempts + 1,
                        event_type = entry.event.event_type(),
                        "outbox entry delivered"
                    );
                }
                Err(e) => {
                    self.outbox.record_failure(entry.id, &e.to_string()).await?;
                    let attempts = entry.attempts + 1;
                    if attempts >= self.settings.max_attempts {
                        report.exhausted += 1;
                        tracing::error!(
                            outbox_id = entry.id,
                            order_code = %entry.event.order_code,
                            event_type = entry.event.event_type(),
                            attempts,
                            error = %e,
                            "giving up on event delivery"
                        );
                    } else {
                        report.failed += 1;
                        tracing::warn!(
                            outbox_id = entry.id,
                            attempts,
                            max_attempts = self.settings.max_attempts,
                            error = %e,
                            "event delivery failed, will retry"
                        );
                    }
                }
            }
        }
        Ok(report)
    }

    /// Sweeps on every tick until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            max_attempts = self.settings.max_attempts,
            "outbox dispatcher started"
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    match self.dispatch_pending().await {
                        Ok(report) if report != DispatchReport::default() => {
                            tracing::info!(
                                dispatched = report.dispatched,
                                failed = report.failed,
                                exhausted = report.exhausted,
                                "outbox sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "outbox sweep failed"),
                    }
                }
            }
        }
        tracing::info!("outbox dispatcher stopped");
    }
}
