//! One poll cycle: fetch, normalize, dedup, notify, persist
//!
//! The engine owns cross-cycle backoff: a source failure increments the
//! backoff level and schedules the retry at `base * 2^level` seconds
//! (capped); any success resets the level. Dispatch always precedes
//! seen-set persistence, so a persistence failure can delay durability but
//! never keeps subscribers from hearing about availability.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use super::SharedState;
use crate::config::EngineConfig;
use crate::models::Snapshot;
use crate::notify::SubscriberDispatcher;
use crate::source::{normalize_all, AvailabilitySource, SourceError};
use crate::storage::{SeenStore, StatusStore};

/// Outcome of one poll cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// New availability was found and announced
    Found(Snapshot),

    /// Nothing new (including "no data this cycle" on a malformed body)
    Nothing,

    /// The source was unavailable; retry after `retry_in`
    SourceDown {
        error: SourceError,
        backoff_level: u32,
        retry_in: Duration,
    },
}

/// Compute the retry delay for a backoff level: `base * 2^level`, capped
pub fn backoff_delay(level: u32, base_secs: u64, cap_secs: u64) -> Duration {
    let exp = level.min(30);
    let secs = base_secs.saturating_mul(1u64 << exp).min(cap_secs);
    Duration::from_secs(secs.max(1))
}

/// Build the single notification message for a batch of new ids.
///
/// Ids are enumerated in their set order, which is already sorted, so the
/// same batch always produces the same message.
pub fn build_notification(new: &Snapshot) -> String {
    let mut message = String::from("🎉 New availability found:");
    for id in new {
        message.push_str("\n• ");
        message.push_str(id);
    }
    message
}

/// Runs poll cycles against the availability source
pub struct PollEngine {
    source: AvailabilitySource,
    dispatcher: SubscriberDispatcher,
    seen: Arc<Mutex<SeenStore>>,
    status_store: StatusStore,
    state: SharedState,
    config: EngineConfig,

    /// Serializes cycles so a manual check never interleaves with the loop
    cycle_guard: Mutex<()>,
}

impl PollEngine {
    /// Create a poll engine
    pub fn new(
        source: AvailabilitySource,
        dispatcher: SubscriberDispatcher,
        seen: Arc<Mutex<SeenStore>>,
        status_store: StatusStore,
        state: SharedState,
        config: EngineConfig,
    ) -> Self {
        Self {
            source,
            dispatcher,
            seen,
            status_store,
            state,
            config,
            cycle_guard: Mutex::new(()),
        }
    }

    /// Run one complete poll cycle
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _cycle = self.cycle_guard.lock().await;

        // The source call runs outside the shared-state guard
        let result = self.source.check().await;
        let now = Utc::now();

        match result {
            Ok(items) => {
                let snapshot = normalize_all(&items);
                let new = {
                    let seen = self.seen.lock().await;
                    seen.new_ids(&snapshot)
                };

                if new.is_empty() {
                    tracing::debug!(
                        snapshot_size = snapshot.len(),
                        "heartbeat: no new availability"
                    );
                    self.retry_pending_persistence().await;
                } else {
                    tracing::info!(count = new.len(), "new availability found");

                    // Dispatch first, then persist: subscribers must learn
                    // about availability even if the write fails afterwards
                    let message = build_notification(&new);
                    self.dispatcher.broadcast(&message).await;

                    let mut seen = self.seen.lock().await;
                    if let Err(e) = seen.mark_seen(&new) {
                        tracing::error!(
                            error = %e,
                            "seen-set persistence failed; in-memory set stays authoritative"
                        );
                    }
                }

                let status = {
                    let mut state = self.state.lock().await;
                    state.status.record_success(now, !new.is_empty());
                    state.status.next_poll_eta =
                        Some(now + chrono::Duration::seconds(self.config.poll_interval_secs as i64));
                    state.status.clone()
                };
                self.persist_status(&status);

                if new.is_empty() {
                    CycleOutcome::Nothing
                } else {
                    CycleOutcome::Found(new)
                }
            }

            Err(error) if !error.is_unavailable() => {
                // Malformed body: "no data this cycle", backoff untouched
                tracing::warn!(error = %error, "malformed source response, treating as no data");

                let status = {
                    let mut state = self.state.lock().await;
                    state.status.last_poll_at = Some(now);
                    state.status.next_poll_eta =
                        Some(now + chrono::Duration::seconds(self.config.poll_interval_secs as i64));
                    state.status.clone()
                };
                self.persist_status(&status);

                CycleOutcome::Nothing
            }

            Err(error) => {
                let (backoff_level, retry_in, status) = {
                    let mut state = self.state.lock().await;
                    let level = state.status.record_failure(now);
                    let delay = backoff_delay(
                        level,
                        self.config.backoff_base_secs,
                        self.config.backoff_cap_secs,
                    );
                    state.status.next_poll_eta = Some(
                        now + chrono::Duration::from_std(delay)
                            .unwrap_or_else(|_| chrono::Duration::zero()),
                    );
                    (level, delay, state.status.clone())
                };
                self.persist_status(&status);

                tracing::warn!(
                    error = %error,
                    backoff_level,
                    retry_in_secs = retry_in.as_secs(),
                    "availability source unavailable"
                );

                if self.config.notify_on_source_failure {
                    self.dispatcher
                        .broadcast(&format!("❌ Availability check failed: {error}"))
                        .await;
                }

                CycleOutcome::SourceDown {
                    error,
                    backoff_level,
                    retry_in,
                }
            }
        }
    }

    /// Flush a dirty seen-set left behind by an earlier failed write
    async fn retry_pending_persistence(&self) {
        let mut seen = self.seen.lock().await;
        if seen.is_dirty() {
            match seen.flush() {
                Ok(()) => tracing::info!("pending seen-set persisted"),
                Err(e) => tracing::error!(error = %e, "seen-set persistence still failing"),
            }
        }
    }

    fn persist_status(&self, status: &crate::models::PollStatus) {
        if let Err(e) = self.status_store.save(status) {
            tracing::error!(error = %e, "poll status persistence failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_growth() {
        let base = 1;
        let cap = 300;

        assert_eq!(backoff_delay(1, base, cap), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, base, cap), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, base, cap), Duration::from_secs(8));
        assert_eq!(backoff_delay(8, base, cap), Duration::from_secs(256));
    }

    #[test]
    fn test_backoff_delay_cap() {
        assert_eq!(backoff_delay(9, 1, 300), Duration::from_secs(300));
        assert_eq!(backoff_delay(30, 1, 300), Duration::from_secs(300));

        // Extreme levels must not overflow
        assert_eq!(backoff_delay(u32::MAX, 1, 300), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_delay_floor() {
        // A zero base still yields a positive delay
        assert_eq!(backoff_delay(1, 0, 300), Duration::from_secs(1));
    }

    #[test]
    fn test_notification_is_sorted_and_deterministic() {
        let new: Snapshot = ["2025-11-03", "2025-11-01", "2025-11-02"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let message = build_notification(&new);
        assert_eq!(
            message,
            "🎉 New availability found:\n• 2025-11-01\n• 2025-11-02\n• 2025-11-03"
        );
        assert_eq!(message, build_notification(&new));
    }
}
