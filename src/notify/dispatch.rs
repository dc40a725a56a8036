//! Subscriber fan-out with isolated per-subscriber failures
//!
//! One broadcast attempts delivery to every currently registered subscriber.
//! Sends run concurrently with a bounded fan-out, every failure is logged
//! against its subscriber and swallowed, and the call returns only once all
//! sends have finished. The caller therefore knows dispatch is complete
//! before it persists the seen-set. No retry happens within one broadcast.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use super::Channel;
use crate::storage::SubscriberRegistry;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the message was attempted for
    pub attempted: usize,

    /// Successful deliveries
    pub delivered: usize,

    /// Failed deliveries (logged, not retried)
    pub failed: usize,
}

impl BroadcastReport {
    /// Whether every attempted send succeeded
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Fans messages out to every registered subscriber
#[derive(Clone)]
pub struct SubscriberDispatcher {
    channel: Arc<dyn Channel>,
    registry: Arc<Mutex<SubscriberRegistry>>,
    concurrency: usize,
}

impl SubscriberDispatcher {
    /// Create a dispatcher over a channel and the shared registry
    pub fn new(
        channel: Arc<dyn Channel>,
        registry: Arc<Mutex<SubscriberRegistry>>,
        concurrency: usize,
    ) -> Self {
        Self {
            channel,
            registry,
            concurrency: concurrency.max(1),
        }
    }

    /// Number of currently registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Deliver `text` to every registered subscriber.
    ///
    /// Each send is attempted independently; a failure for one subscriber
    /// never aborts the rest and never fails the caller.
    pub async fn broadcast(&self, text: &str) -> BroadcastReport {
        let subscribers = self.registry.lock().await.list();

        if subscribers.is_empty() {
            tracing::debug!("broadcast skipped, no subscribers registered");
            return BroadcastReport::default();
        }

        let attempted = subscribers.len();
        let channel = &self.channel;
        let text = text.to_string();

        let delivered = stream::iter(subscribers)
            .map(|subscriber| {
                let text = text.clone();
                async move {
                    match channel.send(subscriber, &text).await {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!(
                                subscriber,
                                channel = channel.name(),
                                error = %e,
                                "delivery failed"
                            );
                            false
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter(|ok| std::future::ready(*ok))
            .count()
            .await;

        let report = BroadcastReport {
            attempted,
            delivered,
            failed: attempted - delivered,
        };

        tracing::info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "broadcast finished"
        );

        report
    }
}
