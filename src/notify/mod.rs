//! Notification channels and subscriber fan-out
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │      SubscriberDispatcher                  │
//! │  - reads the registry at dispatch time     │
//! │  - bounded concurrent fan-out              │
//! │  - per-subscriber failure isolation        │
//! └────────────────────────────────────────────┘
//!                     │
//!                     ▼
//!               ┌──────────┐
//!               │ Telegram │   (any Channel implementation)
//!               │ Channel  │
//!               └──────────┘
//! ```
//!
//! One failing subscriber never blocks the others, and a partially failed
//! broadcast never fails the calling poll cycle.

pub mod dispatch;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::subscribers::Subscriber;

pub use dispatch::{BroadcastReport, SubscriberDispatcher};
pub use telegram::TelegramChannel;

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure likely to clear on its own (gateway errors, throttling)
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// Failure that will not clear by retrying (bad chat id, revoked token)
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),

    /// Invalid channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChannelError {
    /// Check if this error is recoverable (can be retried)
    ///
    /// The dispatcher treats both kinds identically (log, skip); the
    /// distinction is carried for status reporting and future policies.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Transient(_) => true,
            Self::Permanent(_) | Self::InvalidConfig(_) => false,
        }
    }
}

/// A channel that can deliver a text message to one subscriber
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Deliver `text` to one subscriber
    async fn send(&self, subscriber: Subscriber, text: &str) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_classification() {
        assert!(ChannelError::Transient("503".to_string()).is_recoverable());
        assert!(!ChannelError::Permanent("chat not found".to_string()).is_recoverable());
        assert!(!ChannelError::InvalidConfig("empty token".to_string()).is_recoverable());
    }
}
