//! tavolo - Restaurant reservation availability watcher
//!
//! A polling daemon that watches a ResDiary-style availability endpoint and
//! notifies Telegram subscribers the moment a previously-unseen slot appears.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`source`] - Availability source client and record normalization
//! - [`schedule`] - Active/Quiet schedule state machine
//! - [`storage`] - Durable seen-set, poll status, and subscriber registry
//! - [`notify`] - Notification channels and subscriber fan-out
//! - [`engine`] - Poll engine and top-level controller loop
//! - [`bot`] - Telegram command listener
//! - [`models`] - Core data structures and types
//!
//! # Example
//!
//! ```no_run
//! use tavolo::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     config.validate()?;
//!     // build the engine controller and run, see src/main.rs
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod schedule;
pub mod source;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{EngineController, EngineStatus, PollEngine};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{AvailabilityItem, EngineMode, PollStatus, Snapshot};
    pub use crate::notify::{Channel, SubscriberDispatcher};
    pub use crate::schedule::{QuietWindow, ScheduleState};
    pub use crate::storage::{SeenStore, StatusStore, SubscriberRegistry};
}

// Direct re-exports for convenience
pub use models::{AvailabilityItem, EngineMode, PollStatus, Snapshot};
