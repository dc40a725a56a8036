//! Poll engine and top-level controller
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ EngineController                            │
//! │   timed loop: evaluate schedule, then poll  │
//! │   (Active) or idle (Quiet)                  │
//! │   control ops: status / force_sleep /       │
//! │   force_wake / run_check_now                │
//! └──────────────────┬──────────────────────────┘
//!                    │ one cycle per tick
//!                    ▼
//! ┌─────────────────────────────────────────────┐
//! │ PollEngine                                  │
//! │   fetch → normalize → diff seen-set →       │
//! │   broadcast → mark seen → update status     │
//! │   owns cross-cycle exponential backoff      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything mutable the control surface can touch lives in one
//! [`EngineState`] behind a single mutex; the availability call and state
//! file writes happen outside that guard.

pub mod controller;
pub mod poll;

use tokio::sync::Mutex;

use crate::models::PollStatus;
use crate::schedule::ScheduleState;

pub use controller::{EngineController, EngineStatus};
pub use poll::{backoff_delay, build_notification, CycleOutcome, PollEngine};

/// The single piece of shared mutable state: schedule plus poll status.
///
/// The timed loop is its only writer under normal operation; control
/// operations serialize against it through the same mutex.
#[derive(Debug)]
pub struct EngineState {
    /// Active/Quiet state machine
    pub schedule: ScheduleState,

    /// Status of the most recent poll attempts
    pub status: PollStatus,
}

/// Shared handle to the engine state
pub type SharedState = std::sync::Arc<Mutex<EngineState>>;
