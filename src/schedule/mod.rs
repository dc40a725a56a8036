//! Active/Quiet schedule state machine
//!
//! Decides, from wall-clock time and manual overrides, whether the engine
//! polls or idles. Clock-driven transitions fire when the configured quiet
//! window is entered or left; a manual override pins the mode and suppresses
//! clock-driven transitions until it is cleared (or until the clock catches
//! up and agrees with it, at which point the override is redundant and
//! drops away).
//!
//! Re-entering the current mode never re-emits a transition: every
//! transition is guarded by comparing the desired mode against the current
//! one.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::EngineMode;

/// A time-of-day range during which polling is suspended.
///
/// The window may wrap midnight (e.g. 23:00-07:00). A zero-length window
/// (start == end) never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietWindow {
    /// Start of the window (inclusive)
    pub start: NaiveTime,

    /// End of the window (exclusive)
    pub end: NaiveTime,
}

impl QuietWindow {
    /// Create a new quiet window
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Parse a window from `HH:MM` bounds
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let start = NaiveTime::parse_from_str(start, "%H:%M")
            .map_err(|e| format!("quiet window start {start:?} is not HH:MM: {e}"))?;
        let end = NaiveTime::parse_from_str(end, "%H:%M")
            .map_err(|e| format!("quiet window end {end:?} is not HH:MM: {e}"))?;
        Ok(Self::new(start, end))
    }

    /// Check whether a wall-clock time falls inside the window
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start == self.end {
            return false;
        }
        if self.start < self.end {
            self.start <= time && time < self.end
        } else {
            // Wraps midnight
            time >= self.start || time < self.end
        }
    }

    /// The mode the clock alone would put the engine in
    pub fn mode_at(&self, time: NaiveTime) -> EngineMode {
        if self.contains(time) {
            EngineMode::Quiet
        } else {
            EngineMode::Active
        }
    }
}

/// A mode change produced by evaluation or a manual command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Active -> Quiet
    EnteringQuiet,
    /// Quiet -> Active
    Resuming,
}

/// Read-only snapshot of the schedule state for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    /// Current mode
    pub mode: EngineMode,

    /// Manual override, when one is pinned
    pub manual_override: Option<EngineMode>,

    /// When the mode last changed
    pub last_transition_at: DateTime<Utc>,
}

/// The schedule state machine
#[derive(Debug, Clone)]
pub struct ScheduleState {
    window: QuietWindow,
    mode: EngineMode,
    manual_override: Option<EngineMode>,
    last_transition_at: DateTime<Utc>,
}

impl ScheduleState {
    /// Create the machine with its initial mode computed from the clock
    pub fn new(window: QuietWindow, now: NaiveTime) -> Self {
        Self {
            window,
            mode: window.mode_at(now),
            manual_override: None,
            last_transition_at: Utc::now(),
        }
    }

    /// Current mode
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Current manual override, if any
    pub fn manual_override(&self) -> Option<EngineMode> {
        self.manual_override
    }

    /// Snapshot for status reporting
    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            mode: self.mode,
            manual_override: self.manual_override,
            last_transition_at: self.last_transition_at,
        }
    }

    /// Clock-driven evaluation. Returns the transition to announce, if the
    /// mode changed. With an override pinned, the clock never transitions;
    /// once the clock-derived mode agrees with the override, the override
    /// has nothing left to force and is dropped.
    pub fn evaluate(&mut self, now: NaiveTime) -> Option<Transition> {
        let clock_mode = self.window.mode_at(now);

        if let Some(forced) = self.manual_override {
            if clock_mode == forced {
                self.manual_override = None;
            }
            return None;
        }

        self.transition_to(clock_mode)
    }

    /// Pin the engine to Quiet until woken
    pub fn force_sleep(&mut self) -> Option<Transition> {
        self.manual_override = Some(EngineMode::Quiet);
        self.transition_to(EngineMode::Quiet)
    }

    /// Pin the engine to Active until put to sleep
    pub fn force_wake(&mut self) -> Option<Transition> {
        self.manual_override = Some(EngineMode::Active);
        self.transition_to(EngineMode::Active)
    }

    /// Drop any manual override; clock-driven behavior resumes at the next
    /// evaluation
    pub fn clear_override(&mut self) {
        self.manual_override = None;
    }

    fn transition_to(&mut self, mode: EngineMode) -> Option<Transition> {
        if self.mode == mode {
            return None;
        }

        self.mode = mode;
        self.last_transition_at = Utc::now();

        match mode {
            EngineMode::Quiet => Some(Transition::EnteringQuiet),
            EngineMode::Active => Some(Transition::Resuming),
        }
    }
}
