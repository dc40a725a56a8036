//! Integration tests for the schedule state machine
//!
//! These walk the machine through full days of evaluations, verifying that
//! transitions fire exactly once per boundary and that manual overrides
//! interact correctly with the clock.

use chrono::NaiveTime;

use tavolo::models::EngineMode;
use tavolo::schedule::{QuietWindow, ScheduleState, Transition};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Evaluate every 10 minutes from midnight to midnight, collecting transitions
fn walk_day(state: &mut ScheduleState) -> Vec<(NaiveTime, Transition)> {
    let mut transitions = Vec::new();
    for step in 0u32..(24 * 6) {
        let now = t(step / 6, (step % 6) * 10);
        if let Some(transition) = state.evaluate(now) {
            transitions.push((now, transition));
        }
    }
    transitions
}

#[test]
fn test_one_transition_pair_per_day() {
    let window = QuietWindow::parse("00:00", "08:00").unwrap();

    // Start the day before midnight, in Active
    let mut state = ScheduleState::new(window, t(23, 0));
    let transitions = walk_day(&mut state);

    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[0], (t(0, 0), Transition::EnteringQuiet));
    assert_eq!(transitions[1], (t(8, 0), Transition::Resuming));
}

#[test]
fn test_wrapping_window_over_two_days() {
    let window = QuietWindow::parse("23:00", "07:00").unwrap();
    let mut state = ScheduleState::new(window, t(12, 0));
    assert_eq!(state.mode(), EngineMode::Active);

    // Day one starts at midnight, inside the wrapped window
    let day_one = walk_day(&mut state);
    assert_eq!(
        day_one,
        vec![
            (t(0, 0), Transition::EnteringQuiet),
            (t(7, 0), Transition::Resuming),
            (t(23, 0), Transition::EnteringQuiet),
        ]
    );

    // Day two continues quiet through midnight without re-announcing
    let day_two = walk_day(&mut state);
    assert_eq!(
        day_two,
        vec![
            (t(7, 0), Transition::Resuming),
            (t(23, 0), Transition::EnteringQuiet),
        ]
    );
}

#[test]
fn test_forced_sleep_holds_through_the_day() {
    let window = QuietWindow::parse("00:00", "08:00").unwrap();
    let mut state = ScheduleState::new(window, t(12, 0));

    assert_eq!(state.force_sleep(), Some(Transition::EnteringQuiet));

    // The clock disagrees all afternoon, yet nothing transitions
    for hour in 13u32..24 {
        assert_eq!(state.evaluate(t(hour, 0)), None);
        assert_eq!(state.mode(), EngineMode::Quiet);
    }

    // Once the quiet window arrives the override is redundant and clears;
    // the normal morning resume then fires
    assert_eq!(state.evaluate(t(1, 0)), None);
    assert_eq!(state.manual_override(), None);
    assert_eq!(state.evaluate(t(8, 30)), Some(Transition::Resuming));
}

#[test]
fn test_forced_wake_suppresses_quiet_window() {
    let window = QuietWindow::parse("00:00", "08:00").unwrap();
    let mut state = ScheduleState::new(window, t(2, 0));
    assert_eq!(state.mode(), EngineMode::Quiet);

    assert_eq!(state.force_wake(), Some(Transition::Resuming));

    // Polls continue through the rest of the night
    for hour in 3u32..8 {
        assert_eq!(state.evaluate(t(hour, 0)), None);
        assert_eq!(state.mode(), EngineMode::Active);
    }

    // Morning arrives, override clears silently, next night is quiet again
    assert_eq!(state.evaluate(t(9, 0)), None);
    assert_eq!(state.manual_override(), None);
    assert_eq!(state.evaluate(t(0, 10)), Some(Transition::EnteringQuiet));
}

#[test]
fn test_repeated_commands_never_reannounce() {
    let window = QuietWindow::parse("00:00", "08:00").unwrap();
    let mut state = ScheduleState::new(window, t(12, 0));

    assert!(state.force_sleep().is_some());
    assert!(state.force_sleep().is_none());
    assert!(state.force_sleep().is_none());

    assert!(state.force_wake().is_some());
    assert!(state.force_wake().is_none());
}
