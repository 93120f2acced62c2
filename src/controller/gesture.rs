//! # Gesture Module
//!
//! Turns the raw per-poll boolean of one button into discrete gestures.
//!
//! | Signal | Kind | Fires |
//! |--------|------|-------|
//! | `short_tap` | edge | on release, if held for less than the long-press threshold |
//! | `long_press` | edge | once per press, on the first sample at or past the threshold |
//! | `maintained_long_press` | level | on every held sample at or past the threshold |
//!
//! Edges are only ever true in the [`GestureEvents`] returned by the call that
//! produced them; the next call starts from a clean slate.
//!
//! ## Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//! use rc_keybridge::controller::gesture::GestureClassifier;
//!
//! let mut button = GestureClassifier::new(Duration::from_secs(1));
//! let t0 = Instant::now();
//!
//! button.update(true, t0);
//! let events = button.update(false, t0 + Duration::from_millis(200));
//! assert!(events.short_tap);
//! assert!(!events.long_press);
//! ```

use std::time::{Duration, Instant};

/// Default hold duration after which a press becomes a long press.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(1000);

/// Gestures produced by a single classification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureEvents {
    /// Released before the long-press threshold (edge).
    pub short_tap: bool,
    /// Crossed the long-press threshold on this sample (edge).
    pub long_press: bool,
    /// Held at or past the long-press threshold (level).
    pub maintained_long_press: bool,
}

/// Press state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Idle,
    Down {
        since: Instant,
        long_press_fired: bool,
    },
}

/// Gesture state machine for one logical button.
///
/// Owned by whoever polls the button; one instance per button.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    threshold: Duration,
    state: PressState,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_LONG_PRESS)
    }
}

impl GestureClassifier {
    /// Creates a classifier with the given long-press threshold.
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            state: PressState::Idle,
        }
    }

    /// Feeds one sample taken at `now` and returns the gestures it produced.
    pub fn update(&mut self, pressed: bool, now: Instant) -> GestureEvents {
        let mut events = GestureEvents::default();

        self.state = match (self.state, pressed) {
            (PressState::Idle, false) => PressState::Idle,
            (PressState::Idle, true) => PressState::Down {
                since: now,
                long_press_fired: false,
            },
            (
                PressState::Down {
                    since,
                    long_press_fired,
                },
                true,
            ) => {
                let held_long = now.saturating_duration_since(since) >= self.threshold;
                events.maintained_long_press = held_long;
                events.long_press = held_long && !long_press_fired;
                PressState::Down {
                    since,
                    long_press_fired: long_press_fired || held_long,
                }
            }
            (PressState::Down { since, .. }, false) => {
                events.short_tap = now.saturating_duration_since(since) < self.threshold;
                PressState::Idle
            }
        };

        events
    }

    #[cfg(test)]
    fn is_down(&self) -> bool {
        matches!(self.state, PressState::Down { .. })
    }

    /// Forgets any press in progress.
    pub fn reset(&mut self) {
        self.state = PressState::Idle;
    }
}
