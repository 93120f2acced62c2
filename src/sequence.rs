//! # Sequence Engine
//!
//! Timed macros layered over live controller input.
//!
//! A [`Sequence`] is an ordered list of [`SequenceStep`]s, each holding a set
//! of [`Overrides`] for a fixed duration. While a sequence plays, the
//! orchestrator merges the current step's overrides over the live snapshot:
//! axes named in the step replace the stick value, every other axis passes
//! through unchanged.
//!
//! Steps are timed against the instant each one was *due* to start, not the
//! instant the engine noticed, so poll jitter does not accumulate over a
//! long macro.
//!
//! # Examples
//!
//! ```
//! use rc_keybridge::keyboard::KeyAxis;
//! use rc_keybridge::sequence::{cross_and_turn, SequenceEngine};
//! use std::time::{Duration, Instant};
//!
//! let start = Instant::now();
//! let mut engine = SequenceEngine::new();
//! engine.start(cross_and_turn(), start);
//!
//! let (overrides, active) = engine.update(start + Duration::from_millis(500));
//! assert!(active);
//! assert_eq!(overrides.axis(KeyAxis::Pitch), Some(1.0));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::keyboard::{KeyAction, KeyAxis};

/// Axis values and one-shot actions forced by a sequence step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    axes: BTreeMap<KeyAxis, f32>,
    actions: BTreeSet<KeyAction>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces `axis` to `value`.
    #[must_use]
    pub fn with_axis(mut self, axis: KeyAxis, value: f32) -> Self {
        self.axes.insert(axis, value);
        self
    }

    /// Requests `action`.
    #[must_use]
    pub fn with_action(mut self, action: KeyAction) -> Self {
        self.actions.insert(action);
        self
    }

    /// The forced value of `axis`, if any.
    pub fn axis(&self, axis: KeyAxis) -> Option<f32> {
        self.axes.get(&axis).copied()
    }

    /// The forced value of `axis`, or `live` when the step leaves it alone.
    pub fn axis_or(&self, axis: KeyAxis, live: f32) -> f32 {
        self.axis(axis).unwrap_or(live)
    }

    pub fn actions(&self) -> impl Iterator<Item = KeyAction> + '_ {
        self.actions.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() && self.actions.is_empty()
    }
}

/// One timed step of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStep {
    pub duration: Duration,
    pub overrides: Overrides,
}

impl SequenceStep {
    /// Step lasting `seconds`.
    ///
    /// # Panics
    ///
    /// Panics if `seconds` is negative or not finite.
    pub fn new(seconds: f32, overrides: Overrides) -> Self {
        Self {
            duration: Duration::from_secs_f32(seconds),
            overrides,
        }
    }
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub name: String,
    pub steps: Vec<SequenceStep>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, steps: Vec<SequenceStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Sum of all step durations.
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|step| step.duration).sum()
    }
}

/// Built-in macro: fly forward, pause, then turn in place.
pub fn cross_and_turn() -> Sequence {
    Sequence::new(
        "cross and turn",
        vec![
            SequenceStep::new(
                3.0,
                Overrides::new()
                    .with_axis(KeyAxis::Pitch, 1.0)
                    .with_axis(KeyAxis::Yaw, 0.0),
            ),
            SequenceStep::new(1.0, Overrides::new().with_action(KeyAction::Pause)),
            SequenceStep::new(
                8.0,
                Overrides::new()
                    .with_axis(KeyAxis::Pitch, 0.0)
                    .with_axis(KeyAxis::Yaw, 1.0),
            ),
        ],
    )
}

#[derive(Debug)]
struct Playback {
    sequence: Sequence,
    step: usize,
    step_started: Instant,
}

/// Plays at most one [`Sequence`] at a time.
#[derive(Debug, Default)]
pub struct SequenceEngine {
    playback: Option<Playback>,
}

impl SequenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins playback at step 0, replacing any sequence already playing.
    pub fn start(&mut self, sequence: Sequence, now: Instant) {
        if let Some(previous) = &self.playback {
            debug!("Sequence \"{}\" replaced", previous.sequence.name);
        }
        info!(
            "Starting sequence \"{}\" ({} steps, {:.1}s)",
            sequence.name,
            sequence.steps.len(),
            sequence.total_duration().as_secs_f32()
        );

        self.playback = Some(Playback {
            sequence,
            step: 0,
            step_started: now,
        });
    }

    /// Advances playback to `now`.
    ///
    /// Returns the overrides of the step in force at `now` and whether a
    /// sequence is still playing. Once the last step has run out the
    /// overrides are empty and the flag is false.
    pub fn update(&mut self, now: Instant) -> (Overrides, bool) {
        let Some(playback) = self.playback.as_mut() else {
            return (Overrides::default(), false);
        };

        while let Some(step) = playback.sequence.steps.get(playback.step) {
            if now.saturating_duration_since(playback.step_started) < step.duration {
                return (step.overrides.clone(), true);
            }
            playback.step_started += step.duration;
            playback.step += 1;
            debug!("Sequence \"{}\" at step {}", playback.sequence.name, playback.step);
        }

        info!("Sequence \"{}\" finished", playback.sequence.name);
        self.playback = None;
        (Overrides::default(), false)
    }

    /// Ends playback immediately.
    pub fn stop(&mut self) {
        if let Some(playback) = self.playback.take() {
            info!("Sequence \"{}\" stopped", playback.sequence.name);
        }
    }

    pub fn is_active(&self) -> bool {
        self.playback.is_some()
    }

    /// Index of the step currently playing.
    pub fn current_step(&self) -> Option<usize> {
        self.playback.as_ref().map(|playback| playback.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    fn three_steps() -> Sequence {
        Sequence::new(
            "three",
            vec![
                SequenceStep::new(3.0, Overrides::new().with_axis(KeyAxis::Pitch, 1.0)),
                SequenceStep::new(1.0, Overrides::new().with_action(KeyAction::Pause)),
                SequenceStep::new(8.0, Overrides::new().with_axis(KeyAxis::Yaw, 1.0)),
            ],
        )
    }

    #[test]
    fn test_idle_engine_has_no_overrides() {
        let mut engine = SequenceEngine::new();
        let (overrides, active) = engine.update(Instant::now());
        assert!(!active);
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_three_step_timeline() {
        let t0 = Instant::now();
        let mut engine = SequenceEngine::new();
        engine.start(three_steps(), t0);

        let (overrides, active) = engine.update(t0 + secs(0.1));
        assert!(active);
        assert_eq!(overrides.axis(KeyAxis::Pitch), Some(1.0));

        let (overrides, active) = engine.update(t0 + secs(3.5));
        assert!(active);
        assert_eq!(overrides.actions().collect::<Vec<_>>(), vec![KeyAction::Pause]);
        assert_eq!(overrides.axis(KeyAxis::Pitch), None);
        assert_eq!(engine.current_step(), Some(1));

        let (overrides, active) = engine.update(t0 + secs(4.5));
        assert!(active);
        assert_eq!(overrides.axis(KeyAxis::Yaw), Some(1.0));

        let (overrides, active) = engine.update(t0 + secs(12.1));
        assert!(!active);
        assert!(overrides.is_empty());
        assert!(!engine.is_active());
    }

    #[test]
    fn test_single_late_update_skips_whole_steps() {
        let t0 = Instant::now();
        let mut engine = SequenceEngine::new();
        engine.start(three_steps(), t0);

        // No updates during steps 1 and 2
        let (overrides, active) = engine.update(t0 + secs(5.0));
        assert!(active);
        assert_eq!(engine.current_step(), Some(2));
        assert_eq!(overrides.axis(KeyAxis::Yaw), Some(1.0));
    }

    #[test]
    fn test_step_timing_does_not_drift() {
        let t0 = Instant::now();
        let mut engine = SequenceEngine::new();
        engine.start(three_steps(), t0);

        // Step 1 noticed late, at 3.9s; step 2 still ends at 4.0s
        engine.update(t0 + secs(3.9));
        assert_eq!(engine.current_step(), Some(1));
        engine.update(t0 + secs(4.05));
        assert_eq!(engine.current_step(), Some(2));
    }

    #[test]
    fn test_stop_ends_playback() {
        let t0 = Instant::now();
        let mut engine = SequenceEngine::new();
        engine.start(three_steps(), t0);
        engine.stop();

        let (overrides, active) = engine.update(t0 + secs(0.5));
        assert!(!active);
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_start_replaces_running_sequence() {
        let t0 = Instant::now();
        let mut engine = SequenceEngine::new();
        engine.start(three_steps(), t0);
        engine.update(t0 + secs(3.5));

        let t1 = t0 + secs(3.6);
        engine.start(cross_and_turn(), t1);
        assert_eq!(engine.current_step(), Some(0));

        let (overrides, active) = engine.update(t1 + secs(0.1));
        assert!(active);
        assert_eq!(overrides.axis(KeyAxis::Yaw), Some(0.0));
    }

    #[test]
    fn test_empty_sequence_finishes_immediately() {
        let t0 = Instant::now();
        let mut engine = SequenceEngine::new();
        engine.start(Sequence::new("empty", Vec::new()), t0);

        let (_, active) = engine.update(t0);
        assert!(!active);
    }

    #[test]
    fn test_axis_or_passes_live_values_through() {
        let overrides = Overrides::new().with_axis(KeyAxis::Pitch, 0.0);

        assert_eq!(overrides.axis_or(KeyAxis::Pitch, 0.8), 0.0);
        assert_eq!(overrides.axis_or(KeyAxis::Roll, -0.4), -0.4);
    }

    #[test]
    fn test_cross_and_turn_layout() {
        let seq = cross_and_turn();
        let durations: Vec<f32> = seq.steps.iter().map(|s| s.duration.as_secs_f32()).collect();

        assert_eq!(durations, vec![3.0, 1.0, 8.0]);
        assert_eq!(seq.total_duration(), Duration::from_secs(12));
        assert!(seq.steps[1].overrides.actions().any(|a| a == KeyAction::Pause));
        assert_eq!(seq.steps[2].overrides.axis(KeyAxis::Yaw), Some(1.0));
    }
}
