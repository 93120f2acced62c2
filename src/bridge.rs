//! # Bridge
//!
//! The polling loop that turns controller snapshots into key events.
//!
//! Each tick, in order:
//!
//! 1. Poll the [`ControllerSource`]; a failed poll skips the tick.
//! 2. Classify button gestures. A C1 tap is an emergency pause and ends
//!    the tick early.
//! 3. A long press on the shutter toggles the built-in macro, unless a
//!    cruise or turn latch is holding the sticks.
//! 4. Advance the [`SequenceEngine`]. While nothing plays, start/stop
//!    gestures set or clear the cruise and turn latches.
//! 5. Resolve each axis: latch, else sequence override, else live value.
//! 6. Tap one-shot keys (camera mode, sequence actions, annotation, picture).
//! 7. Drive the axis keys through the [`KeyEmitter`].
//!
//! ## Button Roles
//!
//! | Button | Tap | Long press |
//! |--------|-----|------------|
//! | button1 (C1) | emergency pause | held: modifier for forward cruise |
//! | button2 (pause) | annotation | |
//! | button3 (shutter) | picture | toggle macro |
//! | button4 (start/stop) | clear cruise, else toggle turn hold | free cruise |
//!
//! ## Shutdown
//!
//! [`Bridge::shutdown`] stops the sequence, releases every held key, then
//! closes the source, once. It runs when the loop ends for any reason and
//! again from `Drop`, so a panic unwinding through the bridge still
//! releases the keys.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::controller::gesture::{GestureClassifier, GestureEvents, DEFAULT_LONG_PRESS};
use crate::controller::{ControllerSnapshot, ControllerSource, SwitchPosition};
use crate::keyboard::{KeyAction, KeyAxis, KeyEmitter, KeySink};
use crate::sequence::{cross_and_turn, Sequence, SequenceEngine};

/// Timing parameters of the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeSettings {
    /// Time between polls.
    pub poll_interval: Duration,
    /// Hold time after which a press is a long press.
    pub long_press: Duration,
    /// How long a one-shot key is held.
    pub tap_hold: Duration,
    /// How long the emergency pause blocks the loop.
    pub emergency_pause: Duration,
}

impl BridgeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            long_press: config.long_press(),
            tap_hold: Duration::from_millis(config.keyboard.tap_ms),
            emergency_pause: Duration::from_millis(config.keyboard.emergency_pause_ms),
        }
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            long_press: DEFAULT_LONG_PRESS,
            tap_hold: Duration::from_millis(80),
            emergency_pause: Duration::from_secs(3),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A snapshot was read and applied.
    Processed,
    /// The poll failed; nothing changed.
    Skipped,
    /// C1 was tapped; keys were released and the loop paused.
    EmergencyPause,
    /// The source is gone.
    Disconnected,
}

/// Why [`Bridge::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop signal (Ctrl+C) arrived.
    Interrupted,
    /// The controller was lost.
    Disconnected,
}

#[derive(Debug, Clone)]
struct ButtonClassifiers {
    button1: GestureClassifier,
    button2: GestureClassifier,
    button3: GestureClassifier,
    button4: GestureClassifier,
}

#[derive(Debug, Clone, Copy, Default)]
struct ButtonGestures {
    button1: GestureEvents,
    button2: GestureEvents,
    button3: GestureEvents,
    button4: GestureEvents,
}

impl ButtonClassifiers {
    fn new(long_press: Duration) -> Self {
        Self {
            button1: GestureClassifier::new(long_press),
            button2: GestureClassifier::new(long_press),
            button3: GestureClassifier::new(long_press),
            button4: GestureClassifier::new(long_press),
        }
    }

    fn reset(&mut self) {
        self.button1.reset();
        self.button2.reset();
        self.button3.reset();
        self.button4.reset();
    }

    fn update(&mut self, snapshot: &ControllerSnapshot, now: Instant) -> ButtonGestures {
        ButtonGestures {
            button1: self.button1.update(snapshot.button1, now),
            button2: self.button2.update(snapshot.button2, now),
            button3: self.button3.update(snapshot.button3, now),
            button4: self.button4.update(snapshot.button4, now),
        }
    }
}

/// Frozen stick values that replace live input until cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Latches {
    /// (pitch, roll)
    cruise: Option<(f32, f32)>,
    yaw: Option<f32>,
}

impl Latches {
    fn any(&self) -> bool {
        self.cruise.is_some() || self.yaw.is_some()
    }
}

/// Camera key selected by the mode switch.
fn camera_action(position: SwitchPosition) -> KeyAction {
    match position {
        SwitchPosition::Low => KeyAction::CameraWide,
        SwitchPosition::Center => KeyAction::CameraZoom,
        SwitchPosition::High => KeyAction::CameraIr,
    }
}

/// Resolves on Ctrl+C. Never resolves if the signal cannot be watched.
pub(crate) async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Controller-to-keyboard orchestrator.
pub struct Bridge<C: ControllerSource, S: KeySink> {
    source: C,
    emitter: KeyEmitter<S>,
    sequences: SequenceEngine,
    macro_sequence: Sequence,
    buttons: ButtonClassifiers,
    latches: Latches,
    last_camera: Option<SwitchPosition>,
    last_step: Option<usize>,
    settings: BridgeSettings,
    shut_down: bool,
}

impl<C: ControllerSource, S: KeySink> Bridge<C, S> {
    /// Creates a bridge with the built-in "cross and turn" macro.
    pub fn new(source: C, emitter: KeyEmitter<S>, settings: BridgeSettings) -> Self {
        Self {
            source,
            emitter,
            sequences: SequenceEngine::new(),
            macro_sequence: cross_and_turn(),
            buttons: ButtonClassifiers::new(settings.long_press),
            latches: Latches::default(),
            last_camera: None,
            last_step: None,
            settings,
            shut_down: false,
        }
    }

    /// Replaces the macro toggled by a shutter long press.
    #[must_use]
    pub fn with_macro(mut self, sequence: Sequence) -> Self {
        self.macro_sequence = sequence;
        self
    }

    /// Runs until Ctrl+C or until the controller disconnects, then shuts
    /// down.
    pub async fn run(&mut self) -> StopReason {
        self.run_until(interrupted()).await
    }

    /// Runs until `stop` completes or the controller disconnects, then
    /// shuts down.
    ///
    /// A tick in progress always completes before `stop` is noticed.
    pub async fn run_until<F>(&mut self, stop: F) -> StopReason
    where
        F: Future<Output = ()>,
    {
        info!(
            "Bridging {} at {:.0}Hz",
            self.source.describe(),
            1.0 / self.settings.poll_interval.as_secs_f64()
        );

        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(stop);

        let reason = loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("Stop requested, shutting down...");
                    break StopReason::Interrupted;
                }

                instant = ticker.tick() => {
                    if self.tick(instant.into_std()).await == TickOutcome::Disconnected {
                        error!("[!!!] CONTROLLER DISCONNECTED [!!!]");
                        break StopReason::Disconnected;
                    }
                }
            }
        };

        self.shutdown();
        reason
    }

    /// Polls the source once and applies the snapshot.
    pub async fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.source.is_connected() {
            return TickOutcome::Disconnected;
        }

        match self.source.poll().await {
            Some(snapshot) => {
                trace!("{}", snapshot);
                self.process(snapshot, now).await
            }
            None if !self.source.is_connected() => TickOutcome::Disconnected,
            None => TickOutcome::Skipped,
        }
    }

    /// Applies one snapshot sampled at `now`.
    pub async fn process(&mut self, snapshot: ControllerSnapshot, now: Instant) -> TickOutcome {
        let gestures = self.buttons.update(&snapshot, now);

        if gestures.button1.short_tap {
            self.emergency_pause().await;
            return TickOutcome::EmergencyPause;
        }

        if gestures.button3.long_press && !self.latches.any() {
            if self.sequences.is_active() {
                self.sequences.stop();
            } else {
                self.sequences.start(self.macro_sequence.clone(), now);
            }
        }

        let (overrides, running) = self.sequences.update(now);

        if !running {
            self.update_latches(&gestures, &snapshot);
        }

        let live = snapshot.axes;
        let (pitch, roll) = match self.latches.cruise {
            Some(frozen) => frozen,
            None => (
                overrides.axis_or(KeyAxis::Pitch, live.pitch),
                overrides.axis_or(KeyAxis::Roll, live.roll),
            ),
        };
        let yaw = self
            .latches
            .yaw
            .unwrap_or_else(|| overrides.axis_or(KeyAxis::Yaw, live.yaw));

        if self.last_camera != Some(snapshot.sw1) {
            self.tap(camera_action(snapshot.sw1)).await;
            self.last_camera = Some(snapshot.sw1);
        }

        // Sequence actions fire once when their step begins
        let step = self.sequences.current_step();
        if step.is_some() && step != self.last_step {
            for action in overrides.actions() {
                self.tap(action).await;
            }
        }
        self.last_step = step;

        if gestures.button2.short_tap {
            self.tap(KeyAction::Annotation).await;
        }
        if gestures.button3.short_tap {
            self.tap(KeyAction::Picture).await;
        }

        self.emitter.handle_key_axis(KeyAxis::Pitch, pitch);
        self.emitter.handle_key_axis(KeyAxis::Roll, roll);
        self.emitter.handle_key_axis(KeyAxis::Yaw, yaw);

        // Camera yaw follows the drone only in wide mode
        let wide_yaw = if self.last_camera == Some(SwitchPosition::Low) {
            yaw
        } else {
            0.0
        };
        let camera_yaw = overrides.axis_or(KeyAxis::CameraYaw, wide_yaw);
        self.emitter.handle_key_axis(KeyAxis::CameraYaw, camera_yaw);

        let throttle = overrides.axis_or(KeyAxis::Throttle, live.throttle);
        let tilt = overrides.axis_or(KeyAxis::CameraPitch, live.tilt);
        self.emitter.handle_key_axis(KeyAxis::Throttle, throttle);
        self.emitter.handle_key_axis(KeyAxis::CameraPitch, tilt);

        TickOutcome::Processed
    }

    fn update_latches(&mut self, gestures: &ButtonGestures, snapshot: &ControllerSnapshot) {
        let axes = snapshot.axes;
        let start_stop = gestures.button4;

        if start_stop.short_tap {
            if self.latches.cruise.take().is_some() {
                info!(">>> CRUISE DISABLED <<<");
            } else if self.latches.yaw.take().is_some() {
                info!(">>> TURN HOLD DISABLED <<<");
            } else if axes.yaw != 0.0 {
                info!(">>> TURN HOLD ENABLED (yaw {:+.2}) <<<", axes.yaw);
                self.latches.yaw = Some(axes.yaw);
            }
        }

        if gestures.button1.maintained_long_press && start_stop.short_tap {
            info!(">>> FORWARD CRUISE ENABLED <<<");
            self.latches.cruise = Some((1.0, 0.0));
        }

        if start_stop.long_press {
            if axes.pitch != 0.0 || axes.roll != 0.0 {
                info!(
                    ">>> FREE CRUISE ENABLED (pitch {:+.2}, roll {:+.2}) <<<",
                    axes.pitch, axes.roll
                );
                self.latches.cruise = Some((axes.pitch, axes.roll));
            } else {
                info!("Free cruise needs pitch or roll input to hold");
            }
        }
    }

    async fn emergency_pause(&mut self) {
        warn!(
            ">>> EMERGENCY PAUSE for {:.1}s <<<",
            self.settings.emergency_pause.as_secs_f32()
        );

        self.sequences.stop();
        self.emitter.cleanup();
        self.latches = Latches::default();
        self.last_step = None;

        tokio::time::sleep(self.settings.emergency_pause).await;
        // Presses that straddle the pause start over
        self.buttons.reset();
        info!(">>> EMERGENCY PAUSE finished <<<");
    }

    async fn tap(&mut self, action: KeyAction) {
        debug!("Tap {:?}", action);
        self.emitter.tap(action.key(), self.settings.tap_hold).await;
    }

    /// Starts `sequence` now, replacing any sequence already playing.
    pub fn start_sequence(&mut self, sequence: Sequence, now: Instant) {
        self.sequences.start(sequence, now);
    }

    /// Stops playback, releases all keys, then closes the source.
    ///
    /// Only the first call has any effect.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.sequences.stop();
        let released = self.emitter.cleanup();
        self.source.close();

        info!("Shutdown complete, released {} key(s)", released);
    }

    pub fn emitter(&self) -> &KeyEmitter<S> {
        &self.emitter
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn is_sequence_active(&self) -> bool {
        self.sequences.is_active()
    }

    /// Frozen (pitch, roll) while cruise is on.
    pub fn cruise(&self) -> Option<(f32, f32)> {
        self.latches.cruise
    }

    /// Frozen yaw while turn hold is on.
    pub fn turn_hold(&self) -> Option<f32> {
        self.latches.yaw
    }
}

impl<C: ControllerSource, S: KeySink> Drop for Bridge<C, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
