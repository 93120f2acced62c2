//! # Key Emitter
//!
//! Edge-triggered key emission.
//!
//! The emitter remembers what it has asserted on the sink and only forwards
//! changes, so a stick held at full deflection produces one press, not one
//! per poll. [`KeyEmitter::cleanup`] releases everything still held and must
//! run on every exit path.

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::keys::{KeyAxis, VirtualKey};
use super::sink::KeySink;

/// Debounced key emitter over a [`KeySink`].
#[derive(Debug)]
pub struct KeyEmitter<S: KeySink> {
    sink: S,
    active: BTreeMap<VirtualKey, bool>,
    print_events: bool,
}

impl<S: KeySink> KeyEmitter<S> {
    /// Creates an emitter with every key released.
    ///
    /// With `print_events` set, each press and release is logged at `info`.
    pub fn new(sink: S, print_events: bool) -> Self {
        Self {
            sink,
            active: BTreeMap::new(),
            print_events,
        }
    }

    fn log_event(&self, tag: &str, key: VirtualKey) {
        if self.print_events {
            info!("[{}] {}", tag, key);
        } else {
            debug!("[{}] {}", tag, key);
        }
    }

    fn send(&mut self, key: VirtualKey, pressed: bool) -> bool {
        let result = if pressed {
            self.sink.press(key)
        } else {
            self.sink.release(key)
        };

        match result {
            Ok(()) => {
                self.log_event(if pressed { "PRESS" } else { "RELEASE" }, key);
                true
            }
            Err(e) => {
                warn!("Key {} not {}: {}", key, if pressed { "pressed" } else { "released" }, e);
                false
            }
        }
    }

    /// Drives `key` to `desired`, emitting only on change.
    ///
    /// Returns whether an event reached the sink. A sink failure leaves the
    /// recorded state untouched so the next call retries.
    pub fn set_key_state(&mut self, key: VirtualKey, desired: bool) -> bool {
        if self.is_pressed(key) == desired {
            return false;
        }

        let sent = self.send(key, desired);
        if sent {
            self.active.insert(key, desired);
        }
        sent
    }

    /// Maps the sign of `value` onto a pair of opposing keys.
    ///
    /// The key being released is always released before its opposite is
    /// pressed, so the two are never held together.
    pub fn handle_axis(&mut self, value: f32, positive: VirtualKey, negative: VirtualKey) {
        if value > 0.0 {
            self.set_key_state(negative, false);
            self.set_key_state(positive, true);
        } else if value < 0.0 {
            self.set_key_state(positive, false);
            self.set_key_state(negative, true);
        } else {
            self.set_key_state(positive, false);
            self.set_key_state(negative, false);
        }
    }

    /// [`handle_axis`](Self::handle_axis) with the axis's own key bindings.
    pub fn handle_key_axis(&mut self, axis: KeyAxis, value: f32) {
        let (positive, negative) = axis.keys();
        self.handle_axis(value, positive, negative);
    }

    /// Presses `key`, waits `hold`, then releases it, whatever its recorded
    /// state. The key is recorded as released afterwards.
    pub async fn tap(&mut self, key: VirtualKey, hold: Duration) {
        self.send(key, true);
        tokio::time::sleep(hold).await;
        if self.send(key, false) {
            self.active.insert(key, false);
        }
    }

    /// Releases every key recorded as pressed, once each.
    ///
    /// Returns the number of keys released.
    pub fn cleanup(&mut self) -> usize {
        let held: Vec<VirtualKey> = self.pressed_keys();
        let mut released = 0;

        for key in held {
            // Recorded as released even if the sink fails; the sink is gone
            // at this point and retrying cannot help.
            self.send(key, false);
            self.active.insert(key, false);
            released += 1;
        }

        if released > 0 {
            debug!("Released {} held key(s)", released);
        }
        released
    }

    /// Whether `key` is recorded as pressed.
    #[must_use]
    pub fn is_pressed(&self, key: VirtualKey) -> bool {
        self.active.get(&key).copied().unwrap_or(false)
    }

    /// Keys currently recorded as pressed, in key order.
    #[must_use]
    pub fn pressed_keys(&self) -> Vec<VirtualKey> {
        self.active
            .iter()
            .filter_map(|(key, pressed)| pressed.then_some(*key))
            .collect()
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
