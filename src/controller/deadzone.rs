//! # Deadzone Module
//!
//! Forces small analog readings to exactly zero so stick drift never turns
//! into a held key.
//!
//! Every channel belongs to one of two categories with independent thresholds:
//!
//! - **Movement**: roll, pitch, yaw
//! - **Elevation**: throttle, gimbal tilt
//!
//! Unlike a flight-controller deadzone the remaining range is *not* rescaled:
//! a value at or above the threshold passes through untouched, because the
//! keyboard side only looks at its sign.
//!
//! ## Usage
//!
//! ```
//! use rc_keybridge::controller::deadzone::{apply_deadzone, Deadzones};
//! use rc_keybridge::controller::AxisChannel;
//!
//! assert_eq!(apply_deadzone(0.2, 0.3), 0.0);
//! assert_eq!(apply_deadzone(0.3, 0.3), 0.3);
//!
//! let dz = Deadzones::new(0.3, 0.6);
//! assert_eq!(dz.apply(AxisChannel::Throttle, 0.5), 0.0);
//! assert_eq!(dz.apply(AxisChannel::Pitch, 0.5), 0.5);
//! ```

use super::AxisChannel;

/// Deadzone category of an axis channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadzoneCategory {
    /// Roll, pitch and yaw.
    Movement,
    /// Throttle and gimbal tilt.
    Elevation,
}

/// Returns `0.0` when `|value| < threshold`, otherwise `value` unchanged.
///
/// The comparison is strict: a value exactly on the threshold is kept.
#[inline]
#[must_use]
pub fn apply_deadzone(value: f32, threshold: f32) -> f32 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

/// Per-category deadzone thresholds, fixed when a controller source is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadzones {
    movement: f32,
    elevation: f32,
}

impl Default for Deadzones {
    fn default() -> Self {
        Self {
            movement: 0.1,
            elevation: 0.1,
        }
    }
}

impl Deadzones {
    /// Creates thresholds for the movement and elevation categories.
    #[must_use]
    pub fn new(movement: f32, elevation: f32) -> Self {
        Self {
            movement,
            elevation,
        }
    }

    /// Returns the threshold for a category.
    #[must_use]
    pub fn threshold(&self, category: DeadzoneCategory) -> f32 {
        match category {
            DeadzoneCategory::Movement => self.movement,
            DeadzoneCategory::Elevation => self.elevation,
        }
    }

    /// Applies the deadzone belonging to `channel`'s category.
    #[must_use]
    pub fn apply(&self, channel: AxisChannel, value: f32) -> f32 {
        apply_deadzone(value, self.threshold(channel.category()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_threshold_is_zero() {
        for v in [0.0, 0.1, -0.1, 0.299, -0.299] {
            assert_eq!(apply_deadzone(v, 0.3), 0.0, "value {} should be deadzoned", v);
        }
    }

    #[test]
    fn test_threshold_boundary_is_kept() {
        assert_eq!(apply_deadzone(0.3, 0.3), 0.3);
        assert_eq!(apply_deadzone(-0.3, 0.3), -0.3);
    }

    #[test]
    fn test_above_threshold_passes_through_unscaled() {
        assert_eq!(apply_deadzone(0.45, 0.3), 0.45);
        assert_eq!(apply_deadzone(-1.0, 0.3), -1.0);
    }

    #[test]
    fn test_values_are_not_clamped() {
        assert_eq!(apply_deadzone(1.7, 0.1), 1.7);
    }

    #[test]
    fn test_zero_threshold_keeps_everything() {
        assert_eq!(apply_deadzone(0.001, 0.0), 0.001);
    }

    #[test]
    fn test_categories_use_independent_thresholds() {
        let dz = Deadzones::new(0.3, 0.6);

        // 0.5 clears the movement threshold but not the elevation one
        assert_eq!(dz.apply(AxisChannel::Roll, 0.5), 0.5);
        assert_eq!(dz.apply(AxisChannel::Pitch, -0.5), -0.5);
        assert_eq!(dz.apply(AxisChannel::Yaw, 0.5), 0.5);
        assert_eq!(dz.apply(AxisChannel::Throttle, 0.5), 0.0);
        assert_eq!(dz.apply(AxisChannel::Tilt, -0.5), 0.0);

        assert_eq!(dz.apply(AxisChannel::Throttle, 0.7), 0.7);
    }

    #[test]
    fn test_threshold_lookup() {
        let dz = Deadzones::new(0.2, 0.4);
        assert_eq!(dz.threshold(DeadzoneCategory::Movement), 0.2);
        assert_eq!(dz.threshold(DeadzoneCategory::Elevation), 0.4);
    }
}
