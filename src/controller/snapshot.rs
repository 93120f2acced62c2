//! # Controller Snapshot Module
//!
//! The canonical, transport-independent view of the handset produced by one
//! poll: five deadzoned axes, four raw buttons and two three-position switches.
//!
//! A snapshot is built fresh every cycle and never mutated afterwards; the
//! next poll simply supersedes it.
//!
//! ## Usage
//!
//! ```
//! use rc_keybridge::controller::{AxisChannel, ControllerSnapshot, SwitchPosition};
//!
//! let snapshot = ControllerSnapshot::default();
//! assert_eq!(snapshot.axis(AxisChannel::Pitch), 0.0);
//! assert_eq!(snapshot.sw1, SwitchPosition::Center);
//! assert!(!snapshot.button1);
//! ```

use std::fmt;

use super::deadzone::DeadzoneCategory;

/// Semantic analog channel of the handset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisChannel {
    Roll,
    Pitch,
    Throttle,
    Yaw,
    /// Gimbal wheel.
    Tilt,
}

impl AxisChannel {
    /// All channels in transport order.
    pub const ALL: [AxisChannel; 5] = [
        AxisChannel::Roll,
        AxisChannel::Pitch,
        AxisChannel::Throttle,
        AxisChannel::Yaw,
        AxisChannel::Tilt,
    ];

    /// Deadzone category this channel is filtered with.
    #[must_use]
    pub fn category(self) -> DeadzoneCategory {
        match self {
            AxisChannel::Roll | AxisChannel::Pitch | AxisChannel::Yaw => {
                DeadzoneCategory::Movement
            }
            AxisChannel::Throttle | AxisChannel::Tilt => DeadzoneCategory::Elevation,
        }
    }
}

/// Position of a three-position mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SwitchPosition {
    /// -1: the "high" contact is closed.
    High,
    /// 0: neither contact closed.
    #[default]
    Center,
    /// +1: the "low" contact is closed.
    Low,
}

impl SwitchPosition {
    /// Derives a switch position from its two contacts.
    ///
    /// The high contact is checked first, so it wins if both report pressed.
    #[must_use]
    pub fn from_contacts(high: bool, low: bool) -> Self {
        if high {
            SwitchPosition::High
        } else if low {
            SwitchPosition::Low
        } else {
            SwitchPosition::Center
        }
    }

    /// Numeric form: -1, 0 or 1.
    #[must_use]
    pub fn value(self) -> i8 {
        match self {
            SwitchPosition::High => -1,
            SwitchPosition::Center => 0,
            SwitchPosition::Low => 1,
        }
    }
}

/// The five analog axes, each in [-1.0, 1.0] and already deadzoned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axes {
    pub roll: f32,
    pub pitch: f32,
    pub throttle: f32,
    pub yaw: f32,
    pub tilt: f32,
}

impl Axes {
    /// Reads one channel.
    #[must_use]
    pub fn get(&self, channel: AxisChannel) -> f32 {
        match channel {
            AxisChannel::Roll => self.roll,
            AxisChannel::Pitch => self.pitch,
            AxisChannel::Throttle => self.throttle,
            AxisChannel::Yaw => self.yaw,
            AxisChannel::Tilt => self.tilt,
        }
    }

    /// Builds the axes by evaluating `f` once per channel.
    pub fn from_fn(mut f: impl FnMut(AxisChannel) -> f32) -> Self {
        Self {
            roll: f(AxisChannel::Roll),
            pitch: f(AxisChannel::Pitch),
            throttle: f(AxisChannel::Throttle),
            yaw: f(AxisChannel::Yaw),
            tilt: f(AxisChannel::Tilt),
        }
    }
}

/// One poll's worth of handset state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerSnapshot {
    pub axes: Axes,

    /// C1 button.
    pub button1: bool,
    /// Pause button.
    pub button2: bool,
    /// Shutter / trigger button.
    pub button3: bool,
    /// Start/stop button.
    pub button4: bool,

    /// Camera mode switch.
    pub sw1: SwitchPosition,
    /// Auxiliary switch.
    pub sw2: SwitchPosition,
}

impl ControllerSnapshot {
    /// Snapshot carrying only axes; buttons released and switches centred.
    ///
    /// This is what transports that do not stream buttons produce.
    #[must_use]
    pub fn from_axes(axes: Axes) -> Self {
        Self {
            axes,
            ..Self::default()
        }
    }

    /// Reads one axis channel.
    #[must_use]
    pub fn axis(&self, channel: AxisChannel) -> f32 {
        self.axes.get(channel)
    }
}

impl fmt::Display for ControllerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T: {:+.2} | Y: {:+.2} | P: {:+.2} | R: {:+.2} | Tilt: {:+.2} | \
             B1: {} B2: {} B3: {} B4: {} | SW1: {} SW2: {}",
            self.axes.throttle,
            self.axes.yaw,
            self.axes.pitch,
            self.axes.roll,
            self.axes.tilt,
            u8::from(self.button1),
            u8::from(self.button2),
            u8::from(self.button3),
            u8::from(self.button4),
            self.sw1.value(),
            self.sw2.value(),
        )
    }
}
