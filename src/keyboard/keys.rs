//! # Key Bindings
//!
//! The symbolic keys the bridge can assert, and how drone axes and one-shot
//! actions map onto them.
//!
//! | Axis | Positive | Negative |
//! |------|----------|----------|
//! | Pitch | `w` | `s` |
//! | Roll | `d` | `a` |
//! | Yaw | `e` | `q` |
//! | Throttle | `c` | `z` |
//! | Camera pitch | `Down` | `Up` |
//! | Camera yaw | `Right` | `Left` |

use evdev::Key;
use std::fmt;

/// A key on the virtual keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VirtualKey {
    W,
    A,
    S,
    D,
    Q,
    E,
    C,
    Z,
    F,
    T,
    Num1,
    Num2,
    Num3,
    Up,
    Down,
    Left,
    Right,
    Space,
}

impl VirtualKey {
    /// Every key the virtual keyboard advertises.
    pub const ALL: [VirtualKey; 18] = [
        VirtualKey::W,
        VirtualKey::A,
        VirtualKey::S,
        VirtualKey::D,
        VirtualKey::Q,
        VirtualKey::E,
        VirtualKey::C,
        VirtualKey::Z,
        VirtualKey::F,
        VirtualKey::T,
        VirtualKey::Num1,
        VirtualKey::Num2,
        VirtualKey::Num3,
        VirtualKey::Up,
        VirtualKey::Down,
        VirtualKey::Left,
        VirtualKey::Right,
        VirtualKey::Space,
    ];

    /// Linux input key code.
    #[must_use]
    pub fn evdev_key(self) -> Key {
        match self {
            VirtualKey::W => Key::KEY_W,
            VirtualKey::A => Key::KEY_A,
            VirtualKey::S => Key::KEY_S,
            VirtualKey::D => Key::KEY_D,
            VirtualKey::Q => Key::KEY_Q,
            VirtualKey::E => Key::KEY_E,
            VirtualKey::C => Key::KEY_C,
            VirtualKey::Z => Key::KEY_Z,
            VirtualKey::F => Key::KEY_F,
            VirtualKey::T => Key::KEY_T,
            VirtualKey::Num1 => Key::KEY_1,
            VirtualKey::Num2 => Key::KEY_2,
            VirtualKey::Num3 => Key::KEY_3,
            VirtualKey::Up => Key::KEY_UP,
            VirtualKey::Down => Key::KEY_DOWN,
            VirtualKey::Left => Key::KEY_LEFT,
            VirtualKey::Right => Key::KEY_RIGHT,
            VirtualKey::Space => Key::KEY_SPACE,
        }
    }

    /// Name used in event logs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            VirtualKey::W => "w",
            VirtualKey::A => "a",
            VirtualKey::S => "s",
            VirtualKey::D => "d",
            VirtualKey::Q => "q",
            VirtualKey::E => "e",
            VirtualKey::C => "c",
            VirtualKey::Z => "z",
            VirtualKey::F => "f",
            VirtualKey::T => "t",
            VirtualKey::Num1 => "1",
            VirtualKey::Num2 => "2",
            VirtualKey::Num3 => "3",
            VirtualKey::Up => "Up",
            VirtualKey::Down => "Down",
            VirtualKey::Left => "Left",
            VirtualKey::Right => "Right",
            VirtualKey::Space => "Space",
        }
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A continuous control driven as a pair of opposing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyAxis {
    Pitch,
    Roll,
    Yaw,
    Throttle,
    CameraPitch,
    CameraYaw,
}

impl KeyAxis {
    /// (positive, negative) keys for this axis.
    #[must_use]
    pub fn keys(self) -> (VirtualKey, VirtualKey) {
        match self {
            KeyAxis::Pitch => (VirtualKey::W, VirtualKey::S),
            KeyAxis::Roll => (VirtualKey::D, VirtualKey::A),
            KeyAxis::Yaw => (VirtualKey::E, VirtualKey::Q),
            KeyAxis::Throttle => (VirtualKey::C, VirtualKey::Z),
            KeyAxis::CameraPitch => (VirtualKey::Down, VirtualKey::Up),
            KeyAxis::CameraYaw => (VirtualKey::Right, VirtualKey::Left),
        }
    }
}

/// A one-shot command sent as a key tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyAction {
    CameraWide,
    CameraZoom,
    CameraIr,
    Picture,
    Annotation,
    Pause,
}

impl KeyAction {
    #[must_use]
    pub fn key(self) -> VirtualKey {
        match self {
            KeyAction::CameraWide => VirtualKey::Num1,
            KeyAction::CameraZoom => VirtualKey::Num2,
            KeyAction::CameraIr => VirtualKey::Num3,
            KeyAction::Picture => VirtualKey::F,
            KeyAction::Annotation => VirtualKey::T,
            KeyAction::Pause => VirtualKey::Space,
        }
    }
}
