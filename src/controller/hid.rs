//! # HID Joystick Module
//!
//! Reads a DJI RC3 (or any handset that enumerates as a USB joystick) through
//! the Linux evdev interface and turns it into [`ControllerSnapshot`]s.
//!
//! ## Index Layout
//!
//! The device is addressed by index, the way joystick APIs number their
//! controls: axes in ascending `ABS_*` order (hats excluded), buttons in
//! ascending `BTN_*` order starting at `BTN_JOYSTICK`, followed by the
//! `BTN_MISC` block.
//!
//! | Control | Index | Snapshot field |
//! |---------|-------|----------------|
//! | Axis 0 | right stick X | roll |
//! | Axis 1 | right stick Y | pitch |
//! | Axis 2 | left stick Y | throttle |
//! | Axis 3 | left stick X | yaw |
//! | Axis 4 | gimbal wheel | tilt |
//! | Button 0 | C1 | button1 |
//! | Button 2 | pause | button2 |
//! | Button 3 | shutter | button3 |
//! | Button 1 | start/stop | button4 |
//! | Buttons 7 / 6 | mode switch high / low | sw1 |
//! | Buttons 5 / 4 | aux switch high / low | sw2 |

use async_trait::async_trait;
use evdev::{AbsoluteAxisType, Device, Key};
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use super::deadzone::Deadzones;
use super::{AxisChannel, Axes, ControllerSnapshot, ControllerSource, SwitchPosition};
use crate::error::{is_device_gone, BridgeError, Result};

/// First joystick button code (`BTN_JOYSTICK`).
const BTN_JOYSTICK: u16 = 0x120;

/// First miscellaneous button code (`BTN_MISC`).
const BTN_MISC: u16 = 0x100;

/// One past the last gamepad/joystick button code (`BTN_DIGI`).
const BTN_DIGI: u16 = 0x140;

/// Index-addressed joystick, as exposed by the HID driver.
///
/// [`refresh`](JoystickDevice::refresh) samples the device; `axis` and
/// `button` then read that sample. Indices past the end read as released.
#[cfg_attr(test, mockall::automock)]
pub trait JoystickDevice: Send {
    /// Samples the current state of every control.
    fn refresh(&mut self) -> io::Result<()>;

    /// Normalized axis value in [-1.0, 1.0].
    fn axis(&self, index: usize) -> f32;

    /// Whether the button is held.
    fn button(&self, index: usize) -> bool;

    /// Human-readable device name.
    fn name(&self) -> String;
}

/// Maps joystick indices onto snapshot fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidLayout {
    pub roll_axis: usize,
    pub pitch_axis: usize,
    pub throttle_axis: usize,
    pub yaw_axis: usize,
    pub tilt_axis: usize,
    pub button1: usize,
    pub button2: usize,
    pub button3: usize,
    pub button4: usize,
    /// (high, low) contacts of the mode switch.
    pub sw1: (usize, usize),
    /// (high, low) contacts of the aux switch.
    pub sw2: (usize, usize),
}

impl Default for HidLayout {
    /// DJI RC3 layout.
    fn default() -> Self {
        Self {
            roll_axis: 0,
            pitch_axis: 1,
            throttle_axis: 2,
            yaw_axis: 3,
            tilt_axis: 4,
            button1: 0,
            button2: 2,
            button3: 3,
            button4: 1,
            sw1: (7, 6),
            sw2: (5, 4),
        }
    }
}

impl HidLayout {
    fn axis_index(&self, channel: AxisChannel) -> usize {
        match channel {
            AxisChannel::Roll => self.roll_axis,
            AxisChannel::Pitch => self.pitch_axis,
            AxisChannel::Throttle => self.throttle_axis,
            AxisChannel::Yaw => self.yaw_axis,
            AxisChannel::Tilt => self.tilt_axis,
        }
    }
}

/// Joystick read through evdev state queries.
///
/// Uses the kernel's current absolute-axis and key state rather than the
/// event queue, so a poll never blocks and never falls behind.
pub struct EvdevJoystick {
    device: Device,
    device_path: String,
    axes: Vec<AbsoluteAxisType>,
    buttons: Vec<Key>,
    axis_values: Vec<f32>,
    button_values: Vec<bool>,
}

impl std::fmt::Debug for EvdevJoystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevJoystick")
            .field("device_path", &self.device_path)
            .field("axes", &self.axes.len())
            .field("buttons", &self.buttons.len())
            .finish_non_exhaustive()
    }
}

impl EvdevJoystick {
    /// Detect and open the first joystick whose name contains `name_filter`
    ///
    /// An empty filter matches any joystick. Devices are tried in path order
    /// so the choice is stable when several joysticks are connected.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no joystick matched
    /// - `Controller`: `/dev/input` missing or unreadable
    pub fn open(name_filter: &str) -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(BridgeError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| BridgeError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                BridgeError::Controller(format!("Failed to read directory entry: {}", e))
            })?;

        entries.sort_by_key(|entry| entry.path());

        let filter = name_filter.to_lowercase();

        for entry in entries {
            let path = entry.path();

            match path.file_name() {
                Some(filename) if filename.to_string_lossy().starts_with("event") => {}
                _ => continue,
            }

            let device = match Device::open(&path) {
                Ok(device) => device,
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                    continue;
                }
            };

            if !is_joystick(&device) {
                continue;
            }

            let name = device.name().unwrap_or_default().to_string();
            if !filter.is_empty() && !name.to_lowercase().contains(&filter) {
                debug!("Skipping joystick {} at {}", name, path.display());
                continue;
            }

            let device_path = path.to_string_lossy().to_string();
            info!("Found joystick \"{}\" at {}", name, device_path);
            return Ok(Self::from_device(device, device_path));
        }

        Err(BridgeError::ControllerNotFound)
    }

    fn from_device(device: Device, device_path: String) -> Self {
        let axes: Vec<AbsoluteAxisType> = device
            .supported_absolute_axes()
            .map(|set| set.iter().filter(|axis| !is_hat(*axis)).collect())
            .unwrap_or_default();

        let mut buttons: Vec<Key> = device
            .supported_keys()
            .map(|set| {
                set.iter()
                    .filter(|key| (BTN_MISC..BTN_DIGI).contains(&key.code()))
                    .collect()
            })
            .unwrap_or_default();
        // Joystick block first, then BTN_MISC block
        buttons.sort_by_key(|key| (key.code() < BTN_JOYSTICK, key.code()));

        let axis_values = vec![0.0; axes.len()];
        let button_values = vec![false; buttons.len()];

        Self {
            device,
            device_path,
            axes,
            buttons,
            axis_values,
            button_values,
        }
    }

    /// Get the `/dev/input/eventX` path of this joystick
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl JoystickDevice for EvdevJoystick {
    fn refresh(&mut self) -> io::Result<()> {
        let abs = self.device.get_abs_state()?;
        for (value, axis) in self.axis_values.iter_mut().zip(&self.axes) {
            let info = abs[axis.0 as usize];
            *value = normalize_abs(info.value, info.minimum, info.maximum);
        }

        let keys = self.device.get_key_state()?;
        for (value, key) in self.button_values.iter_mut().zip(&self.buttons) {
            *value = keys.contains(*key);
        }

        Ok(())
    }

    fn axis(&self, index: usize) -> f32 {
        self.axis_values.get(index).copied().unwrap_or(0.0)
    }

    fn button(&self, index: usize) -> bool {
        self.button_values.get(index).copied().unwrap_or(false)
    }

    fn name(&self) -> String {
        self.device.name().unwrap_or("unknown joystick").to_string()
    }
}

fn is_hat(axis: AbsoluteAxisType) -> bool {
    (AbsoluteAxisType::ABS_HAT0X.0..=AbsoluteAxisType::ABS_HAT3Y.0).contains(&axis.0)
}

fn is_joystick(device: &Device) -> bool {
    let has_sticks = device.supported_absolute_axes().map_or(false, |axes| {
        axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y)
    });
    let has_buttons = device.supported_keys().map_or(false, |keys| {
        keys.iter()
            .any(|key| (BTN_JOYSTICK..BTN_DIGI).contains(&key.code()))
    });
    has_sticks && has_buttons
}

/// Maps a raw absolute value in `[min, max]` onto [-1.0, 1.0].
#[must_use]
pub fn normalize_abs(value: i32, min: i32, max: i32) -> f32 {
    if max <= min {
        return 0.0;
    }
    let span = (max - min) as f32;
    (((value - min) as f32 / span) * 2.0 - 1.0).clamp(-1.0, 1.0)
}

/// Controller source for handsets exposed as a HID joystick.
pub struct HidSource<D: JoystickDevice = EvdevJoystick> {
    device: Option<D>,
    deadzones: Deadzones,
    layout: HidLayout,
    connected: bool,
}

impl<D: JoystickDevice> HidSource<D> {
    /// Wraps an opened joystick.
    pub fn new(device: D, deadzones: Deadzones, layout: HidLayout) -> Self {
        Self {
            device: Some(device),
            deadzones,
            layout,
            connected: true,
        }
    }

    fn read_snapshot(device: &D, deadzones: &Deadzones, layout: &HidLayout) -> ControllerSnapshot {
        let axes = Axes::from_fn(|channel| {
            deadzones.apply(channel, device.axis(layout.axis_index(channel)))
        });

        ControllerSnapshot {
            axes,
            button1: device.button(layout.button1),
            button2: device.button(layout.button2),
            button3: device.button(layout.button3),
            button4: device.button(layout.button4),
            sw1: SwitchPosition::from_contacts(
                device.button(layout.sw1.0),
                device.button(layout.sw1.1),
            ),
            sw2: SwitchPosition::from_contacts(
                device.button(layout.sw2.0),
                device.button(layout.sw2.1),
            ),
        }
    }
}

#[async_trait]
impl<D: JoystickDevice> ControllerSource for HidSource<D> {
    async fn poll(&mut self) -> Option<ControllerSnapshot> {
        let device = self.device.as_mut()?;

        if let Err(e) = device.refresh() {
            if is_device_gone(&e) {
                warn!("Joystick disconnected: {}", e);
                self.connected = false;
            } else {
                debug!("Joystick poll failed: {}", e);
            }
            return None;
        }

        Some(Self::read_snapshot(device, &self.deadzones, &self.layout))
    }

    fn is_connected(&self) -> bool {
        self.connected && self.device.is_some()
    }

    fn close(&mut self) {
        if let Some(device) = self.device.take() {
            info!("Closed joystick {}", device.name());
        }
        self.connected = false;
    }

    fn describe(&self) -> String {
        match &self.device {
            Some(device) => format!("HID joystick \"{}\"", device.name()),
            None => "HID joystick (closed)".to_string(),
        }
    }
}
