//! Key-injection backends.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent};
use tracing::info;

use super::keys::VirtualKey;
use crate::error::{BridgeError, Result};

/// Name the virtual keyboard registers under.
pub const VIRTUAL_KEYBOARD_NAME: &str = "rc-keybridge virtual keyboard";

/// Receives press/release calls for symbolic keys.
pub trait KeySink: Send {
    /// Asserts `key`.
    fn press(&mut self, key: VirtualKey) -> Result<()>;

    /// Deasserts `key`.
    fn release(&mut self, key: VirtualKey) -> Result<()>;
}

/// OS-level keyboard created through `/dev/uinput`.
///
/// Requires write access to `/dev/uinput` (the `input` group on most
/// distributions).
pub struct UinputKeyboard {
    device: VirtualDevice,
}

impl std::fmt::Debug for UinputKeyboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputKeyboard").finish_non_exhaustive()
    }
}

impl UinputKeyboard {
    /// Creates the virtual keyboard, advertising every [`VirtualKey`].
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Keyboard`] if uinput is unavailable or the
    /// device cannot be registered.
    pub fn new(name: &str) -> Result<Self> {
        let create_err = |e: std::io::Error| {
            BridgeError::Keyboard(format!("Failed to create virtual keyboard: {}", e))
        };

        let mut keys = AttributeSet::<evdev::Key>::new();
        for key in VirtualKey::ALL {
            keys.insert(key.evdev_key());
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(create_err)?
            .name(name)
            .with_keys(&keys)
            .map_err(create_err)?
            .build()
            .map_err(create_err)?;

        info!("Created virtual keyboard \"{}\"", name);
        Ok(Self { device })
    }

    fn emit(&mut self, key: VirtualKey, value: i32) -> Result<()> {
        // emit() appends the SYN_REPORT
        let event = InputEvent::new(EventType::KEY, key.evdev_key().code(), value);
        self.device
            .emit(&[event])
            .map_err(|e| BridgeError::Keyboard(format!("Failed to emit {}: {}", key, e)))
    }
}

impl KeySink for UinputKeyboard {
    fn press(&mut self, key: VirtualKey) -> Result<()> {
        self.emit(key, 1)
    }

    fn release(&mut self, key: VirtualKey) -> Result<()> {
        self.emit(key, 0)
    }
}

/// Sink that injects nothing; the emitter's event log is the only output.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunSink;

impl KeySink for DryRunSink {
    fn press(&mut self, _key: VirtualKey) -> Result<()> {
        Ok(())
    }

    fn release(&mut self, _key: VirtualKey) -> Result<()> {
        Ok(())
    }
}

impl<S: KeySink + ?Sized> KeySink for Box<S> {
    fn press(&mut self, key: VirtualKey) -> Result<()> {
        (**self).press(key)
    }

    fn release(&mut self, key: VirtualKey) -> Result<()> {
        (**self).release(key)
    }
}
