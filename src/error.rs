//! # Error Types
//!
//! Custom error types for RC Keybridge using `thiserror`.

use thiserror::Error;

/// Main error type for RC Keybridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// DUML serial protocol errors (bad start byte, short read, length mismatch)
    #[error("DUML protocol error: {0}")]
    DumlProtocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial ports could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Joystick device errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No joystick device matched
    #[error("No matching joystick device found")]
    ControllerNotFound,

    /// Virtual keyboard errors
    #[error("Keyboard error: {0}")]
    Keyboard(String),
}

/// Result type alias for RC Keybridge
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Linux `EIO`, returned by writes to a tty after a hangup.
pub(crate) const EIO: i32 = 5;

/// Linux `ENODEV`, reported once a USB device has gone away.
pub(crate) const ENODEV: i32 = 19;

/// Whether an I/O error means the device itself is gone rather than one
/// read having failed.
pub(crate) fn is_device_gone(e: &std::io::Error) -> bool {
    matches!(e.raw_os_error(), Some(ENODEV) | Some(EIO))
        || matches!(
            e.kind(),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::BrokenPipe
        )
}
