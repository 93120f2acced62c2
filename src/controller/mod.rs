//! # Controller Module
//!
//! Handset input handling.
//!
//! This module handles:
//! - The canonical [`ControllerSnapshot`] every transport is normalized into
//! - Deadzone filtering per channel category
//! - Tap / long-press classification of raw button samples
//! - The HID joystick transport (the serial transport lives in [`crate::serial`])

use async_trait::async_trait;

pub mod deadzone;
pub mod gesture;
pub mod hid;
pub mod snapshot;

pub use snapshot::{AxisChannel, Axes, ControllerSnapshot, SwitchPosition};

/// A handset transport that yields one snapshot per poll.
///
/// Implementations never propagate transport errors out of `poll`: a failed
/// or malformed read is `None` for that cycle, and a lost device flips
/// [`is_connected`](ControllerSource::is_connected) to false.
#[async_trait]
pub trait ControllerSource: Send {
    /// Reads the handset once.
    async fn poll(&mut self) -> Option<ControllerSnapshot>;

    /// Whether the transport is still usable.
    fn is_connected(&self) -> bool;

    /// Releases the transport handle. Further polls return `None`.
    fn close(&mut self);

    /// Short description for logs.
    fn describe(&self) -> String;
}
