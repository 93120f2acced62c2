//! # Serial Communication Module
//!
//! Handles the USB serial link to a DJI RC-N1 handset.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Putting the handset into simulator mode once after opening
//! - Requesting and decoding one stick frame per poll
//! - Detecting a handset that has been unplugged

pub mod port_trait;

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::controller::deadzone::Deadzones;
use crate::controller::{Axes, ControllerSnapshot, ControllerSource};
use crate::duml::protocol::{ENABLE_SIMULATOR_CMD, STICK_REQUEST_CMD};
use crate::duml::{decode_sticks, read_frame};
use crate::error::{is_device_gone, BridgeError, Result};
use port_trait::SerialPortIO;

/// Fallback device paths tried after the configured one
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (the RC-N1 enumerates as one)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Open a specific serial port
///
/// # Errors
///
/// Returns [`BridgeError::Serial`] if the device cannot be opened.
pub fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))
}

/// Open the first serial port that works
///
/// `preferred` is tried first, then the usual USB serial paths.
///
/// # Returns
///
/// The opened stream and the path it was opened from.
///
/// # Errors
///
/// Returns [`BridgeError::SerialPortNotFound`] listing every path tried.
pub fn open_with_paths(preferred: &str, baud_rate: u32) -> Result<(SerialStream, String)> {
    let mut paths = vec![preferred];
    paths.extend(DEFAULT_DEVICE_PATHS.iter().copied().filter(|p| *p != preferred));

    for path in &paths {
        debug!("Trying to open serial port: {}", path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("Opened serial port {} at {} baud", path, baud_rate);
                return Ok((port, path.to_string()));
            }
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        }
    }

    Err(BridgeError::SerialPortNotFound(paths.join(", ")))
}

/// Consecutive end-of-file reads after which the handset counts as unplugged
const MAX_HANGUPS: u32 = 3;

/// Controller source for handsets reached over DUML serial (RC-N1).
///
/// The RC-N1 reports sticks only; the snapshot's buttons and switches stay
/// released.
pub struct SerialSource<P: SerialPortIO = SerialStream> {
    port: Option<P>,
    device_path: String,
    deadzones: Deadzones,
    timeout: Duration,
    connected: bool,
    hangups: u32,
}

impl<P: SerialPortIO> std::fmt::Debug for SerialSource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSource")
            .field("device_path", &self.device_path)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl<P: SerialPortIO> SerialSource<P> {
    /// Wraps an opened port and enables simulator mode on the handset.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Serial`] if the enable command cannot be written.
    pub async fn new(
        mut port: P,
        device_path: impl Into<String>,
        deadzones: Deadzones,
        timeout: Duration,
    ) -> Result<Self> {
        let device_path = device_path.into();

        port.write_all(&ENABLE_SIMULATOR_CMD)
            .await
            .map_err(|e| BridgeError::Serial(format!("Failed to enable simulator mode: {}", e)))?;
        port.flush()
            .await
            .map_err(|e| BridgeError::Serial(format!("Failed to flush serial port: {}", e)))?;

        info!("Simulator mode enabled on {}", device_path);

        Ok(Self {
            port: Some(port),
            device_path,
            deadzones,
            timeout,
            connected: true,
            hangups: 0,
        })
    }

    /// Path of the serial device.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    async fn exchange(port: &mut P, timeout: Duration, deadzones: &Deadzones) -> Result<Axes> {
        port.write_all(&STICK_REQUEST_CMD).await?;
        port.flush().await?;

        let frame = read_frame(port, timeout).await?;
        decode_sticks(&frame, deadzones)
    }
}

#[async_trait]
impl<P: SerialPortIO> ControllerSource for SerialSource<P> {
    async fn poll(&mut self) -> Option<ControllerSnapshot> {
        let port = self.port.as_mut()?;

        let result = Self::exchange(port, self.timeout, &self.deadzones).await;
        let hung_up = matches!(
            &result,
            Err(BridgeError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof
        );
        self.hangups = if hung_up { self.hangups + 1 } else { 0 };

        match result {
            Ok(axes) => Some(ControllerSnapshot::from_axes(axes)),
            Err(BridgeError::Io(e)) if is_device_gone(&e) => {
                warn!("Serial handset disconnected: {}", e);
                self.connected = false;
                None
            }
            Err(_) if self.hangups >= MAX_HANGUPS => {
                warn!("Serial handset hung up ({} empty reads in a row)", self.hangups);
                self.connected = false;
                None
            }
            Err(e) => {
                debug!("Serial poll failed: {}", e);
                None
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected && self.port.is_some()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.device_path);
        }
        self.connected = false;
    }

    fn describe(&self) -> String {
        format!("DUML serial handset at {}", self.device_path)
    }
}
