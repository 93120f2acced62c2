//! # DUML Frame Decoder
//!
//! Reassembles stick-data frames from the serial byte stream and decodes
//! them into deadzoned axis values.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::Duration;

use super::protocol::*;
use crate::controller::deadzone::Deadzones;
use crate::controller::{AxisChannel, Axes};
use crate::error::{BridgeError, Result};
use crate::serial::port_trait::SerialPortIO;

/// Read one complete frame from the port
///
/// Reads the start byte, then the length header, then exactly the payload
/// the header announces. Each read is bounded by `timeout`.
///
/// # Errors
///
/// Returns error if:
/// - Nothing arrives, or the first byte is not the start byte
/// - The port hangs up (an `UnexpectedEof` I/O error)
/// - The header or payload is cut short
/// - The header announces a length shorter than the header itself
/// - The port reports an I/O error
pub async fn read_frame<P>(port: &mut P, timeout: Duration) -> Result<Bytes>
where
    P: SerialPortIO + ?Sized,
{
    let mut start = [0u8; 1];
    if port.read_timeout(&mut start, timeout).await? == 0 {
        return Err(BridgeError::DumlProtocol("No reply from handset".to_string()));
    }
    if start[0] != DUML_START_BYTE {
        return Err(BridgeError::DumlProtocol(format!(
            "Invalid start byte: 0x{:02X}",
            start[0]
        )));
    }

    let mut header = [0u8; 2];
    let got = port.read_timeout(&mut header, timeout).await?;
    if got < header.len() {
        return Err(BridgeError::DumlProtocol(format!(
            "Header too short: expected 2 bytes, got {}",
            got
        )));
    }

    let length = frame_length(header);
    if length < DUML_HEADER_SIZE {
        return Err(BridgeError::DumlProtocol(format!(
            "Malformed header: frame length {} is shorter than the header",
            length
        )));
    }

    let mut payload = vec![0u8; length - DUML_HEADER_SIZE];
    let got = port.read_timeout(&mut payload, timeout).await?;
    if got < payload.len() {
        return Err(BridgeError::DumlProtocol(format!(
            "Payload too short: expected {} bytes, got {}",
            payload.len(),
            got
        )));
    }

    let mut frame = BytesMut::with_capacity(length);
    frame.put_u8(DUML_START_BYTE);
    frame.put_slice(&header);
    frame.put_slice(&payload);
    Ok(frame.freeze())
}

/// Convert a raw stick value to [-1.0, 1.0]
///
/// `(raw - 1024) / 660`, clamped.
///
/// # Examples
///
/// ```
/// use rc_keybridge::duml::decoder::normalize_stick;
///
/// assert_eq!(normalize_stick(1024), 0.0);
/// assert_eq!(normalize_stick(1684), 1.0);
/// assert_eq!(normalize_stick(0), -1.0);
/// ```
#[must_use]
pub fn normalize_stick(raw: u16) -> f32 {
    ((f32::from(raw) - f32::from(STICK_CENTER)) / STICK_HALF_RANGE).clamp(-1.0, 1.0)
}

fn offset_of(channel: AxisChannel) -> usize {
    match channel {
        AxisChannel::Roll => offsets::ROLL,
        AxisChannel::Pitch => offsets::PITCH,
        AxisChannel::Throttle => offsets::THROTTLE,
        AxisChannel::Yaw => offsets::YAW,
        AxisChannel::Tilt => offsets::TILT,
    }
}

/// Decode the stick values of a complete frame
///
/// # Errors
///
/// Returns error if the frame is not exactly [`DUML_EXPECTED_FRAME_LEN`]
/// bytes or does not begin with the start byte. Any other reply the
/// handset sends ends up here and is discarded.
pub fn decode_sticks(frame: &[u8], deadzones: &Deadzones) -> Result<Axes> {
    if frame.len() != DUML_EXPECTED_FRAME_LEN {
        return Err(BridgeError::DumlProtocol(format!(
            "Unexpected frame length: expected {} bytes, got {}",
            DUML_EXPECTED_FRAME_LEN,
            frame.len()
        )));
    }

    if frame[0] != DUML_START_BYTE {
        return Err(BridgeError::DumlProtocol(format!(
            "Invalid start byte: 0x{:02X}",
            frame[0]
        )));
    }

    Ok(Axes::from_fn(|channel| {
        let mut field = &frame[offset_of(channel)..];
        deadzones.apply(channel, normalize_stick(field.get_u16_le()))
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_millis(100);

    /// Builds a well-formed stick frame with the given raw values
    /// (roll, pitch, throttle, yaw, tilt).
    pub(crate) fn stick_frame(raw: [u16; 5]) -> Vec<u8> {
        let mut frame = vec![0u8; DUML_EXPECTED_FRAME_LEN];
        frame[0] = DUML_START_BYTE;
        let header = (DUML_EXPECTED_FRAME_LEN as u16) | 0x0400;
        frame[1..3].copy_from_slice(&header.to_le_bytes());
        for (offset, value) in [
            offsets::ROLL,
            offsets::PITCH,
            offsets::THROTTLE,
            offsets::YAW,
            offsets::TILT,
        ]
        .into_iter()
        .zip(raw)
        {
            frame[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        }
        frame
    }

    fn no_deadzone() -> Deadzones {
        Deadzones::new(0.0, 0.0)
    }

    #[test]
    fn test_normalize_stick() {
        assert_eq!(normalize_stick(1024), 0.0);
        assert_eq!(normalize_stick(1354), 0.5);
        assert_eq!(normalize_stick(694), -0.5);
        assert_eq!(normalize_stick(1684), 1.0);
        assert_eq!(normalize_stick(364), -1.0);
    }

    #[test]
    fn test_normalize_stick_clamps() {
        assert_eq!(normalize_stick(2000), 1.0);
        assert_eq!(normalize_stick(0), -1.0);
        assert_eq!(normalize_stick(u16::MAX), 1.0);
    }

    #[test]
    fn test_decode_sticks() {
        let frame = stick_frame([1354, 694, 1024, 1684, 364]);
        let axes = decode_sticks(&frame, &no_deadzone()).unwrap();

        assert_eq!(axes.roll, 0.5);
        assert_eq!(axes.pitch, -0.5);
        assert_eq!(axes.throttle, 0.0);
        assert_eq!(axes.yaw, 1.0);
        assert_eq!(axes.tilt, -1.0);
    }

    #[test]
    fn test_decode_sticks_matches_formula() {
        let raw = [1100u16, 900, 1500, 1030, 600];
        let frame = stick_frame(raw);
        let axes = decode_sticks(&frame, &no_deadzone()).unwrap();

        for (channel, value) in AxisChannel::ALL.into_iter().zip(raw) {
            let expected = ((value as f32 - 1024.0) / 660.0).clamp(-1.0, 1.0);
            assert!((axes.get(channel) - expected).abs() < 1e-6, "{:?}", channel);
        }
    }

    #[test]
    fn test_decode_sticks_applies_deadzones() {
        // 0.5 on every channel: passes movement (0.3), fails elevation (0.6)
        let frame = stick_frame([1354; 5]);
        let axes = decode_sticks(&frame, &Deadzones::new(0.3, 0.6)).unwrap();

        assert_eq!(axes.roll, 0.5);
        assert_eq!(axes.pitch, 0.5);
        assert_eq!(axes.yaw, 0.5);
        assert_eq!(axes.throttle, 0.0);
        assert_eq!(axes.tilt, 0.0);
    }

    #[test]
    fn test_decode_sticks_wrong_length() {
        let mut frame = stick_frame([1024; 5]);
        frame.pop();
        assert!(decode_sticks(&frame, &no_deadzone()).is_err());

        let mut frame = stick_frame([1024; 5]);
        frame.push(0);
        assert!(decode_sticks(&frame, &no_deadzone()).is_err());

        assert!(decode_sticks(&[], &no_deadzone()).is_err());
    }

    #[test]
    fn test_decode_sticks_bad_start_byte() {
        let mut frame = stick_frame([1024; 5]);
        frame[0] = 0xAA;
        assert!(decode_sticks(&frame, &no_deadzone()).is_err());
    }

    #[tokio::test]
    async fn test_read_frame_reassembles() {
        let frame = stick_frame([1354, 694, 1024, 1684, 364]);
        let mut port = Builder::new()
            .read(&frame[..1])
            .read(&frame[1..3])
            .read(&frame[3..20])
            .read(&frame[20..])
            .build();

        let read = read_frame(&mut port, TIMEOUT).await.unwrap();
        assert_eq!(&read[..], &frame[..]);
    }

    #[tokio::test]
    async fn test_read_frame_wrong_start_byte() {
        let mut port = Builder::new().read(&[0x00]).build();
        let result = read_frame(&mut port, TIMEOUT).await;
        assert!(matches!(result, Err(BridgeError::DumlProtocol(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_frame_no_reply() {
        let mut port = Builder::new().wait(Duration::from_secs(5)).build();
        let result = read_frame(&mut port, TIMEOUT).await;
        assert!(matches!(result, Err(BridgeError::DumlProtocol(_))));
    }

    #[tokio::test]
    async fn test_read_frame_hung_up_port() {
        let mut port = Builder::new().build();
        match read_frame(&mut port, TIMEOUT).await {
            Err(BridgeError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("Expected EOF, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_frame_short_header() {
        let mut port = Builder::new().read(&[DUML_START_BYTE, 0x26]).build();
        assert!(read_frame(&mut port, TIMEOUT).await.is_err());
    }

    #[tokio::test]
    async fn test_read_frame_truncated_payload() {
        let frame = stick_frame([1024; 5]);
        let mut port = Builder::new().read(&frame[..30]).build();
        assert!(read_frame(&mut port, TIMEOUT).await.is_err());
    }

    #[tokio::test]
    async fn test_read_frame_length_below_header() {
        let mut port = Builder::new().read(&[DUML_START_BYTE, 0x02, 0x00]).build();
        assert!(read_frame(&mut port, TIMEOUT).await.is_err());
    }

    #[tokio::test]
    async fn test_read_frame_returns_other_lengths() {
        // A well-formed but foreign frame is reassembled; rejecting it is decode's job
        let mut port = Builder::new()
            .read(&[DUML_START_BYTE, 0x05, 0x04, 0xAB, 0xCD])
            .build();

        let frame = read_frame(&mut port, TIMEOUT).await.unwrap();
        assert_eq!(frame.len(), 5);
        assert!(decode_sticks(&frame, &no_deadzone()).is_err());
    }

    #[tokio::test]
    async fn test_read_frame_io_error() {
        let mut port = Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::Other, "framing error"))
            .build();
        let result = read_frame(&mut port, TIMEOUT).await;
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }
}
