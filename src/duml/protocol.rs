//! # DUML Protocol Constants
//!
//! Frame layout and fixed commands for the DJI RC-N1 serial link.
//!
//! ```text
//! +------+-----------------+---------------------------+
//! | 0x55 | len/flags (LE)  | payload (len - 3 bytes)   |
//! +------+-----------------+---------------------------+
//!   1B          2B           low 10 bits of len/flags
//!                            = total frame length
//! ```

/// Start-of-frame byte
pub const DUML_START_BYTE: u8 = 0x55;

/// Start byte plus the 16-bit length/flags field
pub const DUML_HEADER_SIZE: usize = 3;

/// Bits of the length/flags field that carry the total frame length
pub const DUML_LENGTH_MASK: u16 = 0x03FF;

/// Total length of a stick-data reply on the known RC-N1 firmware
pub const DUML_EXPECTED_FRAME_LEN: usize = 38;

/// Enables simulator mode on the handset; sent once after opening the port
pub const ENABLE_SIMULATOR_CMD: [u8; 14] = [
    0x55, 0x0e, 0x04, 0x66, 0x0a, 0x06, 0xeb, 0x34, 0x40, 0x06, 0x24, 0x01, 0x94, 0x36,
];

/// Requests one stick-data frame; sent before every read
pub const STICK_REQUEST_CMD: [u8; 13] = [
    0x55, 0x0d, 0x04, 0x33, 0x0a, 0x06, 0xeb, 0x34, 0x40, 0x06, 0x01, 0x74, 0x24,
];

/// Raw stick value at rest
pub const STICK_CENTER: u16 = 1024;

/// Raw distance from centre to full deflection (range ~364..1684)
pub const STICK_HALF_RANGE: f32 = 660.0;

/// Byte offsets of the little-endian 16-bit stick values within a frame
pub mod offsets {
    /// Right stick X
    pub const ROLL: usize = 13;
    /// Right stick Y
    pub const PITCH: usize = 16;
    /// Left stick Y
    pub const THROTTLE: usize = 19;
    /// Left stick X
    pub const YAW: usize = 22;
    /// Gimbal wheel
    pub const TILT: usize = 25;
}

/// Total frame length encoded in a length/flags header.
#[inline]
#[must_use]
pub fn frame_length(header: [u8; 2]) -> usize {
    (u16::from_le_bytes(header) & DUML_LENGTH_MASK) as usize
}
