//! # DUML Module
//!
//! Wire format of the DJI RC-N1 serial link.
//!
//! The handset answers each [`protocol::STICK_REQUEST_CMD`] with a frame
//! carrying five little-endian stick values. This module knows the framing
//! and the offsets; opening and driving the port lives in [`crate::serial`].

pub mod decoder;
pub mod protocol;

pub use decoder::{decode_sticks, normalize_stick, read_frame};
