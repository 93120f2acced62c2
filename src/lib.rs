//! # RC Keybridge Library
//!
//! Drive keyboard-only drone software with a real DJI remote controller.
//!
//! This library reads a handset (DJI RC3 as a USB joystick, or DJI RC-N1
//! over its DUML serial link), normalizes it into a [`ControllerSnapshot`],
//! and translates each snapshot into debounced key presses on a virtual
//! keyboard. Timed macros can override the live sticks. The [`monitor`]
//! prints snapshots instead, for checking a handset without a keyboard.
//!
//! [`ControllerSnapshot`]: controller::ControllerSnapshot

pub mod bridge;
pub mod config;
pub mod controller;
pub mod duml;
pub mod error;
pub mod keyboard;
pub mod monitor;
pub mod sequence;
pub mod serial;
