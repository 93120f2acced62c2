//! # Keyboard Module
//!
//! Virtual keyboard output.
//!
//! This module handles:
//! - Symbolic keys and the axis/action key bindings
//! - Key-injection sinks (uinput, or a dry run that only logs)
//! - Debounced, edge-triggered emission with guaranteed release on exit

pub mod emitter;
pub mod keys;
pub mod sink;

pub use emitter::KeyEmitter;
pub use keys::{KeyAction, KeyAxis, VirtualKey};
pub use sink::{DryRunSink, KeySink, UinputKeyboard};
