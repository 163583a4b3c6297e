#![forbid(unsafe_code)]

//! Core: terminal session lifecycle, capability detection, and input decoding.
//!
//! Everything that touches the terminal's input side lives here. Decoding is
//! split into two pure byte-to-event functions (legacy and extended keyboard
//! protocols) that converge on one [`event::Event`] shape, so downstream code
//! never needs to know which protocol the terminal speaks.

pub mod capability_override;
pub mod caps_probe;
pub mod event;
pub mod input;
pub mod key_state;
pub mod logging;
pub mod terminal_capabilities;
#[cfg(unix)]
pub mod terminal_session;
