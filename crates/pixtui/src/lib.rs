#![forbid(unsafe_code)]

//! pixtui public facade crate.
//!
//! Re-exports the input, render, and graphics layers and adds [`Driver`],
//! which ties them into one host loop:
//!
//! 1. [`Driver::next_event`] polls the decoder and normalizes key actions
//! 2. the application updates its model
//! 3. [`Driver::render`] runs the view against a fresh frame and flushes

use std::fmt;

pub mod driver;

// --- Core re-exports -------------------------------------------------------

pub use pixtui_core::capability_override::CapabilityOverride;
pub use pixtui_core::event::{
    Event, Key, KeyAction, KeyEvent, MediaKey, ModifierKey, Modifiers, MouseAction, MouseButton,
    MouseEvent,
};
pub use pixtui_core::input::{ByteSource, InputDecoder, KeyboardProtocol, ScriptedSource};
pub use pixtui_core::key_state::{ActionFilter, KeyStateTracker, TrackerMode};
pub use pixtui_core::terminal_capabilities::{GraphicsCapability, TerminalCapabilities};
#[cfg(unix)]
pub use pixtui_core::terminal_session::{SessionOptions, TerminalSession};

// --- Render re-exports -----------------------------------------------------

pub use pixtui_render::diff::BufferDiff;
pub use pixtui_render::{
    Attrs, Buffer, Cell, Color, FlushStats, Frame, GraphicsFormat, GraphicsRegion, Renderer,
    RendererOptions, Style,
};

// --- Graphics re-exports ---------------------------------------------------

pub use pixtui_graphics::{
    DecayEffect, DecayParams, Encoder, GraphicsEncoder, GraphicsError, PixelMatrix, Placement,
    Rgb, TransportConfig,
};

pub use driver::Driver;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for pixtui apps.
#[derive(Debug)]
pub enum Error {
    /// I/O failure during terminal operations.
    Io(std::io::Error),
    /// Pixel data could not be built.
    Graphics(GraphicsError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Graphics(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Graphics(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<GraphicsError> for Error {
    fn from(err: GraphicsError) -> Self {
        Self::Graphics(err)
    }
}

/// Standard result type for pixtui APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Session -------------------------------------------------------------

/// Open the controlling terminal and build a [`Driver`] for it.
///
/// The graphics encoder and Kitty transport are resolved here, once.
/// Keep the returned session alive while the driver is in use; dropping it
/// restores the terminal.
#[cfg(unix)]
pub fn open(
    options: SessionOptions,
) -> Result<(
    TerminalSession,
    Driver<pixtui_core::input::TtySource, std::fs::File>,
)> {
    let (session, decoder) = TerminalSession::open(options)?;
    let caps = *session.capabilities();
    let (width, height) = session.size();
    let renderer = Renderer::new(
        session.writer()?,
        width,
        height,
        RendererOptions::from_capabilities(&caps),
    );
    let transport = if caps.graphics == GraphicsCapability::Kitty {
        TransportConfig::from_env()
    } else {
        TransportConfig::inline()
    };
    let encoder = Encoder::for_capability(caps.graphics, &transport);
    Ok((session, Driver::new(decoder, renderer).with_encoder(encoder)))
}

// --- Logging ---------------------------------------------------------------

pub mod logging {
    //! Log output setup.

    /// Install the JSON subscriber (filtered by `RUST_LOG`, written to
    /// stderr). Returns `false` if one was already installed.
    #[cfg(feature = "tracing-json")]
    pub fn init() -> bool {
        pixtui_core::logging::init_json_subscriber()
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ActionFilter, Color, Driver, Encoder, Error, Event, Frame, Key, KeyAction, KeyEvent,
        Modifiers, PixelMatrix, Placement, Result, Rgb, Style,
    };

    pub use crate::{core, graphics, render};
}

pub use pixtui_core as core;
pub use pixtui_graphics as graphics;
pub use pixtui_render as render;
