#![forbid(unsafe_code)]

//! Pixel graphics: Sixel and Kitty encoders, the Kitty shared-memory
//! transport, and the decay effect.
//!
//! # Example
//!
//! ```
//! use pixtui_core::terminal_capabilities::GraphicsCapability;
//! use pixtui_graphics::{Encoder, PixelMatrix, Placement, Rgb, TransportConfig};
//!
//! let mut pixels = PixelMatrix::new(4, 4);
//! pixels.set(1, 1, Rgb::new(255, 128, 0));
//!
//! let encoder = Encoder::for_capability(GraphicsCapability::Sixel, &TransportConfig::inline())
//!     .expect("sixel encoder");
//! let region = encoder
//!     .region(2, 10, &pixels, &Placement::new(2, 1), None)
//!     .expect("visible pixels");
//! assert!(region.payload.starts_with(b"\x1bP"));
//! ```

pub mod decay;
pub mod encoder;
pub mod error;
pub mod kitty;
pub mod pixels;
pub mod shm;
pub mod sixel;
pub mod transport;

pub use decay::{DecayEffect, DecayParams};
pub use encoder::{Encoder, GraphicsEncoder, Placement};
pub use error::{GraphicsError, ShmUnavailable};
pub use kitty::KittyEncoder;
pub use pixels::{PixelMatrix, Rgb};
pub use shm::{PosixShm, SharedMemory, ShmHandle};
pub use sixel::SixelEncoder;
pub use transport::{KittyTransport, TransportConfig, TransportInputs};
