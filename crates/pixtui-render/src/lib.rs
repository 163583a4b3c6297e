#![forbid(unsafe_code)]

//! Render kernel: cells, buffers, diffs, and the double-buffered flusher.

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod diff;
pub mod frame;
pub mod renderer;

pub use buffer::Buffer;
pub use cell::{Attrs, Cell, Color, Style};
pub use frame::{Frame, GraphicsFormat, GraphicsRegion};
pub use renderer::{FlushStats, Renderer, RendererOptions};
