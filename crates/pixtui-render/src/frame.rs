#![forbid(unsafe_code)]

//! The per-render-pass drawing surface.
//!
//! A [`Frame`] borrows the renderer's back buffer and graphics queue for one
//! pass of the application's view. Everything drawn into it is shown on the
//! next flush; queued [`GraphicsRegion`]s are consumed by that flush and
//! never carried into the following frame.

use crate::buffer::Buffer;
use crate::cell::{Cell, Style};

/// Pixel graphics wire format of a region's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsFormat {
    /// DEC Sixel `DCS ... ST`.
    Sixel,
    /// Kitty graphics `APC G ... ST`.
    Kitty,
}

/// An encoded image to emit at a cell position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsRegion {
    /// Top row, 0-indexed.
    pub row: u16,
    /// Left column, 0-indexed.
    pub col: u16,
    /// Footprint width in cells.
    pub width: u16,
    /// Footprint height in cells.
    pub height: u16,
    pub format: GraphicsFormat,
    /// Complete escape-sequence bytes, written verbatim.
    pub payload: Vec<u8>,
}

/// Drawing surface for one render pass.
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a mut Buffer,
    graphics: &'a mut Vec<GraphicsRegion>,
}

impl<'a> Frame<'a> {
    /// Wrap a back buffer and graphics queue.
    pub fn new(buffer: &'a mut Buffer, graphics: &'a mut Vec<GraphicsRegion>) -> Self {
        Self { buffer, graphics }
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.buffer.width()
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.buffer.height()
    }

    /// Set one cell.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        self.buffer.set(x, y, cell);
    }

    /// Write text; returns the columns used.
    pub fn print(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        self.buffer.print(x, y, text, style)
    }

    /// Direct access to the back buffer.
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        self.buffer
    }

    #[must_use]
    pub fn buffer(&self) -> &Buffer {
        self.buffer
    }

    /// Queue an image for this frame.
    ///
    /// Regions with an empty payload are dropped.
    pub fn push_graphics(&mut self, region: GraphicsRegion) {
        if !region.payload.is_empty() {
            self.graphics.push(region);
        }
    }

    /// Images queued so far.
    #[must_use]
    pub fn graphics(&self) -> &[GraphicsRegion] {
        self.graphics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(payload: &[u8]) -> GraphicsRegion {
        GraphicsRegion {
            row: 1,
            col: 2,
            width: 3,
            height: 4,
            format: GraphicsFormat::Sixel,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn frame_writes_through_to_buffer() {
        let mut buffer = Buffer::new(8, 2);
        let mut graphics = Vec::new();
        {
            let mut frame = Frame::new(&mut buffer, &mut graphics);
            assert_eq!((frame.width(), frame.height()), (8, 2));
            frame.print(0, 1, "hi", Style::new());
            frame.set(7, 0, Cell::from_char('!'));
        }
        assert_eq!(buffer.get(1, 1).map(|c| c.ch), Some('i'));
        assert_eq!(buffer.get(7, 0).map(|c| c.ch), Some('!'));
    }

    #[test]
    fn empty_payloads_are_not_queued() {
        let mut buffer = Buffer::new(1, 1);
        let mut graphics = Vec::new();
        let mut frame = Frame::new(&mut buffer, &mut graphics);
        frame.push_graphics(region(b""));
        frame.push_graphics(region(b"\x1bPq\x1b\\"));
        assert_eq!(frame.graphics().len(), 1);
    }
}
