#![forbid(unsafe_code)]

//! Double-buffered frame flusher.
//!
//! The renderer owns two equally sized grids: `front` (what the terminal
//! shows) and `back` (what the application is drawing). A flush diffs the
//! two, emits only what changed, and swaps them by reference.
//!
//! # Flush output, in order
//!
//! 1. `CSI ? 2026 h` when synchronized output is enabled
//! 2. a full clear, after a resize or on the first frame
//! 3. each changed run: one cursor move, style deltas, characters. Cells
//!    under last frame's Sixel images count as changed.
//! 4. a delete of last frame's Kitty placements, if any
//! 5. queued images, each positioned at its origin cell
//! 6. `SGR 0`, then `CSI ? 2026 l`
//!
//! All of it goes out in one `write_all`. A flush with nothing to show
//! writes nothing at all.
//!
//! ```
//! use pixtui_render::cell::Style;
//! use pixtui_render::renderer::{Renderer, RendererOptions};
//!
//! let mut renderer = Renderer::new(Vec::new(), 20, 2, RendererOptions::default());
//! renderer.frame().print(0, 0, "hello", Style::new());
//! let first = renderer.flush().unwrap();
//! assert!(first.bytes > 0);
//!
//! renderer.frame().print(0, 0, "hello", Style::new());
//! let second = renderer.flush().unwrap();
//! assert_eq!(second.bytes, 0);
//! ```

use std::io::{self, Write};

use pixtui_core::logging;
use pixtui_core::terminal_capabilities::TerminalCapabilities;

use crate::ansi;
use crate::buffer::Buffer;
use crate::cell::{Cell, Style};
use crate::diff::BufferDiff;
use crate::frame::{Frame, GraphicsFormat, GraphicsRegion};

/// Renderer behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RendererOptions {
    /// Wrap each flush in DEC 2026 synchronized-update brackets.
    pub sync_output: bool,
}

impl RendererOptions {
    #[must_use]
    pub const fn from_capabilities(caps: &TerminalCapabilities) -> Self {
        Self {
            sync_output: caps.sync_output,
        }
    }
}

/// What one flush did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushStats {
    /// Cells rewritten: those that differ from the previous frame plus those
    /// under last frame's Sixel images.
    pub cells_changed: usize,
    /// Changed runs (one cursor move each, at most).
    pub runs: usize,
    /// Images emitted.
    pub graphics: usize,
    /// Bytes written to the output.
    pub bytes: usize,
}

/// Double-buffered renderer writing to `W`.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    options: RendererOptions,
    front: Buffer,
    back: Buffer,
    graphics: Vec<GraphicsRegion>,
    scratch: Vec<u8>,
    /// Next flush repaints everything.
    full_repaint: bool,
    /// Kitty placements from the last flush still on screen.
    kitty_placed: bool,
    /// `(row, col, width, height)` of Sixel images the last flush drew.
    sixel_footprints: Vec<(u16, u16, u16, u16)>,
    /// Last emitted style (None = unknown).
    style: Option<Style>,
    /// Cursor position after the last emitted byte (None = unknown).
    cursor: Option<(u16, u16)>,
}

impl<W: Write> Renderer<W> {
    /// Create a renderer for a `width` x `height` terminal.
    ///
    /// The first flush is a full repaint.
    pub fn new(out: W, width: u16, height: u16, options: RendererOptions) -> Self {
        Self {
            out,
            options,
            front: Buffer::new(width, height),
            back: Buffer::new(width, height),
            graphics: Vec::new(),
            scratch: Vec::with_capacity(16 * 1024),
            full_repaint: true,
            kitty_placed: false,
            sixel_footprints: Vec::new(),
            style: None,
            cursor: None,
        }
    }

    #[must_use]
    pub const fn options(&self) -> RendererOptions {
        self.options
    }

    /// Current grid size.
    #[must_use]
    pub const fn size(&self) -> (u16, u16) {
        (self.back.width(), self.back.height())
    }

    /// The buffer the terminal currently shows.
    #[must_use]
    pub const fn front(&self) -> &Buffer {
        &self.front
    }

    #[must_use]
    pub const fn writer(&self) -> &W {
        &self.out
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Start a render pass: clears the back buffer and the graphics queue.
    pub fn frame(&mut self) -> Frame<'_> {
        self.back.clear();
        self.graphics.clear();
        Frame::new(&mut self.back, &mut self.graphics)
    }

    /// Images queued by the current frame, in emission order.
    #[must_use]
    pub fn queued_graphics(&self) -> &[GraphicsRegion] {
        &self.graphics
    }

    /// Reallocate both grids and schedule a full repaint.
    pub fn resize(&mut self, width: u16, height: u16) {
        logging::debug!(width, height, "renderer resize");
        self.front = Buffer::new(width, height);
        self.back = Buffer::new(width, height);
        self.graphics.clear();
        self.sixel_footprints.clear();
        self.full_repaint = true;
        self.cursor = None;
    }

    /// Force the next flush to repaint every cell.
    pub fn invalidate(&mut self) {
        self.full_repaint = true;
    }

    /// Emit the difference between the shown and the drawn frame.
    ///
    /// # Errors
    ///
    /// Output errors are returned as-is; the terminal state is unknown
    /// afterwards and the next flush repaints from scratch.
    pub fn flush(&mut self) -> io::Result<FlushStats> {
        let span = logging::debug_span!("flush");
        let _guard = span.enter();

        // Sixel pixels stay until text overwrites them. An image with no
        // known footprint could cover anything.
        if self
            .sixel_footprints
            .iter()
            .any(|&(_, _, width, height)| width == 0 || height == 0)
        {
            self.full_repaint = true;
        }
        let diff = if self.full_repaint {
            BufferDiff::full(&self.back)
        } else {
            let mut diff = BufferDiff::compute(&self.front, &self.back);
            let bounds = (self.back.width(), self.back.height());
            for &(row, col, width, height) in &self.sixel_footprints {
                diff.mark_rect(col, row, width, height, bounds);
            }
            diff
        };

        if diff.is_empty() && self.graphics.is_empty() && !self.kitty_placed && !self.full_repaint
        {
            self.sixel_footprints.clear();
            std::mem::swap(&mut self.front, &mut self.back);
            return Ok(FlushStats::default());
        }

        self.scratch.clear();
        if self.options.sync_output {
            self.scratch.extend_from_slice(ansi::SYNC_BEGIN);
        }
        if self.full_repaint {
            ansi::sgr_reset(&mut self.scratch)?;
            ansi::clear_screen(&mut self.scratch)?;
            self.style = Some(Style::RESET);
            self.cursor = Some((0, 0));
        }

        let runs = diff.runs();
        for run in &runs {
            for x in run.x0..=run.x1 {
                let cell = *self.back.get_unchecked(x, run.y);
                self.emit_cell(x, run.y, cell)?;
            }
        }

        let graphics = self.emit_graphics()?;

        ansi::sgr_reset(&mut self.scratch)?;
        self.style = Some(Style::RESET);
        if self.options.sync_output {
            self.scratch.extend_from_slice(ansi::SYNC_END);
        }

        if let Err(err) = self.out.write_all(&self.scratch).and_then(|()| self.out.flush()) {
            self.full_repaint = true;
            self.style = None;
            self.cursor = None;
            return Err(err);
        }

        std::mem::swap(&mut self.front, &mut self.back);
        self.full_repaint = false;

        let stats = FlushStats {
            cells_changed: diff.len(),
            runs: runs.len(),
            graphics,
            bytes: self.scratch.len(),
        };
        logging::trace!(
            cells_changed = stats.cells_changed,
            runs = stats.runs,
            graphics = stats.graphics,
            bytes = stats.bytes,
            "frame flushed"
        );
        Ok(stats)
    }

    fn emit_cell(&mut self, x: u16, y: u16, cell: Cell) -> io::Result<()> {
        if cell.is_continuation() {
            return Ok(());
        }
        self.move_cursor_to(x, y)?;
        self.emit_style(cell.style)?;
        let mut utf8 = [0u8; 4];
        self.scratch
            .extend_from_slice(cell.ch.encode_utf8(&mut utf8).as_bytes());
        self.cursor = Some((x.saturating_add(cell.width() as u16), y));
        Ok(())
    }

    fn move_cursor_to(&mut self, x: u16, y: u16) -> io::Result<()> {
        if self.cursor == Some((x, y)) {
            return Ok(());
        }
        ansi::cup(&mut self.scratch, y, x)?;
        self.cursor = Some((x, y));
        Ok(())
    }

    /// Emit only the style components that differ from the last emitted one.
    fn emit_style(&mut self, new: Style) -> io::Result<()> {
        let current = match self.style {
            Some(style) => style,
            None => {
                ansi::sgr_reset(&mut self.scratch)?;
                Style::RESET
            }
        };
        if current == new {
            self.style = Some(new);
            return Ok(());
        }

        let removed = current.attrs - new.attrs;
        let mut added = new.attrs - current.attrs;
        added |= ansi::sgr_attrs_off(&mut self.scratch, removed, new.attrs)?;
        ansi::sgr_attrs_on(&mut self.scratch, added)?;
        if current.fg != new.fg {
            ansi::sgr_fg(&mut self.scratch, new.fg)?;
        }
        if current.bg != new.bg {
            ansi::sgr_bg(&mut self.scratch, new.bg)?;
        }
        self.style = Some(new);
        Ok(())
    }

    fn emit_graphics(&mut self) -> io::Result<usize> {
        if self.kitty_placed {
            self.scratch.extend_from_slice(ansi::KITTY_DELETE_ALL);
            self.kitty_placed = false;
        }
        self.sixel_footprints.clear();
        let count = self.graphics.len();
        for region in self.graphics.drain(..) {
            ansi::cup(&mut self.scratch, region.row, region.col)?;
            self.scratch.extend_from_slice(&region.payload);
            match region.format {
                GraphicsFormat::Kitty => self.kitty_placed = true,
                GraphicsFormat::Sixel => self.sixel_footprints.push((
                    region.row,
                    region.col,
                    region.width,
                    region.height,
                )),
            }
            // Image output leaves the cursor somewhere terminal-specific.
            self.cursor = None;
        }
        Ok(count)
    }
}
