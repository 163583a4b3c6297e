#![forbid(unsafe_code)]

//! Buffer grid storage.
//!
//! # Invariants
//!
//! 1. `cells.len() == width * height`
//! 2. Dimensions never change; a resize builds a new buffer
//! 3. Every [`Cell::CONTINUATION`] follows the head of a wide character

use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, Style};

/// A row-major 2D grid of terminal cells.
///
/// ```
/// use pixtui_render::buffer::Buffer;
/// use pixtui_render::cell::{Cell, Style};
///
/// let mut buffer = Buffer::new(10, 2);
/// buffer.set(0, 0, Cell::from_char('H'));
/// let written = buffer.print(1, 0, "i!", Style::new());
/// assert_eq!(written, 2);
/// assert_eq!(buffer.get(2, 0).map(|c| c.ch), Some('!'));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Buffer {
    /// Create a blank buffer. Zero dimensions give an empty grid.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        self.index(x, y).map(|i| &mut self.cells[i])
    }

    /// Cell at an in-bounds position.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    #[must_use]
    pub fn get_unchecked(&self, x: u16, y: u16) -> &Cell {
        debug_assert!(x < self.width && y < self.height);
        &self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Set the cell at `(x, y)`, maintaining wide-character structure.
    ///
    /// - Out-of-bounds writes are ignored.
    /// - A wide character that does not fit before the right edge is not
    ///   written at all.
    /// - Overwriting any part of an existing wide character blanks the rest
    ///   of it.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        let width = cell.width().max(1);
        if self.index(x, y).is_none() || x as usize + width > self.width as usize {
            return;
        }
        for i in 0..width {
            self.clear_overlap(x + i as u16, y);
        }
        self.set_raw(x, y, cell);
        for i in 1..width {
            self.set_raw(x + i as u16, y, Cell::CONTINUATION);
        }
    }

    /// Set a cell with no wide-character bookkeeping.
    #[inline]
    pub fn set_raw(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = cell;
        }
    }

    /// Blank whatever wide character currently covers `(x, y)`.
    fn clear_overlap(&mut self, x: u16, y: u16) {
        let Some(&current) = self.get(x, y) else {
            return;
        };
        // Walk back to the head of the character covering this column.
        let mut head_x = x;
        if current.is_continuation() {
            while head_x > 0 {
                head_x -= 1;
                if self.get(head_x, y).is_some_and(|c| !c.is_continuation()) {
                    break;
                }
            }
        }
        let Some(&head) = self.get(head_x, y) else {
            return;
        };
        let head_width = head.width();
        if head_width < 2 || head_x as usize + head_width <= x as usize {
            if current.is_continuation() {
                // Orphaned continuation.
                self.set_raw(x, y, Cell::BLANK);
            }
            return;
        }
        for i in 0..head_width {
            self.set_raw(head_x + i as u16, y, Cell::BLANK);
        }
    }

    /// Write `text` starting at `(x, y)` in `style`, clipped at the right
    /// edge. Control and zero-width characters are skipped.
    ///
    /// Returns the number of columns written.
    pub fn print(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        if y >= self.height {
            return 0;
        }
        let mut col = x;
        for ch in text.chars() {
            let Some(w) = ch.width() else { continue };
            if w == 0 {
                continue;
            }
            if col as usize + w > self.width as usize {
                break;
            }
            self.set(col, y, Cell::from_char(ch).with_style(style));
            col += w as u16;
        }
        col - x
    }

    /// Fill every cell with `cell`.
    pub fn fill(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Reset every cell to blank.
    pub fn clear(&mut self) {
        self.fill(Cell::BLANK);
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cells of one row.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[must_use]
    pub fn row_cells(&self, y: u16) -> &[Cell] {
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }
}
