#![forbid(unsafe_code)]

//! Diff computation between buffers.
//!
//! Row-major scan, so changes come out sorted by `(y, x)` and coalesce into
//! runs without a sort.
//!
//! ```
//! use pixtui_render::buffer::Buffer;
//! use pixtui_render::cell::Cell;
//! use pixtui_render::diff::BufferDiff;
//!
//! let old = Buffer::new(80, 24);
//! let mut new = Buffer::new(80, 24);
//! new.set(5, 5, Cell::from_char('X'));
//! new.set(6, 5, Cell::from_char('Y'));
//!
//! let diff = BufferDiff::compute(&old, &new);
//! assert_eq!(diff.len(), 2);
//! assert_eq!(diff.runs().len(), 1);
//! ```

use crate::buffer::Buffer;

/// A contiguous run of changed cells on a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRun {
    pub y: u16,
    /// Start column (inclusive).
    pub x0: u16,
    /// End column (inclusive).
    pub x1: u16,
}

impl ChangeRun {
    #[inline]
    #[must_use]
    pub const fn new(y: u16, x0: u16, x1: u16) -> Self {
        debug_assert!(x0 <= x1);
        Self { y, x0, x1 }
    }

    /// Number of cells in this run.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u16 {
        self.x1 - self.x0 + 1
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.x1 < self.x0
    }
}

/// Positions `(x, y)` where two buffers differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferDiff {
    changes: Vec<(u16, u16)>,
}

impl BufferDiff {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare two equally sized buffers cell by cell.
    ///
    /// # Panics
    ///
    /// Debug-asserts that both buffers have identical dimensions.
    #[must_use]
    pub fn compute(old: &Buffer, new: &Buffer) -> Self {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("diff_compute", width = old.width(), height = old.height());
        #[cfg(feature = "tracing")]
        let _guard = _span.enter();

        debug_assert_eq!(old.width(), new.width(), "buffer widths must match");
        debug_assert_eq!(old.height(), new.height(), "buffer heights must match");

        let width = new.width();
        let mut changes = Vec::with_capacity(new.len() / 20);
        for (i, (a, b)) in old.cells().iter().zip(new.cells()).enumerate() {
            if a != b {
                let x = (i % width as usize) as u16;
                let y = (i / width as usize) as u16;
                changes.push((x, y));
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(changes = changes.len(), "diff computed");

        Self { changes }
    }

    /// Every position of `buffer`, for an unconditional repaint.
    #[must_use]
    pub fn full(buffer: &Buffer) -> Self {
        let changes = (0..buffer.height())
            .flat_map(|y| (0..buffer.width()).map(move |x| (x, y)))
            .collect();
        Self { changes }
    }

    /// Add every position of the `width` x `height` rectangle at `(x, y)`,
    /// clipped to `bounds`. Keeps the row-major order `runs()` relies on.
    pub fn mark_rect(&mut self, x: u16, y: u16, width: u16, height: u16, bounds: (u16, u16)) {
        let x_end = x.saturating_add(width).min(bounds.0);
        let y_end = y.saturating_add(height).min(bounds.1);
        if x >= x_end || y >= y_end {
            return;
        }
        for row in y..y_end {
            self.changes.extend((x..x_end).map(|col| (col, row)));
        }
        self.changes.sort_unstable_by_key(|&(col, row)| (row, col));
        self.changes.dedup();
    }

    /// Number of changed cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn changes(&self) -> &[(u16, u16)] {
        &self.changes
    }

    /// Coalesce consecutive x positions on the same row into runs.
    #[must_use]
    pub fn runs(&self) -> Vec<ChangeRun> {
        let mut runs: Vec<ChangeRun> = Vec::new();
        for &(x, y) in &self.changes {
            match runs.last_mut() {
                Some(run) if run.y == y && run.x1 + 1 == x => run.x1 = x,
                _ => runs.push(ChangeRun::new(y, x, x)),
            }
        }
        runs
    }
}
