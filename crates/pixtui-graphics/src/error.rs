//! Error types for pixel graphics.

use thiserror::Error;

/// Errors raised while building pixel data for the encoders.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphicsError {
    /// The byte buffer does not hold `width * height` RGB triples.
    #[error("pixel buffer length {actual} does not match {width}x{height} (expected {expected})")]
    InvalidLength {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
        /// Expected byte or pixel count.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Column-major input with columns of differing heights.
    #[error("column {column} has {actual} pixels, expected {expected}")]
    RaggedColumns {
        /// Index of the first offending column.
        column: usize,
        /// Height of the first column.
        expected: usize,
        /// Height of the offending column.
        actual: usize,
    },
}

/// The shared-memory transport cannot be used.
///
/// Never surfaced past the Kitty encoder: it falls back to the inline path.
#[derive(Debug, Error)]
pub enum ShmUnavailable {
    /// Not supported on this platform.
    #[error("shared memory is not supported on this platform")]
    Unsupported,

    /// Disabled by configuration or an earlier failure.
    #[error("shared memory transport disabled")]
    Disabled,

    /// `shm_open` failed.
    #[error("shm_open {name} failed: {source}")]
    Open {
        /// Segment name.
        name: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Writing the payload into the segment failed.
    #[error("writing shared memory segment {name} failed: {source}")]
    Write {
        /// Segment name.
        name: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
}
