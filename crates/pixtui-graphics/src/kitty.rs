//! Kitty graphics protocol encoder (`f=24` raw RGB).
//!
//! Two transports:
//!
//! - shared memory: `ESC _G a=T,f=24,t=s,s=W,v=H,S=len,...;base64(name) ESC \`
//! - inline: zlib, base64, then chunks of at most [`CHUNK_SIZE`] bytes. The
//!   first chunk carries the metadata; every chunk carries `m=1` except the
//!   last, which carries `m=0`.
//!
//! A shared-memory failure falls back to inline for that image and disables
//! shared memory for the rest of the encoder's life.
//!
//! Segments stay outstanding until the frame holding them is flushed. The
//! host calls [`KittyEncoder::release_unqueued`] before the flush and
//! [`KittyEncoder::settle`] after it, so a segment whose name never reaches
//! the terminal is unlinked instead of outliving the process.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use pixtui_core::logging;
use pixtui_render::{GraphicsFormat, GraphicsRegion};

use crate::encoder::{GraphicsEncoder, Placement};
use crate::pixels::PixelMatrix;
use crate::shm::{PosixShm, SharedMemory};
use crate::transport::TransportConfig;

/// Maximum base64 bytes per escape packet.
pub const CHUNK_SIZE: usize = 4096;

/// RGB-direct encoder.
#[derive(Debug)]
pub struct KittyEncoder {
    shm: Option<Box<dyn SharedMemory>>,
    shm_enabled: AtomicBool,
    /// Segments written but not yet handed to the terminal:
    /// `(name, base64 name as it appears in the payload)`.
    outstanding: Mutex<Vec<(String, String)>>,
}

impl KittyEncoder {
    /// Inline transport only.
    #[must_use]
    pub fn inline() -> Self {
        Self {
            shm: None,
            shm_enabled: AtomicBool::new(false),
            outstanding: Mutex::new(Vec::new()),
        }
    }

    /// Prefer `shm`, falling back to inline.
    #[must_use]
    pub fn with_shm(shm: Box<dyn SharedMemory>) -> Self {
        Self {
            shm: Some(shm),
            shm_enabled: AtomicBool::new(true),
            outstanding: Mutex::new(Vec::new()),
        }
    }

    /// Build for a resolved transport.
    #[must_use]
    pub fn for_transport(config: &TransportConfig) -> Self {
        if config.uses_shm() {
            Self::with_shm(Box::new(PosixShm::new()))
        } else {
            Self::inline()
        }
    }

    /// True while the shared-memory path is still in use.
    #[must_use]
    pub fn shm_active(&self) -> bool {
        self.shm.is_some() && self.shm_enabled.load(Ordering::Relaxed)
    }

    /// Encode `pixels`; empty or all-black input yields no bytes.
    #[must_use]
    pub fn encode(&self, pixels: &PixelMatrix, placement: &Placement) -> Vec<u8> {
        if pixels.is_black() {
            return Vec::new();
        }
        let rgb = pixels.to_rgb_bytes();

        if let Some(shm) = self.shm.as_deref().filter(|_| self.shm_active()) {
            match shm.write(&rgb) {
                Ok(handle) => {
                    let mut seq = format!(
                        "\x1b_Ga=T,f=24,t=s,s={},v={},S={}",
                        pixels.width(),
                        pixels.height(),
                        handle.len
                    );
                    push_placement(&mut seq, placement);
                    let encoded_name = STANDARD.encode(&handle.name);
                    let _ = write!(seq, ",C=1,q=2;{encoded_name}\x1b\\");
                    self.outstanding().push((handle.name, encoded_name));
                    return seq.into_bytes();
                }
                Err(_err) => {
                    logging::debug!(error = %_err, "shared memory write failed, using inline transport");
                    self.shm_enabled.store(false, Ordering::Relaxed);
                }
            }
        }

        encode_inline(pixels, placement, &rgb)
    }

    /// Number of segments written since the last [`settle`](Self::settle).
    #[must_use]
    pub fn outstanding_segments(&self) -> usize {
        self.outstanding().len()
    }

    /// Unlink every outstanding segment not named by a Kitty region in
    /// `queued`. Returns how many were released.
    pub fn release_unqueued(&self, queued: &[GraphicsRegion]) -> usize {
        let Some(shm) = self.shm.as_deref() else {
            return 0;
        };
        let mut outstanding = self.outstanding();
        let before = outstanding.len();
        outstanding.retain(|(name, encoded_name)| {
            let needle = format!(";{encoded_name}\x1b\\");
            let queued = queued
                .iter()
                .filter(|region| region.format == GraphicsFormat::Kitty)
                .any(|region| contains(&region.payload, needle.as_bytes()));
            if !queued {
                shm.release(name);
            }
            queued
        });
        let released = before - outstanding.len();
        if released > 0 {
            logging::debug!(released, "released segments that were never queued");
        }
        released
    }

    /// Close out a flush. On delivery the terminal owns the outstanding
    /// segments; otherwise they are unlinked. Returns how many were released.
    pub fn settle(&self, delivered: bool) -> usize {
        let mut outstanding = self.outstanding();
        if delivered {
            outstanding.clear();
            return 0;
        }
        let released = outstanding.len();
        if let Some(shm) = self.shm.as_deref() {
            for (name, _) in outstanding.drain(..) {
                shm.release(&name);
            }
        }
        if released > 0 {
            logging::debug!(released, "released segments from a failed flush");
        }
        released
    }

    fn outstanding(&self) -> MutexGuard<'_, Vec<(String, String)>> {
        self.outstanding.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

impl GraphicsEncoder for KittyEncoder {
    fn format(&self) -> GraphicsFormat {
        GraphicsFormat::Kitty
    }

    fn encode(&self, pixels: &PixelMatrix, placement: &Placement) -> Vec<u8> {
        KittyEncoder::encode(self, pixels, placement)
    }
}

fn push_placement(seq: &mut String, placement: &Placement) {
    if let Some(cols) = placement.cols {
        let _ = write!(seq, ",c={cols}");
    }
    if let Some(rows) = placement.rows {
        let _ = write!(seq, ",r={rows}");
    }
}

fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn encode_inline(pixels: &PixelMatrix, placement: &Placement, rgb: &[u8]) -> Vec<u8> {
    let mut metadata = format!("a=T,f=24,s={},v={}", pixels.width(), pixels.height());
    let encoded = match compress(rgb) {
        Ok(z) => {
            metadata.push_str(",o=z");
            STANDARD.encode(z)
        }
        Err(_err) => {
            logging::warn!(error = %_err, "zlib failed, sending uncompressed");
            STANDARD.encode(rgb)
        }
    };
    push_placement(&mut metadata, placement);
    metadata.push_str(",C=1,q=2,");

    let chunks = encoded.len().div_ceil(CHUNK_SIZE);
    let mut out = String::with_capacity(encoded.len() + chunks * 16 + metadata.len());
    // base64 output is ASCII, so byte-chunking keeps every chunk valid UTF-8.
    for (i, chunk) in encoded.as_bytes().chunks(CHUNK_SIZE).enumerate() {
        let meta = if i == 0 { metadata.as_str() } else { "" };
        let more = u8::from(i + 1 < chunks);
        out.push_str("\x1b_G");
        out.push_str(meta);
        let _ = write!(out, "m={more};");
        out.extend(chunk.iter().map(|&b| char::from(b)));
        out.push_str("\x1b\\");
    }
    logging::trace!(bytes = out.len(), chunks, "kitty inline image encoded");
    out.into_bytes()
}
