//! DEC Sixel encoder.
//!
//! Output shape:
//!
//! ```text
//! ESC P 0;1;0 q "1;1;W;H  #0;2;r;g;b ...  #0<sixels>$#1<sixels>- ... ESC \
//! ```
//!
//! Each sixel character is `0x3F + bits`, where bit `i` marks the pixel `i`
//! rows below the band top as painted in the active color. Black is the
//! background and never gets a palette slot.

use std::collections::HashMap;

use crate::encoder::{GraphicsEncoder, Placement};
use crate::pixels::{PixelMatrix, Rgb};
use pixtui_render::GraphicsFormat;

/// Palette registers most terminals provide.
pub const MAX_PALETTE: usize = 256;

/// Pixels per sixel band.
const BAND: u32 = 6;

/// Shortest run worth `!count` compression.
const RLE_MIN: usize = 4;

/// Offset turning a 6-bit column mask into a sixel character.
const SIXEL_BASE: u8 = 0x3F;

/// Palette-raster encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SixelEncoder;

impl SixelEncoder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode `pixels` as one `DCS ... ST` sequence.
    ///
    /// Empty or all-black input yields no bytes.
    #[must_use]
    pub fn encode(&self, pixels: &PixelMatrix) -> Vec<u8> {
        if pixels.is_black() {
            return Vec::new();
        }
        let palette = Palette::build(pixels);
        let (w, h) = (pixels.width(), pixels.height());

        let mut out = Vec::with_capacity(64 + palette.colors.len() * 16 + (w * h) as usize / 3);
        out.extend_from_slice(format!("\x1bP0;1;0q\"1;1;{w};{h}").as_bytes());
        for (n, c) in palette.colors.iter().enumerate() {
            out.extend_from_slice(
                format!("#{n};2;{};{};{}", percent(c.r), percent(c.g), percent(c.b)).as_bytes(),
            );
        }

        let mut rows: Vec<Option<Vec<u8>>> = vec![None; palette.colors.len()];
        let mut band_top = 0;
        while band_top < h {
            if band_top > 0 {
                out.push(b'-');
            }
            for slot in rows.iter_mut() {
                *slot = None;
            }
            for dy in 0..BAND.min(h - band_top) {
                let y = band_top + dy;
                for x in 0..w {
                    let Some(rgb) = pixels.get(x, y) else { continue };
                    let Some(n) = palette.lookup(rgb) else { continue };
                    let row = rows[n].get_or_insert_with(|| vec![0; w as usize]);
                    row[x as usize] |= 1 << dy;
                }
            }
            let mut first = true;
            for (n, row) in rows.iter().enumerate() {
                let Some(row) = row else { continue };
                if !first {
                    out.push(b'$');
                }
                first = false;
                out.extend_from_slice(format!("#{n}").as_bytes());
                push_rle(&mut out, trim_trailing_empty(row));
            }
            band_top += BAND;
        }

        out.extend_from_slice(b"\x1b\\");
        out
    }
}

impl GraphicsEncoder for SixelEncoder {
    fn format(&self) -> GraphicsFormat {
        GraphicsFormat::Sixel
    }

    fn encode(&self, pixels: &PixelMatrix, _placement: &Placement) -> Vec<u8> {
        SixelEncoder::encode(self, pixels)
    }
}

/// Sixel color channels are percentages.
#[inline]
fn percent(c: u8) -> u32 {
    (u32::from(c) * 100 + 127) / 255
}

/// Drop trailing columns with no pixel set.
fn trim_trailing_empty(row: &[u8]) -> &[u8] {
    let end = row.iter().rposition(|&bits| bits != 0).map_or(0, |i| i + 1);
    &row[..end]
}

/// Write 6-bit column masks as sixel characters, run-length encoded.
fn push_rle(out: &mut Vec<u8>, row: &[u8]) {
    let mut i = 0;
    while i < row.len() {
        let bits = row[i];
        let run = row[i..].iter().take_while(|&&b| b == bits).count();
        let ch = SIXEL_BASE + bits;
        if run >= RLE_MIN {
            out.extend_from_slice(format!("!{run}").as_bytes());
            out.push(ch);
        } else {
            out.extend(std::iter::repeat_n(ch, run));
        }
        i += run;
    }
}

/// Registered colors plus the pixel-to-register mapping.
#[derive(Debug)]
struct Palette {
    colors: Vec<Rgb>,
    index: HashMap<Rgb, usize>,
    shift: u32,
}

impl Palette {
    /// Distinct non-black colors in first-seen order, quantized until they
    /// fit in [`MAX_PALETTE`] registers.
    fn build(pixels: &PixelMatrix) -> Self {
        let mut shift = 0;
        loop {
            let mut colors = Vec::new();
            let mut index = HashMap::new();
            let mut overflow = false;
            for &p in pixels.pixels() {
                if p.is_black() {
                    continue;
                }
                let q = quantize(p, shift);
                if !index.contains_key(&q) {
                    if colors.len() == MAX_PALETTE {
                        overflow = true;
                        break;
                    }
                    index.insert(q, colors.len());
                    colors.push(q);
                }
            }
            if !overflow || shift >= 7 {
                return Self {
                    colors,
                    index,
                    shift,
                };
            }
            shift += 1;
        }
    }

    fn lookup(&self, rgb: Rgb) -> Option<usize> {
        if rgb.is_black() {
            return None;
        }
        self.index.get(&quantize(rgb, self.shift)).copied()
    }
}

/// Drop `shift` low bits per channel and move to the bucket center.
///
/// The center has the highest dropped bit set, so a quantized color is never
/// black.
fn quantize(c: Rgb, shift: u32) -> Rgb {
    if shift == 0 {
        return c;
    }
    let center = 1u8 << (shift - 1);
    let q = |v: u8| ((v >> shift) << shift) | center;
    Rgb::new(q(c.r), q(c.g), q(c.b))
}
