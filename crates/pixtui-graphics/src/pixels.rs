//! Pixel matrix fed to the graphics encoders.

use crate::error::GraphicsError;

/// One 8-bit-per-channel RGB pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// True for pure black, which the encoders treat as transparent.
    #[must_use]
    pub const fn is_black(self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

/// Row-major RGB image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelMatrix {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl PixelMatrix {
    /// An all-black matrix.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width as usize * height as usize],
        }
    }

    /// Wrap a row-major pixel vector.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> Result<Self, GraphicsError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(GraphicsError::InvalidLength {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from packed `RGBRGB...` bytes, row-major.
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, GraphicsError> {
        let expected = width as usize * height as usize * 3;
        if bytes.len() != expected {
            return Err(GraphicsError::InvalidLength {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|p| Rgb::new(p[0], p[1], p[2]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from column-major data (`columns[x][y]`), transposing to rows.
    pub fn from_columns(columns: &[Vec<Rgb>]) -> Result<Self, GraphicsError> {
        let height = columns.first().map_or(0, Vec::len);
        if let Some((column, col)) = columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != height)
        {
            return Err(GraphicsError::RaggedColumns {
                column,
                expected: height,
                actual: col.len(),
            });
        }
        let width = columns.len();
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            pixels.extend(columns.iter().map(|c| c[y]));
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            pixels,
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// True when there is nothing to draw: no pixels, or only black ones.
    #[must_use]
    pub fn is_black(&self) -> bool {
        self.pixels.iter().all(|p| p.is_black())
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set one pixel; out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, rgb: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = rgb;
        }
    }

    #[must_use]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    /// Packed `RGBRGB...` bytes, rows top to bottom.
    #[must_use]
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for p in &self.pixels {
            out.extend_from_slice(&[p.r, p.g, p.b]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_bytes_checks_length() {
        let err = PixelMatrix::from_rgb_bytes(2, 2, &[0; 11]).unwrap_err();
        assert_eq!(
            err,
            GraphicsError::InvalidLength {
                width: 2,
                height: 2,
                expected: 12,
                actual: 11
            }
        );
        let m = PixelMatrix::from_rgb_bytes(2, 1, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.get(1, 0), Some(Rgb::new(4, 5, 6)));
    }

    #[test]
    fn from_columns_transposes() {
        let a = Rgb::new(1, 0, 0);
        let b = Rgb::new(2, 0, 0);
        let c = Rgb::new(3, 0, 0);
        let d = Rgb::new(4, 0, 0);
        let m = PixelMatrix::from_columns(&[vec![a, b], vec![c, d]]).unwrap();
        assert_eq!((m.width(), m.height()), (2, 2));
        assert_eq!(m.pixels(), &[a, c, b, d]);
    }

    #[test]
    fn from_columns_rejects_ragged_input() {
        let err = PixelMatrix::from_columns(&[vec![Rgb::BLACK; 2], vec![Rgb::BLACK]]).unwrap_err();
        assert!(matches!(err, GraphicsError::RaggedColumns { column: 1, .. }));
    }

    #[test]
    fn black_detection() {
        let mut m = PixelMatrix::new(3, 3);
        assert!(m.is_black());
        m.set(2, 2, Rgb::new(0, 0, 1));
        assert!(!m.is_black());
        m.set(9, 9, Rgb::new(9, 9, 9));
        assert_eq!(m.get(9, 9), None);
        assert!(PixelMatrix::default().is_black());
    }

    #[test]
    fn rgb_bytes_are_row_major() {
        let mut m = PixelMatrix::new(2, 2);
        m.set(1, 0, Rgb::new(7, 8, 9));
        assert_eq!(m.to_rgb_bytes(), vec![0, 0, 0, 7, 8, 9, 0, 0, 0, 0, 0, 0]);
    }
}
