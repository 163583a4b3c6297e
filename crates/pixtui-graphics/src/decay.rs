//! Deterministic pixel decay applied just before encoding.
//!
//! # Model
//!
//! Each pixel gets an intensity `decay * noise(x, y)` clamped to `[0, 1]`.
//! `noise` is value noise at `noise_scale` lattice cycles per pixel, or plain
//! per-pixel white noise when `noise_scale` is zero. With that intensity:
//!
//! - jitter: every channel, plus a shared luminance offset, moves by up to
//!   `jitter * intensity * 255`
//! - rot: the pixel goes black with probability `rot_prob * intensity`; the
//!   rot pattern changes only every [`ROT_PERIOD`] ticks
//!
//! # Determinism
//!
//! All randomness comes from integer hashing of `(seed, x, y, tick)`, so
//! the same inputs always give the same frame. `decay <= 0` is an exact
//! identity.

use crate::pixels::{PixelMatrix, Rgb};

/// Ticks a rot pattern is held before it is re-rolled.
pub const ROT_PERIOD: u64 = 8;

const SALT_NOISE: u32 = 0x6E6F_6973;
const SALT_ROT: u32 = 0x726F_7421;
const SALT_LUM: u32 = 0x6C75_6D21;
const SALT_CHANNEL: u32 = 0x6368_6E00;

/// Effect parameters. All zero is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecayParams {
    /// Overall strength; scales every other effect.
    pub decay: f32,
    /// Color/luminance jitter amplitude, as a fraction of full scale.
    pub jitter: f32,
    /// Probability of a fully decayed pixel rotting to black.
    pub rot_prob: f32,
    /// Spatial frequency of the intensity field (0 = per-pixel noise).
    pub noise_scale: f32,
}

/// Seeded decay transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecayEffect {
    params: DecayParams,
    seed: u32,
}

impl DecayEffect {
    #[must_use]
    pub const fn new(params: DecayParams) -> Self {
        Self { params, seed: 0 }
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn params(&self) -> &DecayParams {
        &self.params
    }

    /// True when [`apply`](Self::apply) cannot change any pixel.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        let p = &self.params;
        !(p.decay > 0.0) || (!(p.jitter > 0.0) && !(p.rot_prob > 0.0))
    }

    /// Transform `pixels` in place for animation step `tick`.
    pub fn apply(&self, pixels: &mut PixelMatrix, tick: u64) {
        if self.is_identity() {
            return;
        }
        let p = self.params;
        let width = pixels.width();
        let t = tick as u32 ^ (tick >> 32) as u32;
        let epoch = tick / ROT_PERIOD;
        let epoch = epoch as u32 ^ (epoch >> 32) as u32;

        for (i, px) in pixels.pixels_mut().iter_mut().enumerate() {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            let intensity = (p.decay * self.noise(x, y)).clamp(0.0, 1.0);
            if intensity == 0.0 {
                continue;
            }

            if p.rot_prob > 0.0 && unit(self.hash(x, y, epoch, SALT_ROT)) < p.rot_prob * intensity {
                *px = Rgb::BLACK;
                continue;
            }

            if p.jitter > 0.0 {
                let amp = p.jitter * intensity * 255.0;
                let lum = signed(self.hash(x, y, t, SALT_LUM)) * amp;
                let shift = |c: u8, k: u32| {
                    let d = signed(self.hash(x, y, t, SALT_CHANNEL + k)) * amp;
                    (f32::from(c) + d + lum).round().clamp(0.0, 255.0) as u8
                };
                *px = Rgb::new(shift(px.r, 0), shift(px.g, 1), shift(px.b, 2));
            }
        }
    }

    /// Intensity field in `[0, 1]`.
    fn noise(&self, x: u32, y: u32) -> f32 {
        let scale = self.params.noise_scale;
        if !(scale > 0.0) {
            return unit(self.hash(x, y, 0, SALT_NOISE));
        }
        let fx = x as f32 * scale;
        let fy = y as f32 * scale;
        if !fx.is_finite() || !fy.is_finite() {
            return unit(self.hash(x, y, 0, SALT_NOISE));
        }
        // Lattice coordinates saturate for huge scales; neighbours wrap.
        let (x0, y0) = (fx as u32, fy as u32);
        let (x1, y1) = (x0.wrapping_add(1), y0.wrapping_add(1));
        let tx = smoothstep(fx.fract());
        let ty = smoothstep(fy.fract());
        let corner = |cx: u32, cy: u32| unit(self.hash(cx, cy, 0, SALT_NOISE));
        let top = lerp(corner(x0, y0), corner(x1, y0), tx);
        let bottom = lerp(corner(x0, y1), corner(x1, y1), tx);
        lerp(top, bottom, ty)
    }

    #[inline]
    fn hash(&self, x: u32, y: u32, t: u32, salt: u32) -> u32 {
        let mut h = self.seed ^ 0x9E37_79B9;
        for v in [x, y, t, salt] {
            h = h.wrapping_add(v.wrapping_mul(0x85EB_CA6B));
            h = xorshift32(h | 1).wrapping_mul(0xC2B2_AE35);
        }
        xorshift32(h | 1)
    }
}

#[inline]
fn xorshift32(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

/// Top 24 bits as a float in `[0, 1)`.
#[inline]
fn unit(h: u32) -> f32 {
    (h >> 8) as f32 / 16_777_216.0
}

/// `[-1, 1)`.
#[inline]
fn signed(h: u32) -> f32 {
    unit(h) * 2.0 - 1.0
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}
