//! Encoder selection and the shared encoder contract.

use pixtui_core::terminal_capabilities::GraphicsCapability;
use pixtui_render::{GraphicsFormat, GraphicsRegion};

use crate::decay::DecayEffect;
use crate::kitty::KittyEncoder;
use crate::pixels::PixelMatrix;
use crate::sixel::SixelEncoder;
use crate::transport::TransportConfig;

/// Target cell footprint for an image.
///
/// Kitty scales to it; Sixel draws at native pixel size and only uses it for
/// the region bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub cols: Option<u16>,
    pub rows: Option<u16>,
}

impl Placement {
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: Some(cols),
            rows: Some(rows),
        }
    }
}

/// Turns a pixel matrix into protocol bytes.
///
/// Empty or all-black input must encode to an empty vector.
pub trait GraphicsEncoder {
    fn format(&self) -> GraphicsFormat;
    fn encode(&self, pixels: &PixelMatrix, placement: &Placement) -> Vec<u8>;
}

/// The encoder chosen for this session's graphics capability.
#[derive(Debug)]
pub enum Encoder {
    Sixel(SixelEncoder),
    Kitty(KittyEncoder),
}

impl Encoder {
    /// `None` when the terminal has no pixel protocol; the caller draws
    /// with cells instead.
    #[must_use]
    pub fn for_capability(capability: GraphicsCapability, transport: &TransportConfig) -> Option<Self> {
        match capability {
            GraphicsCapability::None => None,
            GraphicsCapability::Sixel => Some(Self::Sixel(SixelEncoder::new())),
            GraphicsCapability::Kitty => Some(Self::Kitty(KittyEncoder::for_transport(transport))),
        }
    }

    /// See [`KittyEncoder::release_unqueued`]. Sixel holds no resources.
    pub fn release_unqueued(&self, queued: &[GraphicsRegion]) -> usize {
        match self {
            Self::Sixel(_) => 0,
            Self::Kitty(e) => e.release_unqueued(queued),
        }
    }

    /// See [`KittyEncoder::settle`].
    pub fn settle(&self, delivered: bool) -> usize {
        match self {
            Self::Sixel(_) => 0,
            Self::Kitty(e) => e.settle(delivered),
        }
    }

    /// Decay (if any) then encode into a region anchored at `(row, col)`.
    ///
    /// Returns `None` when there is nothing to draw.
    #[must_use]
    pub fn region(
        &self,
        row: u16,
        col: u16,
        pixels: &PixelMatrix,
        placement: &Placement,
        decay: Option<(&DecayEffect, u64)>,
    ) -> Option<GraphicsRegion> {
        let payload = match decay.filter(|(effect, _)| !effect.is_identity()) {
            Some((effect, tick)) => {
                let mut decayed = pixels.clone();
                effect.apply(&mut decayed, tick);
                self.encode(&decayed, placement)
            }
            None => self.encode(pixels, placement),
        };
        if payload.is_empty() {
            return None;
        }
        Some(GraphicsRegion {
            row,
            col,
            width: placement.cols.unwrap_or(0),
            height: placement.rows.unwrap_or(0),
            format: self.format(),
            payload,
        })
    }
}

impl GraphicsEncoder for Encoder {
    fn format(&self) -> GraphicsFormat {
        match self {
            Self::Sixel(e) => GraphicsEncoder::format(e),
            Self::Kitty(e) => GraphicsEncoder::format(e),
        }
    }

    fn encode(&self, pixels: &PixelMatrix, placement: &Placement) -> Vec<u8> {
        match self {
            Self::Sixel(e) => GraphicsEncoder::encode(e, pixels, placement),
            Self::Kitty(e) => e.encode(pixels, placement),
        }
    }
}
