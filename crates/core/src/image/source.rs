//! Lazy tile producers

use crate::error::Result;
use crate::image::{TileIndex, TileLayout};
use crate::raster::{Raster, Rect};

/// Produces the raster of a tile the first time the tile is needed.
///
/// The returned raster must cover exactly `bounds` with the layout's band
/// count, sample type and interleave; the image rejects anything else.
pub trait TileSource: Send + Sync {
    fn read_tile(&self, layout: &TileLayout, tile: TileIndex, bounds: Rect) -> Result<Raster>;
}

/// Fills every tile with a constant value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConstantSource {
    pub value: f64,
}

impl ConstantSource {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl TileSource for ConstantSource {
    fn read_tile(&self, layout: &TileLayout, _tile: TileIndex, bounds: Rect) -> Result<Raster> {
        let mut raster =
            Raster::with_interleave(bounds, layout.bands, layout.sample_type, layout.interleave);
        if self.value != 0.0 {
            raster.fill(self.value);
        }
        Ok(raster)
    }
}

impl<F> TileSource for F
where
    F: Fn(&TileLayout, TileIndex, Rect) -> Result<Raster> + Send + Sync,
{
    fn read_tile(&self, layout: &TileLayout, tile: TileIndex, bounds: Rect) -> Result<Raster> {
        self(layout, tile, bounds)
    }
}
