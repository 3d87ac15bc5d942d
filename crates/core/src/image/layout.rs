//! Tile grid geometry

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::raster::{Interleave, Rect, SampleType};

/// Integer coordinates of a tile in the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub tx: i64,
    pub ty: i64,
}

impl TileIndex {
    pub fn new(tx: i64, ty: i64) -> Self {
        Self { tx, ty }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.tx, self.ty)
    }
}

/// Inclusive range of tile indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_tx: i64,
    pub min_ty: i64,
    pub max_tx: i64,
    pub max_ty: i64,
}

impl TileRange {
    pub fn contains(&self, tile: TileIndex) -> bool {
        tile.tx >= self.min_tx && tile.tx <= self.max_tx && tile.ty >= self.min_ty && tile.ty <= self.max_ty
    }

    /// The range as a rectangle in tile index space
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.min_tx,
            self.min_ty,
            (self.max_tx - self.min_tx + 1) as usize,
            (self.max_ty - self.min_ty + 1) as usize,
        )
    }

    /// Tiles of the range in row-major order
    pub fn iter(&self) -> impl Iterator<Item = TileIndex> {
        let (min_tx, max_tx) = (self.min_tx, self.max_tx);
        (self.min_ty..=self.max_ty)
            .flat_map(move |ty| (min_tx..=max_tx).map(move |tx| TileIndex::new(tx, ty)))
    }
}

/// Geometry and sample format of a tiled image.
///
/// Tile `(tx, ty)` covers
/// `[grid_x + tx * tile_width, +tile_width) × [grid_y + ty * tile_height, +tile_height)`;
/// its raster is that rectangle clipped to the image bounds, so tiles along
/// the right and bottom edges may be smaller.
///
/// ```
/// use tessella_core::image::{TileIndex, TileLayout};
/// use tessella_core::raster::SampleType;
///
/// let layout = TileLayout::new(100, 50, 1, SampleType::F32).with_tile_size(32, 32);
/// assert_eq!(layout.tiles_across(), 4);
/// assert_eq!(layout.tile_bounds(TileIndex::new(3, 1)).unwrap().width, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayout {
    /// Image bounds in pixel coordinates
    pub bounds: Rect,
    pub tile_width: usize,
    pub tile_height: usize,
    /// X coordinate of the left edge of tile column 0
    pub tile_grid_x_offset: i64,
    /// Y coordinate of the top edge of tile row 0
    pub tile_grid_y_offset: i64,
    pub bands: usize,
    pub sample_type: SampleType,
    pub interleave: Interleave,
}

impl TileLayout {
    /// Single-tile layout anchored at the origin
    pub fn new(width: usize, height: usize, bands: usize, sample_type: SampleType) -> Self {
        Self {
            bounds: Rect::from_size(width, height),
            tile_width: width,
            tile_height: height,
            tile_grid_x_offset: 0,
            tile_grid_y_offset: 0,
            bands,
            sample_type,
            interleave: Interleave::Pixel,
        }
    }

    /// Move the image origin; the tile grid moves with it
    pub fn with_origin(mut self, min_x: i64, min_y: i64) -> Self {
        self.bounds.x = min_x;
        self.bounds.y = min_y;
        self.tile_grid_x_offset = min_x;
        self.tile_grid_y_offset = min_y;
        self
    }

    pub fn with_tile_size(mut self, tile_width: usize, tile_height: usize) -> Self {
        self.tile_width = tile_width;
        self.tile_height = tile_height;
        self
    }

    pub fn with_tile_grid_offset(mut self, x: i64, y: i64) -> Self {
        self.tile_grid_x_offset = x;
        self.tile_grid_y_offset = y;
        self
    }

    pub fn with_interleave(mut self, interleave: Interleave) -> Self {
        self.interleave = interleave;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bounds.is_empty() {
            return Err(Error::InvalidDimensions {
                width: self.bounds.width,
                height: self.bounds.height,
            });
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: format!("{}x{}", self.tile_width, self.tile_height),
                reason: "tiles must be at least one pixel".into(),
            });
        }
        if self.bands == 0 {
            return Err(Error::InvalidParameter {
                name: "bands",
                value: "0".into(),
                reason: "an image needs at least one band".into(),
            });
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.bounds.width
    }

    pub fn height(&self) -> usize {
        self.bounds.height
    }

    /// Tile containing pixel `(x, y)`; the pixel need not be inside the image
    pub fn tile_of(&self, x: i64, y: i64) -> TileIndex {
        TileIndex::new(
            (x - self.tile_grid_x_offset).div_euclid(self.tile_width as i64),
            (y - self.tile_grid_y_offset).div_euclid(self.tile_height as i64),
        )
    }

    /// All tiles intersecting the image
    pub fn grid_range(&self) -> TileRange {
        self.tile_range(&self.bounds)
    }

    /// Tiles intersecting `area` (which should be non-empty)
    pub fn tile_range(&self, area: &Rect) -> TileRange {
        let first = self.tile_of(area.x, area.y);
        let last = self.tile_of(area.max_x() - 1, area.max_y() - 1);
        TileRange {
            min_tx: first.tx,
            min_ty: first.ty,
            max_tx: last.tx,
            max_ty: last.ty,
        }
    }

    pub fn tiles_across(&self) -> usize {
        let range = self.grid_range();
        (range.max_tx - range.min_tx + 1) as usize
    }

    pub fn tiles_down(&self) -> usize {
        let range = self.grid_range();
        (range.max_ty - range.min_ty + 1) as usize
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_across() * self.tiles_down()
    }

    /// Full grid cell of a tile, before clipping to the image
    pub fn tile_rect(&self, tile: TileIndex) -> Rect {
        Rect::new(
            self.tile_grid_x_offset + tile.tx * self.tile_width as i64,
            self.tile_grid_y_offset + tile.ty * self.tile_height as i64,
            self.tile_width,
            self.tile_height,
        )
    }

    /// Raster bounds of a tile, `None` when the tile is outside the grid
    pub fn tile_bounds(&self, tile: TileIndex) -> Option<Rect> {
        if !self.grid_range().contains(tile) {
            return None;
        }
        self.tile_rect(tile).intersection(&self.bounds)
    }

    /// Row-major position of a tile in the grid
    pub fn linear_index(&self, tile: TileIndex) -> Option<usize> {
        let range = self.grid_range();
        if !range.contains(tile) {
            return None;
        }
        let across = (range.max_tx - range.min_tx + 1) as usize;
        Some((tile.ty - range.min_ty) as usize * across + (tile.tx - range.min_tx) as usize)
    }

    /// Every tile of the image in row-major order
    pub fn tile_indices(&self) -> impl Iterator<Item = TileIndex> {
        self.grid_range().iter()
    }

    /// Whether two layouts share bounds, tiling and band count
    pub fn is_compatible(&self, other: &TileLayout) -> bool {
        self.bounds == other.bounds
            && self.tile_width == other.tile_width
            && self.tile_height == other.tile_height
            && self.tile_grid_x_offset == other.tile_grid_x_offset
            && self.tile_grid_y_offset == other.tile_grid_y_offset
            && self.bands == other.bands
    }
}
