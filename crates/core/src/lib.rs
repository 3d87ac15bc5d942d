//! # Tessella Core
//!
//! Tiled raster images and pixel cursors.
//!
//! This crate provides:
//! - `Raster`: one tile of samples, pixel- or band-interleaved
//! - `TiledImage`: a lazily materialized grid of tiles with writable checkout
//! - `PixelIterator` / `WritablePixelIterator`: tile-aware read and write cursors
//! - `GeoTransform`: Affine transformation for georeferencing
//! - TIFF / GeoTIFF I/O

pub mod error;
pub mod image;
pub mod io;
pub mod iterator;
pub mod raster;

pub use error::{Error, Result};
pub use image::{TileIndex, TileLayout, TiledImage};
pub use iterator::{PixelIterator, ReadCursor, WritablePixelIterator, WriteCursor};
pub use raster::{GeoTransform, Raster, Rect, SampleType};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::{TileIndex, TileLayout, TiledImage};
    pub use crate::iterator::{PixelIterator, ReadCursor, WritablePixelIterator, WriteCursor};
    pub use crate::raster::{GeoTransform, Interleave, Raster, Rect, SampleType};
    pub use crate::Algorithm;
}

/// An image operation driven by a parameter struct.
///
/// Implementations are plain values; all configuration travels in `Params`.
pub trait Algorithm {
    type Input;
    type Output;
    /// `Default` gives the configuration used by [`Algorithm::execute_default`]
    type Params: Default;
    type Error: std::error::Error;

    /// Short display name
    fn name(&self) -> &'static str;

    /// One-line summary for listings
    fn description(&self) -> &'static str;

    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
