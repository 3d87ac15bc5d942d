//! Error types for Tessella

use crate::image::TileIndex;
use crate::raster::Rect;
use thiserror::Error;

/// Main error type for Tessella operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Band {band} out of range (raster has {bands} bands)")]
    InvalidBand { band: usize, bands: usize },

    #[error("Pixel ({x}, {y}) outside of {bounds}")]
    OutOfBounds { x: i64, y: i64, bounds: Rect },

    #[error("Area {area} does not intersect image bounds {bounds}")]
    NoIntersection { area: Rect, bounds: Rect },

    #[error("Tile {tile} is not part of the tile grid")]
    TileOutOfRange { tile: TileIndex },

    #[error("Tile {tile} was not acquired for writing")]
    TileNotAcquired { tile: TileIndex },

    #[error("Tile {tile} does not match the image layout: {reason}")]
    IncompatibleTile { tile: TileIndex, reason: String },

    #[error("Incompatible images: {0}")]
    IncompatibleImages(String),

    #[error("Cursor is not positioned on a sample")]
    NotPositioned,

    #[error("Cursor was closed")]
    CursorClosed,

    #[error("Coordinate ({x}, {y}) outside interpolation domain [{min_x}, {max_x}] x [{min_y}, {max_y}]")]
    OutsideDomain {
        x: f64,
        y: f64,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

/// Result type alias for Tessella operations
pub type Result<T> = std::result::Result<T, Error>;
