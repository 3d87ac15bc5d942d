//! Pixel cursors over tiled images.
//!
//! Cursors visit samples band by band, then column by column, then row by
//! row inside each tile, and tiles in row-major order. Reading and writing
//! are separate capabilities: every cursor implements [`ReadCursor`], cursors
//! over a mutable image add [`WriteCursor`].
//!
//! ```
//! use tessella_core::image::{TileLayout, TiledImage};
//! use tessella_core::iterator::{PixelIterator, ReadCursor, WritablePixelIterator, WriteCursor};
//! use tessella_core::raster::SampleType;
//!
//! let layout = TileLayout::new(8, 8, 1, SampleType::F32).with_tile_size(4, 4);
//! let mut image = TiledImage::new(layout).unwrap();
//!
//! let mut writer = WritablePixelIterator::new(&mut image).unwrap();
//! while writer.next().unwrap() {
//!     let value = (writer.x() + writer.y()) as f64;
//!     writer.set_sample_f64(value).unwrap();
//! }
//! writer.close().unwrap();
//! drop(writer);
//!
//! let mut reader = PixelIterator::new(&image).unwrap();
//! reader.move_to(3, 5, 0).unwrap();
//! assert_eq!(reader.sample_f64().unwrap(), 8.0);
//! ```

mod read;
mod traversal;
mod write;

pub use read::PixelIterator;
pub use write::WritablePixelIterator;

use crate::error::Result;
use crate::raster::Rect;

/// Read capability of a pixel cursor.
///
/// A fresh cursor sits before the first sample; call [`ReadCursor::next`] or
/// [`ReadCursor::move_to`] before reading. `x`, `y` and `band` describe the
/// current sample and are only meaningful while the cursor is positioned.
pub trait ReadCursor {
    /// Advance to the next sample, `false` once the area is exhausted
    fn next(&mut self) -> Result<bool>;

    fn x(&self) -> i64;

    fn y(&self) -> i64;

    fn band(&self) -> usize;

    /// Current sample as an integer (saturating, floats truncate toward zero)
    fn sample(&self) -> Result<i32>;

    fn sample_f32(&self) -> Result<f32>;

    fn sample_f64(&self) -> Result<f64>;

    /// Jump to a sample inside the boundary
    fn move_to(&mut self, x: i64, y: i64, band: usize) -> Result<()>;

    /// Go back before the first sample
    fn rewind(&mut self) -> Result<()>;

    /// Pixel area the cursor walks
    fn boundary(&self) -> Rect;

    /// Tiles touched by the boundary, in tile index space
    fn tile_boundary(&self) -> Rect;

    fn num_bands(&self) -> usize;

    /// Random access read: `move_to` followed by `sample_f64`
    fn sample_at(&mut self, x: i64, y: i64, band: usize) -> Result<f64> {
        self.move_to(x, y, band)?;
        self.sample_f64()
    }
}

/// Write capability of a pixel cursor
pub trait WriteCursor: ReadCursor {
    fn set_sample(&mut self, value: i32) -> Result<()>;

    fn set_sample_f32(&mut self, value: f32) -> Result<()>;

    fn set_sample_f64(&mut self, value: f64) -> Result<()>;

    /// Release the pending tile and end the walk for good: later `next`
    /// calls return `false` and `move_to` fails
    fn close(&mut self) -> Result<()>;
}

impl<C: ReadCursor + ?Sized> ReadCursor for &mut C {
    fn next(&mut self) -> Result<bool> {
        (**self).next()
    }

    fn x(&self) -> i64 {
        (**self).x()
    }

    fn y(&self) -> i64 {
        (**self).y()
    }

    fn band(&self) -> usize {
        (**self).band()
    }

    fn sample(&self) -> Result<i32> {
        (**self).sample()
    }

    fn sample_f32(&self) -> Result<f32> {
        (**self).sample_f32()
    }

    fn sample_f64(&self) -> Result<f64> {
        (**self).sample_f64()
    }

    fn move_to(&mut self, x: i64, y: i64, band: usize) -> Result<()> {
        (**self).move_to(x, y, band)
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn boundary(&self) -> Rect {
        (**self).boundary()
    }

    fn tile_boundary(&self) -> Rect {
        (**self).tile_boundary()
    }

    fn num_bands(&self) -> usize {
        (**self).num_bands()
    }
}
