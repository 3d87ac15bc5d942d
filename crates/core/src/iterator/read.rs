//! Read-only cursor

use crate::error::{Error, Result};
use crate::image::{TileIndex, TiledImage};
use crate::iterator::traversal::{Position, Step, Traversal};
use crate::iterator::ReadCursor;
use crate::raster::{Interleave, Raster, Rect, SampleSlice};

/// How the current tile's samples are reached
#[derive(Debug, Clone, Copy)]
enum Access<'a> {
    /// Pixel-interleaved slice with a running offset
    Direct {
        raster: &'a Raster,
        samples: SampleSlice<'a>,
        offset: usize,
    },
    /// `(row, col, band)` indexing
    Indirect { raster: &'a Raster },
}

impl<'a> Access<'a> {
    fn new(raster: &'a Raster, direct: bool, pos: &Position) -> Self {
        match raster.direct().filter(|_| direct) {
            Some(samples) => Access::Direct {
                raster,
                samples,
                offset: raster.direct_offset(pos.x, pos.y, pos.band),
            },
            None => Access::Indirect { raster },
        }
    }

    #[inline]
    fn step(&mut self) {
        if let Access::Direct { offset, .. } = self {
            *offset += 1;
        }
    }

    #[inline]
    fn reposition(&mut self, pos: &Position) {
        if let Access::Direct { raster, offset, .. } = self {
            *offset = raster.direct_offset(pos.x, pos.y, pos.band);
        }
    }

    #[inline]
    fn get_f64(&self, pos: &Position) -> f64 {
        match self {
            Access::Direct {
                raster,
                samples,
                offset,
            } => samples
                .get_f64(*offset)
                .unwrap_or_else(|| raster.local_f64(pos.x, pos.y, pos.band)),
            Access::Indirect { raster } => raster.local_f64(pos.x, pos.y, pos.band),
        }
    }

    #[inline]
    fn get_f32(&self, pos: &Position) -> f32 {
        match self {
            Access::Direct {
                raster,
                samples,
                offset,
            } => samples
                .get_f32(*offset)
                .unwrap_or_else(|| raster.local_f32(pos.x, pos.y, pos.band)),
            Access::Indirect { raster } => raster.local_f32(pos.x, pos.y, pos.band),
        }
    }

    #[inline]
    fn get_i32(&self, pos: &Position) -> i32 {
        match self {
            Access::Direct {
                raster,
                samples,
                offset,
            } => samples
                .get_i32(*offset)
                .unwrap_or_else(|| raster.local_i32(pos.x, pos.y, pos.band)),
            Access::Indirect { raster } => raster.local_i32(pos.x, pos.y, pos.band),
        }
    }
}

/// Read cursor over a [`TiledImage`].
///
/// Pixel-interleaved images are read through a typed slice and a running
/// offset, band-interleaved ones through indexed access. Tiles are
/// materialized as the cursor reaches them.
pub struct PixelIterator<'a> {
    image: &'a TiledImage,
    traversal: Traversal,
    direct: bool,
    access: Option<Access<'a>>,
}

impl<'a> PixelIterator<'a> {
    /// Cursor over the whole image
    pub fn new(image: &'a TiledImage) -> Result<Self> {
        Self::with_area(image, image.bounds())
    }

    /// Cursor over the part of `area` inside the image
    pub fn with_area(image: &'a TiledImage, area: Rect) -> Result<Self> {
        let traversal = Traversal::new(image.layout(), area)?;
        Ok(Self {
            image,
            traversal,
            direct: image.interleave() == Interleave::Pixel,
            access: None,
        })
    }

    /// The image being read
    pub fn image(&self) -> &'a TiledImage {
        self.image
    }

    /// Whether the cursor reads through a contiguous slice
    pub fn is_direct(&self) -> bool {
        matches!(self.access, Some(Access::Direct { .. }))
    }

    fn load(&mut self, tile: TileIndex) -> Result<()> {
        self.access = None;
        let raster = self.image.tile(tile)?;
        self.access = Some(Access::new(raster, self.direct, &self.traversal.position()));
        Ok(())
    }

    fn located(&self) -> Result<(&Access<'a>, Position)> {
        match (&self.access, self.traversal.current()) {
            (Some(access), Some(pos)) => Ok((access, pos)),
            _ => Err(Error::NotPositioned),
        }
    }

    fn apply(&mut self, step: Step) -> Result<bool> {
        match step {
            Step::Sample => {
                if let Some(access) = &mut self.access {
                    access.step();
                }
                Ok(true)
            }
            Step::Row => {
                let pos = self.traversal.position();
                if let Some(access) = &mut self.access {
                    access.reposition(&pos);
                }
                Ok(true)
            }
            Step::Tile(tile) => {
                self.load(tile)?;
                Ok(true)
            }
            Step::Finished => {
                self.access = None;
                Ok(false)
            }
        }
    }
}

impl ReadCursor for PixelIterator<'_> {
    fn next(&mut self) -> Result<bool> {
        let step = self.traversal.advance();
        self.apply(step)
    }

    fn x(&self) -> i64 {
        self.traversal.position().x
    }

    fn y(&self) -> i64 {
        self.traversal.position().y
    }

    fn band(&self) -> usize {
        self.traversal.position().band
    }

    fn sample(&self) -> Result<i32> {
        let (access, pos) = self.located()?;
        Ok(access.get_i32(&pos))
    }

    fn sample_f32(&self) -> Result<f32> {
        let (access, pos) = self.located()?;
        Ok(access.get_f32(&pos))
    }

    fn sample_f64(&self) -> Result<f64> {
        let (access, pos) = self.located()?;
        Ok(access.get_f64(&pos))
    }

    fn move_to(&mut self, x: i64, y: i64, band: usize) -> Result<()> {
        let step = self.traversal.move_to(x, y, band)?;
        self.apply(step).map(|_| ())
    }

    fn rewind(&mut self) -> Result<()> {
        self.traversal.rewind();
        self.access = None;
        Ok(())
    }

    fn boundary(&self) -> Rect {
        self.traversal.area()
    }

    fn tile_boundary(&self) -> Rect {
        self.traversal.tiles().as_rect()
    }

    fn num_bands(&self) -> usize {
        self.traversal.bands()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::TileLayout;
    use crate::raster::SampleType;

    fn ramp(interleave: Interleave) -> TiledImage {
        let bounds = Rect::new(0, 0, 5, 3);
        let raster = match interleave {
            Interleave::Pixel => {
                Raster::from_vec(bounds, 2, (0..30).map(|v| v as i16).collect()).unwrap()
            }
            Interleave::Band => {
                Raster::from_band_vec(bounds, 2, (0..30).map(|v| v as i16).collect()).unwrap()
            }
        };
        TiledImage::from_raster(&raster, 2, 2).unwrap()
    }

    #[test]
    fn test_direct_and_indirect_agree() {
        let pixel = ramp(Interleave::Pixel);
        let mut cursor = PixelIterator::new(&pixel).unwrap();
        let mut count = 0;
        while cursor.next().unwrap() {
            assert!(cursor.is_direct());
            let expected = pixel.get_f64(cursor.x(), cursor.y(), cursor.band()).unwrap();
            assert_eq!(cursor.sample_f64().unwrap(), expected);
            count += 1;
        }
        assert_eq!(count, 30);

        let band = ramp(Interleave::Band);
        let mut cursor = PixelIterator::new(&band).unwrap();
        while cursor.next().unwrap() {
            assert!(!cursor.is_direct());
            let expected = band.get_f64(cursor.x(), cursor.y(), cursor.band()).unwrap();
            assert_eq!(cursor.sample().unwrap(), expected as i32);
        }
    }

    #[test]
    fn test_not_positioned_errors() {
        let image = ramp(Interleave::Pixel);
        let mut cursor = PixelIterator::new(&image).unwrap();
        assert!(matches!(cursor.sample(), Err(Error::NotPositioned)));
        while cursor.next().unwrap() {}
        assert!(!cursor.next().unwrap());
        assert!(matches!(cursor.sample_f64(), Err(Error::NotPositioned)));
    }

    #[test]
    fn test_move_to_then_continue() {
        let image = ramp(Interleave::Pixel);
        let mut cursor = PixelIterator::new(&image).unwrap();
        cursor.move_to(3, 1, 1).unwrap();
        assert_eq!(cursor.sample().unwrap(), (1 * 5 + 3) * 2 + 1);
        assert!(cursor.next().unwrap());
        // (3, 1) is the last pixel of tile (1, 0); tile (2, 0) starts at x = 4
        assert_eq!((cursor.x(), cursor.y(), cursor.band()), (4, 0, 0));
        assert!(cursor.move_to(5, 0, 0).is_err());
    }

    #[test]
    fn test_rewind_restarts() {
        let image = ramp(Interleave::Pixel);
        let mut cursor = PixelIterator::new(&image).unwrap();
        cursor.next().unwrap();
        cursor.next().unwrap();
        cursor.rewind().unwrap();
        assert!(cursor.sample().is_err());
        cursor.next().unwrap();
        assert_eq!((cursor.x(), cursor.y(), cursor.band()), (0, 0, 0));
    }

    #[test]
    fn test_boundaries() {
        let layout = TileLayout::new(10, 10, 1, SampleType::U8).with_tile_size(4, 4);
        let image = TiledImage::new(layout).unwrap();
        let cursor = PixelIterator::with_area(&image, Rect::new(3, 5, 20, 2)).unwrap();
        assert_eq!(cursor.boundary(), Rect::new(3, 5, 7, 2));
        assert_eq!(cursor.tile_boundary(), Rect::new(0, 1, 3, 1));
        assert!(PixelIterator::with_area(&image, Rect::new(-4, 0, 4, 4)).is_err());
    }
}
