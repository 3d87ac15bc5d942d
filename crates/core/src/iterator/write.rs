//! Read-write cursor

use tracing::warn;

use crate::error::{Error, Result};
use crate::image::{TileIndex, TiledImage};
use crate::iterator::traversal::{Position, Step, Traversal};
use crate::iterator::{ReadCursor, WriteCursor};
use crate::raster::{Interleave, Raster, Rect};

/// How samples of the pending tile are addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Direct { offset: usize },
    Indirect,
}

/// Write cursor over a [`TiledImage`].
///
/// The cursor checks out one tile of the target at a time. The pending tile
/// is released before the next one is acquired, on [`ReadCursor::rewind`],
/// on [`WriteCursor::close`] and when the cursor is dropped. A closed cursor
/// stays closed: `next` returns `false` and `move_to` fails with
/// [`Error::CursorClosed`].
///
/// With a separate source image, reads come from the source and writes go to
/// the target; both must share bounds, tiling and band count.
pub struct WritablePixelIterator<'a> {
    source: Option<&'a TiledImage>,
    target: &'a mut TiledImage,
    traversal: Traversal,
    direct: bool,
    access: Access,
    pending: Option<TileIndex>,
    source_tile: Option<&'a Raster>,
    closed: bool,
}

impl<'a> WritablePixelIterator<'a> {
    /// Read and write the whole of `image`
    pub fn new(image: &'a mut TiledImage) -> Result<Self> {
        let bounds = image.bounds();
        Self::with_area(image, bounds)
    }

    /// Read and write the part of `area` inside `image`
    pub fn with_area(image: &'a mut TiledImage, area: Rect) -> Result<Self> {
        Self::build(None, image, area)
    }

    /// Read from `source`, write to `target`
    pub fn with_source(source: &'a TiledImage, target: &'a mut TiledImage) -> Result<Self> {
        let bounds = target.bounds();
        Self::with_source_area(source, target, bounds)
    }

    pub fn with_source_area(
        source: &'a TiledImage,
        target: &'a mut TiledImage,
        area: Rect,
    ) -> Result<Self> {
        let (s, t) = (source.layout(), target.layout());
        if !s.is_compatible(t) {
            return Err(Error::IncompatibleImages(format!(
                "source {} with {}x{} tiles and {} bands, target {} with {}x{} tiles and {} bands",
                s.bounds, s.tile_width, s.tile_height, s.bands, t.bounds, t.tile_width, t.tile_height, t.bands
            )));
        }
        Self::build(Some(source), target, area)
    }

    fn build(source: Option<&'a TiledImage>, target: &'a mut TiledImage, area: Rect) -> Result<Self> {
        let traversal = Traversal::new(target.layout(), area)?;
        let direct = target.interleave() == Interleave::Pixel;
        Ok(Self {
            source,
            target,
            traversal,
            direct,
            access: Access::Indirect,
            pending: None,
            source_tile: None,
            closed: false,
        })
    }

    /// Tile currently checked out by this cursor
    pub fn pending_tile(&self) -> Option<TileIndex> {
        self.pending
    }

    fn release_pending(&mut self) -> Result<()> {
        self.source_tile = None;
        match self.pending.take() {
            Some(tile) => self.target.release_writable_tile(tile),
            None => Ok(()),
        }
    }

    fn acquire(&mut self, tile: TileIndex) -> Result<()> {
        self.release_pending()?;

        let pos = self.traversal.position();
        let raster = self.target.get_writable_tile(tile)?;
        self.access = match raster.direct() {
            Some(_) if self.direct => Access::Direct {
                offset: raster.direct_offset(pos.x, pos.y, pos.band),
            },
            _ => Access::Indirect,
        };
        self.pending = Some(tile);

        self.source_tile = match self.source {
            Some(source) => Some(source.tile(tile)?),
            None => None,
        };
        Ok(())
    }

    fn apply(&mut self, step: Step) -> Result<bool> {
        match step {
            Step::Sample => {
                if let Access::Direct { offset } = &mut self.access {
                    *offset += 1;
                }
                Ok(true)
            }
            Step::Row => {
                if let Access::Direct { .. } = self.access {
                    let pos = self.traversal.position();
                    let raster = self.target.tile(pos.tile)?;
                    self.access = Access::Direct {
                        offset: raster.direct_offset(pos.x, pos.y, pos.band),
                    };
                }
                Ok(true)
            }
            Step::Tile(tile) => {
                self.acquire(tile)?;
                Ok(true)
            }
            Step::Finished => {
                self.release_pending()?;
                Ok(false)
            }
        }
    }

    fn located(&self) -> Result<Position> {
        match (self.traversal.current(), self.pending) {
            (Some(pos), Some(tile)) if pos.tile == tile => Ok(pos),
            _ => Err(Error::NotPositioned),
        }
    }

    /// Raster the cursor reads from at `pos`
    fn read_raster(&self, pos: &Position) -> Result<&Raster> {
        match self.source_tile {
            Some(raster) => Ok(raster),
            None => self.target.tile(pos.tile),
        }
    }

    /// Offset in the direct slice, only when reading the target itself
    fn read_offset(&self) -> Option<usize> {
        match (self.source_tile, self.access) {
            (None, Access::Direct { offset }) => Some(offset),
            _ => None,
        }
    }
}

impl ReadCursor for WritablePixelIterator<'_> {
    fn next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
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
        let pos = self.located()?;
        let raster = self.read_raster(&pos)?;
        let direct = self
            .read_offset()
            .and_then(|offset| raster.direct().and_then(|s| s.get_i32(offset)));
        Ok(direct.unwrap_or_else(|| raster.local_i32(pos.x, pos.y, pos.band)))
    }

    fn sample_f32(&self) -> Result<f32> {
        let pos = self.located()?;
        let raster = self.read_raster(&pos)?;
        let direct = self
            .read_offset()
            .and_then(|offset| raster.direct().and_then(|s| s.get_f32(offset)));
        Ok(direct.unwrap_or_else(|| raster.local_f32(pos.x, pos.y, pos.band)))
    }

    fn sample_f64(&self) -> Result<f64> {
        let pos = self.located()?;
        let raster = self.read_raster(&pos)?;
        let direct = self
            .read_offset()
            .and_then(|offset| raster.direct().and_then(|s| s.get_f64(offset)));
        Ok(direct.unwrap_or_else(|| raster.local_f64(pos.x, pos.y, pos.band)))
    }

    fn move_to(&mut self, x: i64, y: i64, band: usize) -> Result<()> {
        if self.closed {
            return Err(Error::CursorClosed);
        }
        let step = self.traversal.move_to(x, y, band)?;
        self.apply(step).map(|_| ())
    }

    fn rewind(&mut self) -> Result<()> {
        self.traversal.rewind();
        self.release_pending()
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

impl WriteCursor for WritablePixelIterator<'_> {
    fn set_sample(&mut self, value: i32) -> Result<()> {
        let pos = self.located()?;
        let access = self.access;
        let raster = self.target.writable_tile(pos.tile)?;
        if let Access::Direct { offset } = access {
            if let Some(mut samples) = raster.direct_mut() {
                if samples.set_i32(offset, value) {
                    return Ok(());
                }
            }
        }
        raster.set_local_i32(pos.x, pos.y, pos.band, value);
        Ok(())
    }

    fn set_sample_f32(&mut self, value: f32) -> Result<()> {
        let pos = self.located()?;
        let access = self.access;
        let raster = self.target.writable_tile(pos.tile)?;
        if let Access::Direct { offset } = access {
            if let Some(mut samples) = raster.direct_mut() {
                if samples.set_f32(offset, value) {
                    return Ok(());
                }
            }
        }
        raster.set_local_f32(pos.x, pos.y, pos.band, value);
        Ok(())
    }

    fn set_sample_f64(&mut self, value: f64) -> Result<()> {
        let pos = self.located()?;
        let access = self.access;
        let raster = self.target.writable_tile(pos.tile)?;
        if let Access::Direct { offset } = access {
            if let Some(mut samples) = raster.direct_mut() {
                if samples.set_f64(offset, value) {
                    return Ok(());
                }
            }
        }
        raster.set_local_f64(pos.x, pos.y, pos.band, value);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.traversal.finish();
        self.release_pending()
    }
}

impl Drop for WritablePixelIterator<'_> {
    fn drop(&mut self) {
        if let Some(tile) = self.pending.take() {
            if let Err(e) = self.target.release_writable_tile(tile) {
                warn!("Failed to release tile {} on drop: {}", tile, e);
            }
        }
    }
}
