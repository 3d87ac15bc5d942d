//! Lazily materialized tiled image with writable tile checkout

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::image::{ConstantSource, TileIndex, TileLayout, TileObserver, TileSource};
use crate::raster::{GeoTransform, Interleave, Raster, Rect, SampleType};

/// A 2D grid of [`Raster`] tiles addressed by tile coordinates.
///
/// Tiles are produced by the image's [`TileSource`] the first time they are
/// read or written. Writers check tiles out with
/// [`TiledImage::get_writable_tile`] and must hand them back with
/// [`TiledImage::release_writable_tile`]; registered [`TileObserver`]s see the
/// first acquisition and the last release of each tile.
///
/// Tiles that were never checked out for writing can be dropped again with
/// [`TiledImage::evict_tile`], [`TiledImage::evict_clean_tiles`] or
/// [`TiledImage::trim_resident`]; the source reproduces them on next access.
pub struct TiledImage {
    layout: TileLayout,
    transform: GeoTransform,
    tiles: Vec<OnceLock<Raster>>,
    source: Box<dyn TileSource>,
    writers: Vec<u32>,
    /// Tile content differs from what the source produces
    modified: Vec<bool>,
    last_access: Vec<AtomicU64>,
    clock: AtomicU64,
    observers: Vec<Arc<dyn TileObserver>>,
}

impl TiledImage {
    /// Zero-filled image
    pub fn new(layout: TileLayout) -> Result<Self> {
        Self::with_source(layout, ConstantSource::default())
    }

    /// Image whose tiles are read from `source` on demand
    pub fn with_source<S: TileSource + 'static>(layout: TileLayout, source: S) -> Result<Self> {
        layout.validate()?;
        let count = layout.tile_count();
        Ok(Self {
            layout,
            transform: GeoTransform::default(),
            tiles: (0..count).map(|_| OnceLock::new()).collect(),
            source: Box::new(source),
            writers: vec![0; count],
            modified: vec![false; count],
            last_access: (0..count).map(|_| AtomicU64::new(0)).collect(),
            clock: AtomicU64::new(0),
            observers: Vec::new(),
        })
    }

    /// Split a raster into tiles of the given size.
    ///
    /// The image keeps the raster's bounds and sample type; the tile grid is
    /// anchored at the raster origin.
    pub fn from_raster(raster: &Raster, tile_width: usize, tile_height: usize) -> Result<Self> {
        let bounds = raster.bounds();
        let layout = TileLayout::new(bounds.width, bounds.height, raster.bands(), raster.sample_type())
            .with_origin(bounds.x, bounds.y)
            .with_tile_size(tile_width, tile_height)
            .with_interleave(raster.interleave());
        let mut image = Self::new(layout)?;
        image.modified.fill(true);

        for tile in layout.tile_indices() {
            let Some(tile_bounds) = layout.tile_bounds(tile) else {
                continue;
            };
            let mut part =
                Raster::with_interleave(tile_bounds, layout.bands, layout.sample_type, layout.interleave);
            part.copy_from(raster)?;
            image.slot(tile)?.get_or_init(|| part);
        }
        Ok(image)
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    // Geometry

    pub fn layout(&self) -> &TileLayout {
        &self.layout
    }

    pub fn bounds(&self) -> Rect {
        self.layout.bounds
    }

    pub fn width(&self) -> usize {
        self.layout.bounds.width
    }

    pub fn height(&self) -> usize {
        self.layout.bounds.height
    }

    pub fn bands(&self) -> usize {
        self.layout.bands
    }

    pub fn sample_type(&self) -> SampleType {
        self.layout.sample_type
    }

    pub fn interleave(&self) -> Interleave {
        self.layout.interleave
    }

    /// Pixel to world mapping
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    // Tiles

    fn index(&self, tile: TileIndex) -> Result<usize> {
        self.layout
            .linear_index(tile)
            .ok_or(Error::TileOutOfRange { tile })
    }

    fn slot(&self, tile: TileIndex) -> Result<&OnceLock<Raster>> {
        let index = self.index(tile)?;
        Ok(&self.tiles[index])
    }

    fn materialize(&self, tile: TileIndex) -> Result<Raster> {
        let bounds = self
            .layout
            .tile_bounds(tile)
            .ok_or(Error::TileOutOfRange { tile })?;
        let raster = self.source.read_tile(&self.layout, tile, bounds)?;

        let mismatch = if raster.bounds() != bounds {
            Some(format!("bounds {} but expected {}", raster.bounds(), bounds))
        } else if raster.bands() != self.layout.bands {
            Some(format!("{} bands but expected {}", raster.bands(), self.layout.bands))
        } else if raster.sample_type() != self.layout.sample_type {
            Some(format!(
                "sample type {} but expected {}",
                raster.sample_type(),
                self.layout.sample_type
            ))
        } else if raster.interleave() != self.layout.interleave {
            Some(format!("{:?} interleave but expected {:?}", raster.interleave(), self.layout.interleave))
        } else {
            None
        };
        if let Some(reason) = mismatch {
            return Err(Error::IncompatibleTile { tile, reason });
        }

        debug!("Materialized tile {} covering {}", tile, bounds);
        Ok(raster)
    }

    /// Read access to a tile, producing it from the source if needed
    pub fn tile(&self, tile: TileIndex) -> Result<&Raster> {
        let index = self.index(tile)?;
        let stamp = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        self.last_access[index].store(stamp, Ordering::Relaxed);

        let slot = &self.tiles[index];
        if let Some(raster) = slot.get() {
            return Ok(raster);
        }
        let raster = self.materialize(tile)?;
        Ok(slot.get_or_init(|| raster))
    }

    fn tile_mut(&mut self, tile: TileIndex) -> Result<&mut Raster> {
        self.tile(tile)?;
        let index = self.index(tile)?;
        self.tiles[index]
            .get_mut()
            .ok_or_else(|| Error::Other(format!("tile {} vanished after materialization", tile)))
    }

    /// Tile containing pixel `(x, y)`
    pub fn tile_at(&self, x: i64, y: i64) -> Result<&Raster> {
        if !self.layout.bounds.contains(x, y) {
            return Err(Error::OutOfBounds {
                x,
                y,
                bounds: self.layout.bounds,
            });
        }
        self.tile(self.layout.tile_of(x, y))
    }

    /// Number of tiles currently resident
    pub fn materialized_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| t.get().is_some()).count()
    }

    /// Whether the tile holds data its source cannot reproduce
    pub fn is_tile_modified(&self, tile: TileIndex) -> bool {
        self.index(tile).map_or(false, |i| self.modified[i])
    }

    fn is_evictable(&self, index: usize) -> bool {
        self.writers[index] == 0 && !self.modified[index] && self.tiles[index].get().is_some()
    }

    /// Drop a resident tile so the next access reads it from the source again.
    ///
    /// Returns `false` and keeps the tile when it is not resident, checked
    /// out for writing, or modified.
    pub fn evict_tile(&mut self, tile: TileIndex) -> Result<bool> {
        let index = self.index(tile)?;
        if !self.is_evictable(index) {
            return Ok(false);
        }
        self.tiles[index].take();
        trace!("Evicted tile {}", tile);
        Ok(true)
    }

    /// Drop every evictable tile; returns how many were dropped
    pub fn evict_clean_tiles(&mut self) -> usize {
        let mut evicted = 0;
        for index in 0..self.tiles.len() {
            if self.is_evictable(index) {
                self.tiles[index].take();
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("Evicted {} clean tiles", evicted);
        }
        evicted
    }

    /// Evict least recently used clean tiles until at most `limit` tiles are
    /// resident or nothing else can be dropped; returns how many were dropped
    pub fn trim_resident(&mut self, limit: usize) -> usize {
        let resident = self.materialized_tiles();
        if resident <= limit {
            return 0;
        }
        let mut candidates: Vec<usize> = (0..self.tiles.len())
            .filter(|&i| self.is_evictable(i))
            .collect();
        candidates.sort_by_key(|&i| self.last_access[i].load(Ordering::Relaxed));

        let evicted = candidates.len().min(resident - limit);
        for &index in &candidates[..evicted] {
            self.tiles[index].take();
        }
        debug!("Trimmed {} tiles, {} resident", evicted, resident - evicted);
        evicted
    }

    // Writable tile checkout

    /// Check a tile out for writing.
    ///
    /// Every call must be paired with one [`TiledImage::release_writable_tile`].
    pub fn get_writable_tile(&mut self, tile: TileIndex) -> Result<&mut Raster> {
        let index = self.index(tile)?;
        self.tile(tile)?;

        self.writers[index] += 1;
        self.modified[index] = true;
        trace!("Acquired tile {} ({} writers)", tile, self.writers[index]);
        if self.writers[index] == 1 {
            for observer in &self.observers {
                observer.tile_update(tile, true);
            }
        }
        self.tile_mut(tile)
    }

    /// Return a tile obtained from [`TiledImage::get_writable_tile`]
    pub fn release_writable_tile(&mut self, tile: TileIndex) -> Result<()> {
        let index = self.index(tile)?;
        if self.writers[index] == 0 {
            return Err(Error::TileNotAcquired { tile });
        }

        self.writers[index] -= 1;
        trace!("Released tile {} ({} writers)", tile, self.writers[index]);
        if self.writers[index] == 0 {
            for observer in &self.observers {
                observer.tile_update(tile, false);
            }
        }
        Ok(())
    }

    /// Mutable access to a tile that is currently checked out
    pub fn writable_tile(&mut self, tile: TileIndex) -> Result<&mut Raster> {
        if !self.is_tile_writable(tile) {
            return Err(Error::TileNotAcquired { tile });
        }
        self.tile_mut(tile)
    }

    pub fn is_tile_writable(&self, tile: TileIndex) -> bool {
        self.index(tile).map_or(false, |i| self.writers[i] > 0)
    }

    /// Tiles with at least one writer, in row-major order
    pub fn writable_tiles(&self) -> Vec<TileIndex> {
        self.layout
            .tile_indices()
            .zip(&self.writers)
            .filter(|(_, count)| **count > 0)
            .map(|(tile, _)| tile)
            .collect()
    }

    pub fn has_tile_writers(&self) -> bool {
        self.writers.iter().any(|&count| count > 0)
    }

    pub fn add_observer(&mut self, observer: Arc<dyn TileObserver>) {
        self.observers.push(observer);
    }

    // Pixel access

    /// Sample at `(x, y, band)`
    pub fn get_f64(&self, x: i64, y: i64, band: usize) -> Result<f64> {
        self.tile_at(x, y)?.get_f64(x, y, band)
    }

    /// Store one sample, checking its tile out for the duration of the write
    pub fn set_f64(&mut self, x: i64, y: i64, band: usize, value: f64) -> Result<()> {
        if !self.layout.bounds.contains(x, y) {
            return Err(Error::OutOfBounds {
                x,
                y,
                bounds: self.layout.bounds,
            });
        }
        let tile = self.layout.tile_of(x, y);
        let written = self.get_writable_tile(tile)?.set_f64(x, y, band, value);
        self.release_writable_tile(tile)?;
        written
    }

    /// Assemble all tiles into a single raster
    pub fn to_raster(&self) -> Result<Raster> {
        let mut out = Raster::with_interleave(
            self.layout.bounds,
            self.layout.bands,
            self.layout.sample_type,
            self.layout.interleave,
        );
        for tile in self.layout.tile_indices() {
            out.copy_from(self.tile(tile)?)?;
        }
        Ok(out)
    }
}

impl fmt::Debug for TiledImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiledImage")
            .field("layout", &self.layout)
            .field("transform", &self.transform)
            .field("materialized", &self.materialized_tiles())
            .field("modified", &self.modified.iter().filter(|&&m| m).count())
            .field("writable", &self.writable_tiles())
            .finish()
    }
}
