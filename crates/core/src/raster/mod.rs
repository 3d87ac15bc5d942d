//! Raster data structures: samples, tiles and georeferencing

mod geotransform;
mod grid;
mod rect;
mod sample;
mod statistics;

pub use geotransform::GeoTransform;
pub use grid::{Interleave, Raster, RasterData, SampleSlice, SampleSliceMut};
pub use rect::Rect;
pub use sample::{Sample, SampleType};
pub use statistics::{band_statistics, BandStatistics, StatisticsAccumulator};
