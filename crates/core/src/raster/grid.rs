//! Raster tile type

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::{Rect, Sample, SampleType};

/// Memory organisation of the samples in a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interleave {
    /// All bands of a pixel are contiguous (packed direct array)
    #[default]
    Pixel,
    /// One contiguous plane per band
    Band,
}

/// Sample storage, tagged by sample type.
///
/// Arrays are indexed `(row, col, band)` whatever the memory layout.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterData {
    U8(Array3<u8>),
    I16(Array3<i16>),
    U16(Array3<u16>),
    I32(Array3<i32>),
    F32(Array3<f32>),
    F64(Array3<f64>),
}

/// Runs `$body` with `$arr` bound to the typed array inside a [`RasterData`].
macro_rules! with_samples {
    ($data:expr, $arr:ident => $body:expr) => {
        match $data {
            RasterData::U8($arr) => $body,
            RasterData::I16($arr) => $body,
            RasterData::U16($arr) => $body,
            RasterData::I32($arr) => $body,
            RasterData::F32($arr) => $body,
            RasterData::F64($arr) => $body,
        }
    };
}

fn allocate<T: Sample>(rows: usize, cols: usize, bands: usize, interleave: Interleave) -> Array3<T> {
    match interleave {
        Interleave::Pixel => Array3::zeros((rows, cols, bands)),
        // Band planes in memory, exposed in (row, col, band) order
        Interleave::Band => Array3::zeros((bands, rows, cols)).permuted_axes([1, 2, 0]),
    }
}

impl RasterData {
    fn zeros(sample_type: SampleType, rows: usize, cols: usize, bands: usize, interleave: Interleave) -> Self {
        match sample_type {
            SampleType::U8 => RasterData::U8(allocate(rows, cols, bands, interleave)),
            SampleType::I16 => RasterData::I16(allocate(rows, cols, bands, interleave)),
            SampleType::U16 => RasterData::U16(allocate(rows, cols, bands, interleave)),
            SampleType::I32 => RasterData::I32(allocate(rows, cols, bands, interleave)),
            SampleType::F32 => RasterData::F32(allocate(rows, cols, bands, interleave)),
            SampleType::F64 => RasterData::F64(allocate(rows, cols, bands, interleave)),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            RasterData::U8(_) => SampleType::U8,
            RasterData::I16(_) => SampleType::I16,
            RasterData::U16(_) => SampleType::U16,
            RasterData::I32(_) => SampleType::I32,
            RasterData::F32(_) => SampleType::F32,
            RasterData::F64(_) => SampleType::F64,
        }
    }

    /// Shape as (rows, cols, bands)
    pub fn dim(&self) -> (usize, usize, usize) {
        with_samples!(self, a => a.dim())
    }

    fn is_packed(&self) -> bool {
        with_samples!(self, a => a.is_standard_layout())
    }

    #[inline]
    pub(crate) fn get_f64(&self, row: usize, col: usize, band: usize) -> f64 {
        with_samples!(self, a => a[[row, col, band]].to_f64())
    }

    #[inline]
    pub(crate) fn get_f32(&self, row: usize, col: usize, band: usize) -> f32 {
        with_samples!(self, a => a[[row, col, band]].to_f32())
    }

    #[inline]
    pub(crate) fn get_i32(&self, row: usize, col: usize, band: usize) -> i32 {
        with_samples!(self, a => a[[row, col, band]].to_i32())
    }

    #[inline]
    pub(crate) fn set_f64(&mut self, row: usize, col: usize, band: usize, value: f64) {
        with_samples!(self, a => a[[row, col, band]] = Sample::from_f64(value))
    }

    #[inline]
    pub(crate) fn set_f32(&mut self, row: usize, col: usize, band: usize, value: f32) {
        with_samples!(self, a => a[[row, col, band]] = Sample::from_f32(value))
    }

    #[inline]
    pub(crate) fn set_i32(&mut self, row: usize, col: usize, band: usize, value: i32) {
        with_samples!(self, a => a[[row, col, band]] = Sample::from_i32(value))
    }
}

/// Contiguous, pixel-interleaved view of a raster's samples.
#[derive(Debug, Clone, Copy)]
pub enum SampleSlice<'a> {
    U8(&'a [u8]),
    I16(&'a [i16]),
    U16(&'a [u16]),
    I32(&'a [i32]),
    F32(&'a [f32]),
    F64(&'a [f64]),
}

macro_rules! with_slice {
    ($slice:expr, $s:ident => $body:expr) => {
        match $slice {
            SampleSlice::U8($s) => $body,
            SampleSlice::I16($s) => $body,
            SampleSlice::U16($s) => $body,
            SampleSlice::I32($s) => $body,
            SampleSlice::F32($s) => $body,
            SampleSlice::F64($s) => $body,
        }
    };
}

impl<'a> SampleSlice<'a> {
    pub fn len(&self) -> usize {
        with_slice!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get_f64(&self, offset: usize) -> Option<f64> {
        with_slice!(self, s => s.get(offset).map(|&v| v.to_f64()))
    }

    #[inline]
    pub fn get_f32(&self, offset: usize) -> Option<f32> {
        with_slice!(self, s => s.get(offset).map(|&v| v.to_f32()))
    }

    #[inline]
    pub fn get_i32(&self, offset: usize) -> Option<i32> {
        with_slice!(self, s => s.get(offset).map(|&v| v.to_i32()))
    }
}

/// Mutable counterpart of [`SampleSlice`].
#[derive(Debug)]
pub enum SampleSliceMut<'a> {
    U8(&'a mut [u8]),
    I16(&'a mut [i16]),
    U16(&'a mut [u16]),
    I32(&'a mut [i32]),
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
}

macro_rules! with_slice_mut {
    ($slice:expr, $s:ident => $body:expr) => {
        match $slice {
            SampleSliceMut::U8($s) => $body,
            SampleSliceMut::I16($s) => $body,
            SampleSliceMut::U16($s) => $body,
            SampleSliceMut::I32($s) => $body,
            SampleSliceMut::F32($s) => $body,
            SampleSliceMut::F64($s) => $body,
        }
    };
}

impl<'a> SampleSliceMut<'a> {
    /// Store a value, returns `false` when `offset` is past the end
    #[inline]
    pub fn set_f64(&mut self, offset: usize, value: f64) -> bool {
        with_slice_mut!(self, s => match s.get_mut(offset) {
            Some(v) => {
                *v = Sample::from_f64(value);
                true
            }
            None => false,
        })
    }

    #[inline]
    pub fn set_f32(&mut self, offset: usize, value: f32) -> bool {
        with_slice_mut!(self, s => match s.get_mut(offset) {
            Some(v) => {
                *v = Sample::from_f32(value);
                true
            }
            None => false,
        })
    }

    #[inline]
    pub fn set_i32(&mut self, offset: usize, value: i32) -> bool {
        with_slice_mut!(self, s => match s.get_mut(offset) {
            Some(v) => {
                *v = Sample::from_i32(value);
                true
            }
            None => false,
        })
    }
}

/// A rectangular grid of samples: one tile of a tiled image.
///
/// The raster knows where it sits in image coordinates; all public accessors
/// take image `(x, y)` coordinates, not tile-local ones.
///
/// # Example
///
/// ```
/// use tessella_core::raster::{Raster, Rect, SampleType};
///
/// let mut tile = Raster::new(Rect::new(64, 0, 64, 64), 3, SampleType::U8);
/// tile.set_f64(70, 10, 2, 200.0).unwrap();
/// assert_eq!(tile.get_i32(70, 10, 2).unwrap(), 200);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    bounds: Rect,
    bands: usize,
    interleave: Interleave,
    data: RasterData,
}

impl Raster {
    /// Create a zero-filled, pixel-interleaved raster
    pub fn new(bounds: Rect, bands: usize, sample_type: SampleType) -> Self {
        Self::with_interleave(bounds, bands, sample_type, Interleave::Pixel)
    }

    /// Create a zero-filled raster with the given memory organisation
    pub fn with_interleave(
        bounds: Rect,
        bands: usize,
        sample_type: SampleType,
        interleave: Interleave,
    ) -> Self {
        Self {
            bounds,
            bands,
            interleave,
            data: RasterData::zeros(sample_type, bounds.height, bounds.width, bands, interleave),
        }
    }

    /// Create a raster filled with `value` (converted to the storage type)
    pub fn filled(bounds: Rect, bands: usize, sample_type: SampleType, value: f64) -> Self {
        let mut raster = Self::new(bounds, bands, sample_type);
        raster.fill(value);
        raster
    }

    /// Create a pixel-interleaved raster from samples in (row, col, band) order
    pub fn from_vec<T: Sample>(bounds: Rect, bands: usize, data: Vec<T>) -> Result<Self> {
        if bounds.is_empty() || bands == 0 {
            return Err(Error::InvalidDimensions {
                width: bounds.width,
                height: bounds.height,
            });
        }
        if data.len() != bounds.area() * bands {
            return Err(Error::InvalidParameter {
                name: "data",
                value: data.len().to_string(),
                reason: format!("expected {} samples", bounds.area() * bands),
            });
        }

        let array = Array3::from_shape_vec((bounds.height, bounds.width, bands), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            bounds,
            bands,
            interleave: Interleave::Pixel,
            data: T::into_data(array),
        })
    }

    /// Create a band-interleaved raster from samples in (band, row, col) order
    pub fn from_band_vec<T: Sample>(bounds: Rect, bands: usize, data: Vec<T>) -> Result<Self> {
        if bounds.is_empty() || bands == 0 {
            return Err(Error::InvalidDimensions {
                width: bounds.width,
                height: bounds.height,
            });
        }
        if data.len() != bounds.area() * bands {
            return Err(Error::InvalidParameter {
                name: "data",
                value: data.len().to_string(),
                reason: format!("expected {} samples", bounds.area() * bands),
            });
        }

        let array = Array3::from_shape_vec((bands, bounds.height, bounds.width), data)
            .map_err(|e| Error::Other(e.to_string()))?
            .permuted_axes([1, 2, 0]);

        Ok(Self {
            bounds,
            bands,
            interleave: Interleave::Band,
            data: T::into_data(array),
        })
    }

    // Dimensions

    /// Position and size in image coordinates
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn width(&self) -> usize {
        self.bounds.width
    }

    pub fn height(&self) -> usize {
        self.bounds.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }

    pub fn interleave(&self) -> Interleave {
        self.interleave
    }

    /// The tagged sample storage
    pub fn data(&self) -> &RasterData {
        &self.data
    }

    // Data access

    fn locate(&self, x: i64, y: i64, band: usize) -> Result<(usize, usize)> {
        if !self.bounds.contains(x, y) {
            return Err(Error::OutOfBounds {
                x,
                y,
                bounds: self.bounds,
            });
        }
        if band >= self.bands {
            return Err(Error::InvalidBand {
                band,
                bands: self.bands,
            });
        }
        Ok(((y - self.bounds.y) as usize, (x - self.bounds.x) as usize))
    }

    /// Sample at image position `(x, y)` as a double
    pub fn get_f64(&self, x: i64, y: i64, band: usize) -> Result<f64> {
        let (row, col) = self.locate(x, y, band)?;
        Ok(self.data.get_f64(row, col, band))
    }

    pub fn get_f32(&self, x: i64, y: i64, band: usize) -> Result<f32> {
        let (row, col) = self.locate(x, y, band)?;
        Ok(self.data.get_f32(row, col, band))
    }

    pub fn get_i32(&self, x: i64, y: i64, band: usize) -> Result<i32> {
        let (row, col) = self.locate(x, y, band)?;
        Ok(self.data.get_i32(row, col, band))
    }

    pub fn set_f64(&mut self, x: i64, y: i64, band: usize, value: f64) -> Result<()> {
        let (row, col) = self.locate(x, y, band)?;
        self.data.set_f64(row, col, band, value);
        Ok(())
    }

    pub fn set_f32(&mut self, x: i64, y: i64, band: usize, value: f32) -> Result<()> {
        let (row, col) = self.locate(x, y, band)?;
        self.data.set_f32(row, col, band, value);
        Ok(())
    }

    pub fn set_i32(&mut self, x: i64, y: i64, band: usize, value: i32) -> Result<()> {
        let (row, col) = self.locate(x, y, band)?;
        self.data.set_i32(row, col, band, value);
        Ok(())
    }

    /// Set every sample of every band to `value`
    pub fn fill(&mut self, value: f64) {
        with_samples!(&mut self.data, a => a.fill(Sample::from_f64(value)))
    }

    /// Copy the samples of `other` that overlap this raster.
    ///
    /// Returns the number of pixels copied.
    pub fn copy_from(&mut self, other: &Raster) -> Result<usize> {
        if other.bands != self.bands {
            return Err(Error::IncompatibleImages(format!(
                "band count {} vs {}",
                self.bands, other.bands
            )));
        }
        let Some(overlap) = self.bounds.intersection(&other.bounds) else {
            return Ok(0);
        };

        for y in overlap.y..overlap.max_y() {
            let dst_row = (y - self.bounds.y) as usize;
            let src_row = (y - other.bounds.y) as usize;
            for x in overlap.x..overlap.max_x() {
                let dst_col = (x - self.bounds.x) as usize;
                let src_col = (x - other.bounds.x) as usize;
                for band in 0..self.bands {
                    // f64 holds every supported sample type exactly
                    let v = other.data.get_f64(src_row, src_col, band);
                    self.data.set_f64(dst_row, dst_col, band, v);
                }
            }
        }

        Ok(overlap.area())
    }

    /// All samples converted to `T`, in (row, col, band) order
    pub fn to_vec<T: Sample>(&self) -> Vec<T> {
        with_samples!(&self.data, a => a.iter().map(|&v| T::from_f64(v.to_f64())).collect())
    }

    /// Contiguous sample slice, only available for pixel-interleaved storage.
    ///
    /// Offset of `(x, y, band)` is
    /// `((y - bounds.y) * width + (x - bounds.x)) * bands + band`.
    pub fn direct(&self) -> Option<SampleSlice<'_>> {
        if self.interleave != Interleave::Pixel || !self.data.is_packed() {
            return None;
        }
        match &self.data {
            RasterData::U8(a) => a.as_slice().map(SampleSlice::U8),
            RasterData::I16(a) => a.as_slice().map(SampleSlice::I16),
            RasterData::U16(a) => a.as_slice().map(SampleSlice::U16),
            RasterData::I32(a) => a.as_slice().map(SampleSlice::I32),
            RasterData::F32(a) => a.as_slice().map(SampleSlice::F32),
            RasterData::F64(a) => a.as_slice().map(SampleSlice::F64),
        }
    }

    /// Mutable contiguous sample slice, see [`Raster::direct`]
    pub fn direct_mut(&mut self) -> Option<SampleSliceMut<'_>> {
        if self.interleave != Interleave::Pixel || !self.data.is_packed() {
            return None;
        }
        match &mut self.data {
            RasterData::U8(a) => a.as_slice_mut().map(SampleSliceMut::U8),
            RasterData::I16(a) => a.as_slice_mut().map(SampleSliceMut::I16),
            RasterData::U16(a) => a.as_slice_mut().map(SampleSliceMut::U16),
            RasterData::I32(a) => a.as_slice_mut().map(SampleSliceMut::I32),
            RasterData::F32(a) => a.as_slice_mut().map(SampleSliceMut::F32),
            RasterData::F64(a) => a.as_slice_mut().map(SampleSliceMut::F64),
        }
    }

    /// Offset of an image position inside the direct slice
    #[inline]
    pub(crate) fn direct_offset(&self, x: i64, y: i64, band: usize) -> usize {
        (((y - self.bounds.y) as usize) * self.bounds.width + (x - self.bounds.x) as usize)
            * self.bands
            + band
    }

    // Tile-local accessors used by the cursors; callers guarantee bounds.

    #[inline]
    pub(crate) fn local_f64(&self, x: i64, y: i64, band: usize) -> f64 {
        self.data
            .get_f64((y - self.bounds.y) as usize, (x - self.bounds.x) as usize, band)
    }

    #[inline]
    pub(crate) fn local_f32(&self, x: i64, y: i64, band: usize) -> f32 {
        self.data
            .get_f32((y - self.bounds.y) as usize, (x - self.bounds.x) as usize, band)
    }

    #[inline]
    pub(crate) fn local_i32(&self, x: i64, y: i64, band: usize) -> i32 {
        self.data
            .get_i32((y - self.bounds.y) as usize, (x - self.bounds.x) as usize, band)
    }

    #[inline]
    pub(crate) fn set_local_f64(&mut self, x: i64, y: i64, band: usize, value: f64) {
        let (row, col) = ((y - self.bounds.y) as usize, (x - self.bounds.x) as usize);
        self.data.set_f64(row, col, band, value)
    }

    #[inline]
    pub(crate) fn set_local_f32(&mut self, x: i64, y: i64, band: usize, value: f32) {
        let (row, col) = ((y - self.bounds.y) as usize, (x - self.bounds.x) as usize);
        self.data.set_f32(row, col, band, value)
    }

    #[inline]
    pub(crate) fn set_local_i32(&mut self, x: i64, y: i64, band: usize, value: i32) {
        let (row, col) = ((y - self.bounds.y) as usize, (x - self.bounds.x) as usize);
        self.data.set_i32(row, col, band, value)
    }
}
