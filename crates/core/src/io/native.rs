//! Tiled TIFF / GeoTIFF reading and writing with the `tiff` crate.
//!
//! Each TIFF chunk (tile or strip) becomes one tile of the [`TiledImage`] and
//! is only decoded when the tile is first touched.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use std::sync::Mutex;

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{
    ColorType, Gray16, Gray32Float, Gray64Float, Gray8, GrayI16, GrayI32, RGB16, RGB8, RGBA16, RGBA8,
};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{Error, Result};
use crate::image::{TileIndex, TileLayout, TileSource, TiledImage};
use crate::iterator::{PixelIterator, ReadCursor};
use crate::raster::{GeoTransform, Raster, Rect, Sample, SampleType};

/// Options for writing TIFF files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiffOptions {
    /// Rows per strip; defaults to the image tile height
    pub rows_per_strip: Option<u32>,
    /// Write GeoTIFF pixel-scale, tiepoint and key directory tags
    pub georeference: bool,
}

impl Default for TiffOptions {
    fn default() -> Self {
        Self {
            rows_per_strip: None,
            georeference: true,
        }
    }
}

/// Lazily decodes TIFF chunks into tiles
pub struct TiffTileSource<R: Read + Seek> {
    decoder: Mutex<Decoder<R>>,
    chunks_across: u32,
}

impl<R: Read + Seek + Send> TileSource for TiffTileSource<R> {
    fn read_tile(&self, layout: &TileLayout, tile: TileIndex, bounds: Rect) -> Result<Raster> {
        let chunk = tile.ty as u32 * self.chunks_across + tile.tx as u32;
        let mut decoder = self
            .decoder
            .lock()
            .map_err(|_| Error::Other("TIFF decoder lock poisoned".into()))?;

        let (w, h) = decoder.chunk_data_dimensions(chunk);
        if w as usize != bounds.width || h as usize != bounds.height {
            return Err(Error::IncompatibleTile {
                tile,
                reason: format!("TIFF chunk {} is {}x{}, expected {}", chunk, w, h, bounds),
            });
        }

        debug!("Decoding TIFF chunk {} for tile {}", chunk, tile);
        let result = decoder.read_chunk(chunk)?;
        chunk_to_raster(result, bounds, layout.bands)
    }
}

fn chunk_to_raster(result: DecodingResult, bounds: Rect, bands: usize) -> Result<Raster> {
    match result {
        DecodingResult::U8(buf) => Raster::from_vec(bounds, bands, buf),
        DecodingResult::I8(buf) => {
            Raster::from_vec(bounds, bands, buf.into_iter().map(i16::from).collect::<Vec<_>>())
        }
        DecodingResult::U16(buf) => Raster::from_vec(bounds, bands, buf),
        DecodingResult::I16(buf) => Raster::from_vec(bounds, bands, buf),
        DecodingResult::I32(buf) => Raster::from_vec(bounds, bands, buf),
        DecodingResult::F32(buf) => Raster::from_vec(bounds, bands, buf),
        DecodingResult::F64(buf) => Raster::from_vec(bounds, bands, buf),
        _ => Err(Error::UnsupportedDataType(
            "TIFF sample format has no matching sample type".into(),
        )),
    }
}

/// Map TIFF BitsPerSample / SampleFormat to a storage type.
///
/// Signed bytes are widened to `I16`.
fn sample_type_of(bits: u32, format: u32) -> Result<SampleType> {
    match (bits, format) {
        (8, 1) => Ok(SampleType::U8),
        (8, 2) | (16, 2) => Ok(SampleType::I16),
        (16, 1) => Ok(SampleType::U16),
        (32, 2) => Ok(SampleType::I32),
        (32, 3) => Ok(SampleType::F32),
        (64, 3) => Ok(SampleType::F64),
        _ => Err(Error::UnsupportedDataType(format!(
            "{}-bit samples with SampleFormat {}",
            bits, format
        ))),
    }
}

/// Open a TIFF file as a lazily decoded tiled image
pub fn open_tiff<P: AsRef<Path>>(path: P) -> Result<TiledImage> {
    let file = File::open(path.as_ref())?;
    decode_tiff(BufReader::new(file))
}

/// Open an in-memory TIFF as a lazily decoded tiled image
pub fn open_tiff_from_buffer(data: Vec<u8>) -> Result<TiledImage> {
    decode_tiff(Cursor::new(data))
}

fn decode_tiff<R: Read + Seek + Send + 'static>(reader: R) -> Result<TiledImage> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let bands = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;
    let bits = decoder
        .get_tag_u32_vec(Tag::BitsPerSample)
        .ok()
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let format = decoder
        .get_tag_u32_vec(Tag::SampleFormat)
        .ok()
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1);
    if planar != 1 && bands > 1 {
        return Err(Error::UnsupportedDataType(
            "planar (band-separate) TIFF layout".into(),
        ));
    }
    let sample_type = sample_type_of(bits, format)?;

    let (chunk_width, chunk_height) = decoder.chunk_dimensions();
    let chunks_across = width.div_ceil(chunk_width);

    let layout = TileLayout::new(width as usize, height as usize, bands, sample_type)
        .with_tile_size(chunk_width as usize, chunk_height as usize);
    let transform = read_geotransform(&mut decoder).unwrap_or_default();

    debug!(
        "Opened {}x{} TIFF, {} bands of {}, {}x{} chunks",
        width, height, bands, sample_type, chunk_width, chunk_height
    );

    let source = TiffTileSource {
        decoder: Mutex::new(decoder),
        chunks_across,
    };
    Ok(TiledImage::with_source(layout, source)?.with_transform(transform))
}

/// Attempt to read a GeoTransform from GeoTIFF tags
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            return Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Write a tiled image to a TIFF file
pub fn write_tiff<P: AsRef<Path>>(image: &TiledImage, path: P, options: &TiffOptions) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_tiff(image, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

/// Write a tiled image to an in-memory TIFF
pub fn write_tiff_to_buffer(image: &TiledImage, options: &TiffOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_tiff(image, Cursor::new(&mut buf), options)?;
    Ok(buf)
}

fn encode_tiff<W: Write + Seek>(image: &TiledImage, writer: W, options: &TiffOptions) -> Result<()> {
    use SampleType::*;

    match (image.bands(), image.sample_type()) {
        (1, U8) => encode_as::<Gray8, W>(image, writer, options),
        (1, U16) => encode_as::<Gray16, W>(image, writer, options),
        (1, I16) => encode_as::<GrayI16, W>(image, writer, options),
        (1, I32) => encode_as::<GrayI32, W>(image, writer, options),
        (1, F32) => encode_as::<Gray32Float, W>(image, writer, options),
        (1, F64) => encode_as::<Gray64Float, W>(image, writer, options),
        (3, U8) => encode_as::<RGB8, W>(image, writer, options),
        (3, U16) => encode_as::<RGB16, W>(image, writer, options),
        (4, U8) => encode_as::<RGBA8, W>(image, writer, options),
        (4, U16) => encode_as::<RGBA16, W>(image, writer, options),
        (bands, sample_type) => Err(Error::UnsupportedDataType(format!(
            "cannot write {} bands of {} to TIFF",
            bands, sample_type
        ))),
    }
}

fn encode_as<C, W>(image: &TiledImage, writer: W, options: &TiffOptions) -> Result<()>
where
    C: ColorType,
    C::Inner: Sample,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let bounds = image.bounds();
    let bands = image.bands();
    let rows_per_strip = options
        .rows_per_strip
        .unwrap_or(image.layout().tile_height as u32)
        .max(1);

    let mut encoder = TiffEncoder::new(writer)?;
    let mut tiff = encoder.new_image::<C>(bounds.width as u32, bounds.height as u32)?;
    tiff.rows_per_strip(rows_per_strip)?;

    if options.georeference {
        write_georeference(&mut tiff, image.transform())?;
    }

    let mut row = 0usize;
    while row < bounds.height {
        let rows = (rows_per_strip as usize).min(bounds.height - row);
        let strip = Rect::new(bounds.x, bounds.y + row as i64, bounds.width, rows);

        let mut samples = vec![C::Inner::zero(); strip.area() * bands];
        let mut cursor = PixelIterator::with_area(image, strip)?;
        while cursor.next()? {
            let index = ((cursor.y() - strip.y) as usize * strip.width
                + (cursor.x() - strip.x) as usize)
                * bands
                + cursor.band();
            samples[index] = C::Inner::from_f64(cursor.sample_f64()?);
        }

        tiff.write_strip(&samples)?;
        row += rows;
    }

    tiff.finish()?;
    Ok(())
}

fn write_georeference<W, C, K, D>(
    tiff: &mut tiff::encoder::ImageEncoder<'_, W, C, K, D>,
    gt: &GeoTransform,
) -> Result<()>
where
    W: Write + Seek,
    C: ColorType,
    K: tiff::encoder::TiffKind,
    D: tiff::encoder::compression::Compression,
{
    if !gt.has_rotation() {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        tiff.encoder()
            .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        tiff.encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    } else {
        #[rustfmt::skip]
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        tiff.encoder()
            .write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }

    // Version 1.1.0 with two keys: projected model, pixel-is-area rasters
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    tiff.encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
    Ok(())
}
