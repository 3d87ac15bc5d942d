//! Resampling between georeferenced tiled images
//!
//! Every target pixel center is mapped through the target transform to world
//! coordinates and back through the source transform into source pixel space,
//! where the source is interpolated.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tessella_core::image::{TileLayout, TiledImage};
use tessella_core::iterator::{PixelIterator, ReadCursor, WritablePixelIterator, WriteCursor};
use tessella_core::{Algorithm, Error, Result};

use crate::interpolator::Interpolation;
use crate::method::InterpolationParams;

/// Parameters for [`resample`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleParams {
    pub interpolation: InterpolationParams,
    /// Value written where the source has no data
    pub fill_value: f64,
}

impl Default for ResampleParams {
    fn default() -> Self {
        Self {
            interpolation: InterpolationParams::default(),
            fill_value: 0.0,
        }
    }
}

/// Outcome of a resampling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResampleReport {
    /// Target pixels visited
    pub pixels: usize,
    /// Pixels set to the fill value
    pub filled: usize,
}

/// Resample `source` into `target` using their geotransforms.
///
/// Band counts must match. Target pixels whose source position falls outside
/// the interpolation domain receive `params.fill_value`.
pub fn resample(
    source: &TiledImage,
    target: &mut TiledImage,
    params: &ResampleParams,
) -> Result<ResampleReport> {
    if source.bands() != target.bands() {
        return Err(Error::IncompatibleImages(format!(
            "source has {} bands, target has {}",
            source.bands(),
            target.bands()
        )));
    }

    let src_transform = *source.transform();
    let dst_transform = *target.transform();
    let src_origin = source.bounds();
    let dst_origin = target.bounds();
    let bands = source.bands();

    let mut interp = Interpolation::new(PixelIterator::new(source)?, params.interpolation)?;
    let mut writer = WritablePixelIterator::new(target)?;
    let mut values = vec![params.fill_value; bands];
    let mut report = ResampleReport::default();

    while writer.next()? {
        if writer.band() == 0 {
            let col = (writer.x() - dst_origin.x) as f64 + 0.5;
            let row = (writer.y() - dst_origin.y) as f64 + 0.5;
            let (sc, sr) = dst_transform.map_to(&src_transform, col, row);

            // Pixel centers sit at integer coordinates for the interpolator
            let sx = sc - 0.5 + src_origin.x as f64;
            let sy = sr - 0.5 + src_origin.y as f64;

            match interp.interpolate_pixel(sx, sy, &mut values) {
                Ok(()) => {}
                Err(Error::OutsideDomain { .. }) => {
                    values.fill(params.fill_value);
                    report.filled += 1;
                }
                Err(e) => return Err(e),
            }
            report.pixels += 1;
        }
        writer.set_sample_f64(values[writer.band()])?;
    }
    writer.close()?;

    debug!(
        "Resampled {} pixels with {} ({} filled)",
        report.pixels,
        params.interpolation.method,
        report.filled
    );
    Ok(report)
}

/// Resample `source` onto a grid `scale_x` / `scale_y` times as dense.
///
/// The result covers the same world footprint with tiles of
/// `tile_size × tile_size` pixels.
pub fn rescale(
    source: &TiledImage,
    scale_x: f64,
    scale_y: f64,
    tile_size: usize,
    params: &ResampleParams,
) -> Result<TiledImage> {
    for (name, scale) in [("scale_x", scale_x), ("scale_y", scale_y)] {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidParameter {
                name,
                value: scale.to_string(),
                reason: "must be a positive factor".into(),
            });
        }
    }

    let width = ((source.width() as f64 * scale_x).round() as usize).max(1);
    let height = ((source.height() as f64 * scale_y).round() as usize).max(1);

    // Effective factors keep the footprint exact after rounding
    let fx = width as f64 / source.width() as f64;
    let fy = height as f64 / source.height() as f64;

    let layout = TileLayout::new(width, height, source.bands(), source.sample_type())
        .with_tile_size(tile_size, tile_size)
        .with_interleave(source.interleave());
    let mut target = TiledImage::new(layout)?.with_transform(source.transform().scaled(fx, fy));

    resample(source, &mut target, params)?;
    Ok(target)
}

/// Parameters for [`Rescale`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescaleParams {
    pub scale_x: f64,
    pub scale_y: f64,
    pub tile_size: usize,
    pub resample: ResampleParams,
}

impl Default for RescaleParams {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            tile_size: 256,
            resample: ResampleParams::default(),
        }
    }
}

/// Rescaling algorithm
#[derive(Debug, Clone, Default)]
pub struct Rescale;

impl Algorithm for Rescale {
    type Input = TiledImage;
    type Output = TiledImage;
    type Params = RescaleParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Rescale"
    }

    fn description(&self) -> &'static str {
        "Resample a tiled image onto a denser or coarser grid"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        rescale(
            &input,
            params.scale_x,
            params.scale_y,
            params.tile_size,
            &params.resample,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessella_core::raster::{GeoTransform, Raster, Rect, SampleType};

    use crate::method::InterpolationMethod;

    fn source() -> TiledImage {
        let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let raster = Raster::from_vec(Rect::new(0, 0, 4, 4), 1, data).unwrap();
        TiledImage::from_raster(&raster, 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0))
    }

    #[test]
    fn test_identity_resample_copies() {
        let src = source();
        let mut dst = TiledImage::new(*src.layout())
            .unwrap()
            .with_transform(*src.transform());
        let report = resample(&src, &mut dst, &ResampleParams::default()).unwrap();

        assert_eq!(report, ResampleReport { pixels: 16, filled: 0 });
        assert_eq!(dst.to_raster().unwrap(), src.to_raster().unwrap());
        assert!(!dst.has_tile_writers());
    }

    #[test]
    fn test_shifted_target_gets_fill() {
        let src = source();
        let layout = TileLayout::new(4, 4, 1, SampleType::F32);
        let mut dst = TiledImage::new(layout)
            .unwrap()
            .with_transform(GeoTransform::new(2.0, 4.0, 1.0, -1.0));
        let params = ResampleParams {
            fill_value: -1.0,
            ..Default::default()
        };
        let report = resample(&src, &mut dst, &params).unwrap();

        assert_eq!(report.filled, 8);
        assert_eq!(dst.get_f64(0, 0, 0).unwrap(), 2.0);
        assert_eq!(dst.get_f64(3, 3, 0).unwrap(), -1.0);
    }

    #[test]
    fn test_band_mismatch() {
        let src = source();
        let mut dst = TiledImage::new(TileLayout::new(4, 4, 2, SampleType::F32)).unwrap();
        assert!(matches!(
            resample(&src, &mut dst, &ResampleParams::default()),
            Err(Error::IncompatibleImages(_))
        ));
    }

    #[test]
    fn test_rescale_doubles_grid() {
        let src = source();
        let params = ResampleParams {
            interpolation: InterpolationParams::new(InterpolationMethod::Nearest),
            ..Default::default()
        };
        let out = rescale(&src, 2.0, 2.0, 3, &params).unwrap();

        assert_eq!((out.width(), out.height()), (8, 8));
        assert_eq!(out.transform().pixel_width, 0.5);
        assert_eq!(out.transform().pixel_height, -0.5);
        // Target pixel (3, 5) has its center at source (1.25, 2.25)
        assert_eq!(out.get_f64(3, 5, 0).unwrap(), src.get_f64(1, 2, 0).unwrap());
        assert!(rescale(&src, 0.0, 1.0, 3, &params).is_err());
    }

    #[test]
    fn test_rescale_algorithm() {
        let params = RescaleParams {
            scale_x: 0.5,
            scale_y: 0.5,
            tile_size: 2,
            ..Default::default()
        };
        let out = Rescale.execute(source(), params).unwrap();
        assert_eq!((out.width(), out.height()), (2, 2));
        assert_eq!(Rescale.name(), "Rescale");

        let same = Rescale.execute_default(source()).unwrap();
        assert_eq!(same.to_raster().unwrap(), source().to_raster().unwrap());
    }
}
