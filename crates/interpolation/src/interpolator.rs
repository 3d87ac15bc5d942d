//! Interpolation over a read cursor

use serde::{Deserialize, Serialize};
use tessella_core::iterator::ReadCursor;
use tessella_core::raster::Rect;
use tessella_core::{Error, Result};

use crate::method::{InterpolationMethod, InterpolationParams};
use crate::{bicubic, bilinear, lanczos, nearest};

/// Continuous coordinate range accepted by an interpolator (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Domain {
    /// NaN coordinates are never contained
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Samples an image at fractional pixel coordinates through a cursor.
///
/// Integer coordinate `k` addresses pixel `k`, so interpolating at an integer
/// position returns the stored sample for every method. Kernel taps past the
/// cursor boundary are clamped to the nearest edge pixel.
///
/// # Example
///
/// ```
/// use tessella_core::image::TiledImage;
/// use tessella_core::iterator::PixelIterator;
/// use tessella_core::raster::{Raster, Rect};
/// use tessella_interpolation::{Interpolation, InterpolationMethod, InterpolationParams};
///
/// let raster = Raster::from_vec(Rect::new(0, 0, 2, 1), 1, vec![10.0f32, 20.0]).unwrap();
/// let image = TiledImage::from_raster(&raster, 2, 1).unwrap();
/// let cursor = PixelIterator::new(&image).unwrap();
///
/// let params = InterpolationParams::new(InterpolationMethod::Bilinear);
/// let mut interp = Interpolation::new(cursor, params).unwrap();
/// assert_eq!(interp.interpolate(0.25, 0.0, 0).unwrap(), 12.5);
/// ```
pub struct Interpolation<C> {
    cursor: C,
    params: InterpolationParams,
    boundary: Rect,
    bands: usize,
    domain: Domain,
    wx: Vec<f64>,
    wy: Vec<f64>,
}

impl<C: ReadCursor> Interpolation<C> {
    pub fn new(cursor: C, params: InterpolationParams) -> Result<Self> {
        params.validate()?;
        let boundary = cursor.boundary();
        let bands = cursor.num_bands();
        let domain = Domain {
            min_x: boundary.x as f64 - params.margin,
            min_y: boundary.y as f64 - params.margin,
            max_x: (boundary.max_x() - 1) as f64 + params.margin,
            max_y: (boundary.max_y() - 1) as f64 + params.margin,
        };
        let taps = 2 * params.radius().max(1);
        Ok(Self {
            cursor,
            params,
            boundary,
            bands,
            domain,
            wx: Vec::with_capacity(taps),
            wy: Vec::with_capacity(taps),
        })
    }

    pub fn nearest(cursor: C) -> Result<Self> {
        Self::new(cursor, InterpolationParams::new(InterpolationMethod::Nearest))
    }

    pub fn bilinear(cursor: C) -> Result<Self> {
        Self::new(cursor, InterpolationParams::new(InterpolationMethod::Bilinear))
    }

    pub fn bicubic(cursor: C) -> Result<Self> {
        Self::new(cursor, InterpolationParams::new(InterpolationMethod::Bicubic))
    }

    pub fn lanczos(cursor: C) -> Result<Self> {
        Self::new(cursor, InterpolationParams::new(InterpolationMethod::Lanczos))
    }

    pub fn method(&self) -> InterpolationMethod {
        self.params.method
    }

    pub fn params(&self) -> &InterpolationParams {
        &self.params
    }

    /// Support radius of the kernel in pixels
    pub fn radius(&self) -> usize {
        self.params.radius()
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn num_bands(&self) -> usize {
        self.bands
    }

    /// Give the cursor back
    pub fn into_inner(self) -> C {
        self.cursor
    }

    fn check_domain(&self, x: f64, y: f64) -> Result<()> {
        if self.domain.contains(x, y) {
            return Ok(());
        }
        Err(Error::OutsideDomain {
            x,
            y,
            min_x: self.domain.min_x,
            min_y: self.domain.min_y,
            max_x: self.domain.max_x,
            max_y: self.domain.max_y,
        })
    }

    /// Compute kernel weights for `(x, y)`; returns the first tap of each axis
    fn prepare(&mut self, x: f64, y: f64) -> (i64, i64) {
        let p = self.params;
        match p.method {
            InterpolationMethod::Nearest => {
                self.wx.clear();
                self.wy.clear();
                self.wx.push(1.0);
                self.wy.push(1.0);
                (
                    nearest::nearest_index(x, self.boundary.x, self.boundary.max_x() - 1),
                    nearest::nearest_index(y, self.boundary.y, self.boundary.max_y() - 1),
                )
            }
            InterpolationMethod::Bilinear => (
                bilinear::weights(x, &mut self.wx),
                bilinear::weights(y, &mut self.wy),
            ),
            InterpolationMethod::Bicubic => (
                bicubic::weights(x, p.cubic_a, &mut self.wx),
                bicubic::weights(y, p.cubic_a, &mut self.wy),
            ),
            InterpolationMethod::Lanczos => (
                lanczos::weights(x, p.lanczos_window, &mut self.wx),
                lanczos::weights(y, p.lanczos_window, &mut self.wy),
            ),
        }
    }

    /// Weighted sum of the clamped taps for one band
    fn convolve(&mut self, x0: i64, y0: i64, band: usize) -> Result<f64> {
        let (min_x, max_x) = (self.boundary.x, self.boundary.max_x() - 1);
        let (min_y, max_y) = (self.boundary.y, self.boundary.max_y() - 1);

        let mut value = 0.0;
        for (j, &wy) in self.wy.iter().enumerate() {
            if wy == 0.0 {
                continue;
            }
            let sy = (y0 + j as i64).clamp(min_y, max_y);
            let mut row = 0.0;
            for (i, &wx) in self.wx.iter().enumerate() {
                if wx == 0.0 {
                    continue;
                }
                let sx = (x0 + i as i64).clamp(min_x, max_x);
                row += wx * self.cursor.sample_at(sx, sy, band)?;
            }
            value += wy * row;
        }
        Ok(value)
    }

    /// Value of `band` at pixel coordinates `(x, y)`
    pub fn interpolate(&mut self, x: f64, y: f64, band: usize) -> Result<f64> {
        self.check_domain(x, y)?;
        if band >= self.bands {
            return Err(Error::InvalidBand {
                band,
                bands: self.bands,
            });
        }
        let (x0, y0) = self.prepare(x, y);
        self.convolve(x0, y0, band)
    }

    /// Values of every band at `(x, y)`, written to the first `num_bands`
    /// entries of `out`
    pub fn interpolate_pixel(&mut self, x: f64, y: f64, out: &mut [f64]) -> Result<()> {
        self.check_domain(x, y)?;
        if out.len() < self.bands {
            return Err(Error::InvalidParameter {
                name: "out",
                value: out.len().to_string(),
                reason: format!("buffer must hold {} bands", self.bands),
            });
        }
        let (x0, y0) = self.prepare(x, y);
        for (band, slot) in out.iter_mut().take(self.bands).enumerate() {
            *slot = self.convolve(x0, y0, band)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use tessella_core::image::TiledImage;
    use tessella_core::iterator::PixelIterator;
    use tessella_core::raster::Raster;

    /// 4×3 single-band image with value `10 * x + y`
    fn ramp() -> TiledImage {
        let data: Vec<f64> = (0..3)
            .flat_map(|y| (0..4).map(move |x| (10 * x + y) as f64))
            .collect();
        let raster = Raster::from_vec(Rect::new(0, 0, 4, 3), 1, data).unwrap();
        TiledImage::from_raster(&raster, 2, 2).unwrap()
    }

    #[test]
    fn test_domain_uses_margin() {
        let image = ramp();
        let interp = Interpolation::nearest(PixelIterator::new(&image).unwrap()).unwrap();
        let domain = interp.domain();
        assert_eq!(domain.min_x, -0.5);
        assert_eq!(domain.max_x, 3.5);
        assert_eq!(domain.max_y, 2.5);
    }

    #[test]
    fn test_outside_domain_and_nan() {
        let image = ramp();
        let mut interp = Interpolation::bilinear(PixelIterator::new(&image).unwrap()).unwrap();
        assert!(matches!(
            interp.interpolate(-0.51, 1.0, 0),
            Err(Error::OutsideDomain { .. })
        ));
        assert!(matches!(
            interp.interpolate(f64::NAN, 1.0, 0),
            Err(Error::OutsideDomain { .. })
        ));
        assert!(interp.interpolate(3.5, 2.5, 0).is_ok());
        assert!(matches!(
            interp.interpolate(1.0, 1.0, 1),
            Err(Error::InvalidBand { .. })
        ));
    }

    #[test]
    fn test_integer_coordinates_are_exact_for_all_methods() {
        let image = ramp();
        for method in [
            InterpolationMethod::Nearest,
            InterpolationMethod::Bilinear,
            InterpolationMethod::Bicubic,
            InterpolationMethod::Lanczos,
        ] {
            let cursor = PixelIterator::new(&image).unwrap();
            let mut interp = Interpolation::new(cursor, InterpolationParams::new(method)).unwrap();
            for y in 0..3 {
                for x in 0..4 {
                    assert_relative_eq!(
                        interp.interpolate(x as f64, y as f64, 0).unwrap(),
                        (10 * x + y) as f64,
                        epsilon = 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn test_bilinear_on_a_plane_is_exact() {
        let image = ramp();
        let mut interp = Interpolation::bilinear(PixelIterator::new(&image).unwrap()).unwrap();
        assert_relative_eq!(interp.interpolate(1.5, 0.25, 0).unwrap(), 15.25);
        // Clamped at the edge: the plane flattens past the last pixel
        assert_relative_eq!(interp.interpolate(3.5, 0.0, 0).unwrap(), 30.0);
    }

    #[test]
    fn test_bicubic_reproduces_interior_plane() {
        let image = ramp();
        let mut interp = Interpolation::bicubic(PixelIterator::new(&image).unwrap()).unwrap();
        // Catmull-Rom reproduces linear functions where no tap is clamped
        assert_relative_eq!(interp.interpolate(1.5, 1.0, 0).unwrap(), 16.0, epsilon = 1e-9);
    }

    #[test]
    fn test_interpolate_pixel_fills_all_bands() {
        let data: Vec<f32> = vec![1.0, 100.0, 3.0, 300.0];
        let raster = Raster::from_vec(Rect::new(0, 0, 2, 1), 2, data).unwrap();
        let image = TiledImage::from_raster(&raster, 2, 1).unwrap();
        let mut interp = Interpolation::bilinear(PixelIterator::new(&image).unwrap()).unwrap();

        let mut out = [0.0; 2];
        interp.interpolate_pixel(0.5, 0.0, &mut out).unwrap();
        assert_eq!(out, [2.0, 200.0]);
        assert!(interp.interpolate_pixel(0.5, 0.0, &mut [0.0; 1]).is_err());
    }

    #[test]
    fn test_unbounded_parameters_are_rejected_before_use() {
        let image = ramp();
        let params = InterpolationParams {
            method: InterpolationMethod::Lanczos,
            lanczos_window: usize::MAX / 4,
            ..Default::default()
        };
        let cursor = PixelIterator::new(&image).unwrap();
        assert!(matches!(
            Interpolation::new(cursor, params),
            Err(Error::InvalidParameter { name: "lanczos_window", .. })
        ));

        let params = InterpolationParams {
            method: InterpolationMethod::Bicubic,
            margin: 1e300,
            ..Default::default()
        };
        let cursor = PixelIterator::new(&image).unwrap();
        assert!(matches!(
            Interpolation::new(cursor, params),
            Err(Error::InvalidParameter { name: "margin", .. })
        ));
    }

    #[test]
    fn test_lanczos_fractional_matches_hand_computed_weights() {
        // Row 0 of the ramp is 0, 10, 20, 30; at x = 1.5 with window 2 the
        // taps are columns 0..=3 with weights lanczos2(1.5), lanczos2(0.5),
        // lanczos2(0.5), lanczos2(1.5) before normalization
        let image = ramp();
        let params = InterpolationParams {
            method: InterpolationMethod::Lanczos,
            lanczos_window: 2,
            ..Default::default()
        };
        let mut interp = Interpolation::new(PixelIterator::new(&image).unwrap(), params).unwrap();

        let outer = 2.0 * (1.5 * PI).sin() * (0.75 * PI).sin() / (1.5 * PI).powi(2);
        let inner = 2.0 * (0.5 * PI).sin() * (0.25 * PI).sin() / (0.5 * PI).powi(2);
        let expected = (outer * 0.0 + inner * 10.0 + inner * 20.0 + outer * 30.0)
            / (2.0 * outer + 2.0 * inner);
        assert_relative_eq!(expected, 15.0, epsilon = 1e-12);
        assert_relative_eq!(interp.interpolate(1.5, 0.0, 0).unwrap(), expected, epsilon = 1e-12);

        // Off-center: x = 1.25 → taps 0..=3 at distances 1.25, 0.25, 0.75, 1.75
        let l2 = |t: f64| 2.0 * (PI * t).sin() * (PI * t / 2.0).sin() / (PI * t).powi(2);
        let w = [l2(1.25), l2(0.25), l2(0.75), l2(1.75)];
        let sum: f64 = w.iter().sum();
        let expected = (w[1] * 10.0 + w[2] * 20.0 + w[3] * 30.0) / sum;
        assert_relative_eq!(interp.interpolate(1.25, 0.0, 0).unwrap(), expected, epsilon = 1e-12);
        assert_relative_eq!(expected, 12.8143, epsilon = 1e-3);
    }

    #[test]
    fn test_bicubic_fractional_matches_keys_weights() {
        // Column 1 of the ramp is 10, 11, 12; clamping repeats row 2 below
        // Taps at y = 0.5 are rows -1..=2 → clamped values 10, 10, 11, 12
        // with Catmull-Rom weights -0.0625, 0.5625, 0.5625, -0.0625
        let image = ramp();
        let mut interp = Interpolation::bicubic(PixelIterator::new(&image).unwrap()).unwrap();
        let expected = -0.0625 * 10.0 + 0.5625 * 10.0 + 0.5625 * 11.0 - 0.0625 * 12.0;
        assert_relative_eq!(expected, 10.4375);
        assert_relative_eq!(interp.interpolate(1.0, 0.5, 0).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_into_inner_returns_cursor() {
        let image = ramp();
        let cursor = PixelIterator::with_area(&image, Rect::new(1, 1, 2, 2)).unwrap();
        let interp = Interpolation::nearest(cursor).unwrap();
        assert_eq!(interp.radius(), 0);
        assert_eq!(interp.into_inner().boundary(), Rect::new(1, 1, 2, 2));
    }
}
