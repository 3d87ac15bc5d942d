//! Affine georeferencing for tiled images

use serde::{Deserialize, Serialize};

/// Affine mapping between continuous pixel space and world coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// `(col, row)` is measured from the upper-left corner of the image: pixel
/// `(c, r)` covers `[c, c + 1) × [r, r + 1)` and has its center at
/// `(c + 0.5, r + 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up images
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

const DEGENERATE: f64 = 1e-12;

impl GeoTransform {
    /// Axis-aligned transform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// World coordinates equal pixel coordinates
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// From coefficients in GDAL order:
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    pub fn has_rotation(&self) -> bool {
        self.row_rotation != 0.0 || self.col_rotation != 0.0
    }

    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Inverse of [`GeoTransform::pixel_to_world`].
    ///
    /// Yields NaN coordinates when the transform cannot be inverted.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < DEGENERATE {
            return (f64::NAN, f64::NAN);
        }
        let (dx, dy) = (x - self.origin_x, y - self.origin_y);
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (self.pixel_width * dy - self.col_rotation * dx) / det,
        )
    }

    /// Pixel position in `other`'s pixel space of `(col, row)` in this one
    pub fn map_to(&self, other: &GeoTransform, col: f64, row: f64) -> (f64, f64) {
        let (x, y) = self.pixel_to_world(col, row);
        other.world_to_pixel(x, y)
    }

    /// Same origin with every pixel axis divided by its factor
    pub fn scaled(&self, scale_x: f64, scale_y: f64) -> Self {
        Self {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            pixel_width: self.pixel_width / scale_x,
            pixel_height: self.pixel_height / scale_y,
            row_rotation: self.row_rotation / scale_y,
            col_rotation: self.col_rotation / scale_x,
        }
    }

    /// Horizontal pixel size
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// World envelope `(min_x, min_y, max_x, max_y)` of a `width × height` grid
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (w, h) = (width as f64, height as f64);
        [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
            .into_iter()
            .map(|(c, r)| self.pixel_to_world(c, r))
            .fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |(x0, y0, x1, y1), (x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_to_pixel_inverts_rotated_transform() {
        let gt = GeoTransform {
            row_rotation: 0.5,
            col_rotation: -0.25,
            ..GeoTransform::new(500.0, 800.0, 2.0, -3.0)
        };
        assert!(gt.has_rotation());

        let (x, y) = gt.pixel_to_world(7.5, 3.25);
        let (col, row) = gt.world_to_pixel(x, y);
        assert_relative_eq!(col, 7.5, epsilon = 1e-10);
        assert_relative_eq!(row, 3.25, epsilon = 1e-10);
    }

    #[test]
    fn test_map_to_other_grid() {
        let coarse = GeoTransform::new(0.0, 10.0, 2.0, -2.0);
        let fine = coarse.scaled(4.0, 4.0);
        let (col, row) = coarse.map_to(&fine, 1.5, 2.0);
        assert_relative_eq!(col, 6.0);
        assert_relative_eq!(row, 8.0);
    }

    #[test]
    fn test_envelope_and_scaling() {
        let gt = GeoTransform::new(10.0, 50.0, 2.0, -2.0);
        assert_eq!(gt.bounds(20, 10), (10.0, 30.0, 50.0, 50.0));
        assert_eq!(gt.bounds(20, 10), gt.scaled(2.0, 0.5).bounds(40, 5));
        assert_relative_eq!(gt.scaled(4.0, 1.0).cell_size(), 0.5);
    }

    #[test]
    fn test_singular_transform_maps_to_nan() {
        let gt = GeoTransform::new(0.0, 0.0, 0.0, 1.0);
        let (col, row) = gt.world_to_pixel(1.0, 1.0);
        assert!(col.is_nan() && row.is_nan());
        assert!(!GeoTransform::default().has_rotation());
    }
}
