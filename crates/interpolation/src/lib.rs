//! # Tessella Interpolation
//!
//! Sampling of tiled images at fractional pixel coordinates:
//! - Nearest: value of the closest pixel
//! - Bilinear: 2×2 linear weights
//! - Bicubic: 4×4 Keys cubic convolution
//! - Lanczos: windowed sinc, normalized
//!
//! plus resampling between georeferenced images built on top of them.

mod bicubic;
mod bilinear;
mod interpolator;
mod lanczos;
mod method;
mod nearest;
mod resample;

pub use interpolator::{Domain, Interpolation};
pub use method::{InterpolationMethod, InterpolationParams, MAX_LANCZOS_WINDOW, MAX_MARGIN};
pub use resample::{resample, rescale, Rescale, RescaleParams, ResampleParams, ResampleReport};
