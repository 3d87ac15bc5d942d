//! Interpolation methods and their parameters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tessella_core::{Error, Result};

/// Resampling kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Value of the closest pixel
    #[default]
    Nearest,
    /// Linear in x and y over a 2×2 window
    Bilinear,
    /// Keys cubic convolution over a 4×4 window
    Bicubic,
    /// Windowed sinc over a 2a×2a window
    Lanczos,
}

impl InterpolationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            InterpolationMethod::Nearest => "nearest",
            InterpolationMethod::Bilinear => "bilinear",
            InterpolationMethod::Bicubic => "bicubic",
            InterpolationMethod::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nearest" | "neighbor" | "neighbour" => Ok(InterpolationMethod::Nearest),
            "bilinear" | "linear" => Ok(InterpolationMethod::Bilinear),
            "bicubic" | "cubic" => Ok(InterpolationMethod::Bicubic),
            "lanczos" => Ok(InterpolationMethod::Lanczos),
            _ => Err(Error::InvalidParameter {
                name: "method",
                value: s.to_string(),
                reason: "expected nearest, bilinear, bicubic or lanczos".into(),
            }),
        }
    }
}

/// Largest accepted Lanczos window
pub const MAX_LANCZOS_WINDOW: usize = 16;

/// Largest accepted domain margin, in pixels
pub const MAX_MARGIN: f64 = 8.0;

/// Parameters for [`crate::Interpolation`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationParams {
    pub method: InterpolationMethod,
    /// Distance in pixels past the first and last pixel centers still
    /// accepted as input
    pub margin: f64,
    /// Keys cubic coefficient
    pub cubic_a: f64,
    /// Lanczos window `a`; the kernel reads `2a` taps per axis
    pub lanczos_window: usize,
}

impl Default for InterpolationParams {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::default(),
            margin: 0.5,
            cubic_a: -0.5,
            lanczos_window: 3,
        }
    }
}

impl InterpolationParams {
    pub fn new(method: InterpolationMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Support radius of the configured kernel, in pixels
    pub fn radius(&self) -> usize {
        match self.method {
            InterpolationMethod::Nearest => 0,
            InterpolationMethod::Bilinear => 1,
            InterpolationMethod::Bicubic => 2,
            InterpolationMethod::Lanczos => self.lanczos_window,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=MAX_MARGIN).contains(&self.margin) {
            return Err(Error::InvalidParameter {
                name: "margin",
                value: self.margin.to_string(),
                reason: format!("must be between 0 and {} pixels", MAX_MARGIN),
            });
        }
        if !self.cubic_a.is_finite() {
            return Err(Error::InvalidParameter {
                name: "cubic_a",
                value: self.cubic_a.to_string(),
                reason: "must be finite".into(),
            });
        }
        if !(1..=MAX_LANCZOS_WINDOW).contains(&self.lanczos_window) {
            return Err(Error::InvalidParameter {
                name: "lanczos_window",
                value: self.lanczos_window.to_string(),
                reason: format!("must be between 1 and {}", MAX_LANCZOS_WINDOW),
            });
        }
        Ok(())
    }
}
