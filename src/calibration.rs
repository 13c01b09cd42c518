// src/calibration.rs - Pixel calibration and the 50-unit size threshold

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::errors::{PoreError, Result};

/// Diameter (in physical units, e.g. µm) separating small from large pores
pub const SIZE_THRESHOLD_DIAMETER: f64 = 50.0;

/// Pixels per physical length unit. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration(f64);

impl Calibration {
    pub fn new(pixels_per_unit: f64) -> Result<Self> {
        if !pixels_per_unit.is_finite() {
            return Err(PoreError::InvalidCalibration(format!(
                "{} is not a finite number",
                pixels_per_unit
            )));
        }
        if pixels_per_unit <= 0.0 {
            return Err(PoreError::InvalidCalibration(format!(
                "{} must be > 0.0",
                pixels_per_unit
            )));
        }
        Ok(Self(pixels_per_unit))
    }

    pub fn pixels_per_unit(self) -> f64 {
        self.0
    }

    /// Convert a length measured in pixels to physical units
    #[inline]
    pub fn to_physical_length(self, pixels: f64) -> f64 {
        pixels / self.0
    }

    /// Pixel area of a circle whose diameter is `SIZE_THRESHOLD_DIAMETER`
    /// physical units, rounded to the nearest whole pixel.
    pub fn area_50(self) -> u64 {
        let diameter_px = SIZE_THRESHOLD_DIAMETER * self.0;
        (PI * (diameter_px / 2.0).powi(2)).round() as u64
    }
}

impl FromStr for Calibration {
    type Err = PoreError;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s.trim().parse().map_err(|_| {
            PoreError::InvalidCalibration(format!("'{}' is not a number", s))
        })?;
        Self::new(value)
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} px/unit", self.0)
    }
}
