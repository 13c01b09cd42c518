use image::{imageops, GrayImage};
use imageproc::contrast::{otsu_level, threshold};

use crate::errors::{PoreError, Result};

/// Constants
pub const FOREGROUND: u8 = 255; // Value of pore (void) pixels in a binary mosaic
pub const BACKGROUND: u8 = 0;

/// A two-level raster: every pixel is either `BACKGROUND` or `FOREGROUND`.
///
/// The engine only ever borrows this; it is never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryImage {
    pixels: GrayImage,
}

impl BinaryImage {
    /// Wrap an already-binary grayscale image, rejecting any other pixel value
    pub fn new(pixels: GrayImage) -> Result<Self> {
        if let Some(value) = first_non_binary_value(&pixels) {
            return Err(PoreError::NonBinaryImage { value });
        }
        Ok(Self { pixels })
    }

    /// Build a binary image from arbitrary grayscale input.
    ///
    /// Inputs that are already two-level are kept untouched, anything else is
    /// thresholded at Otsu's level.
    pub fn from_gray(gray: GrayImage) -> Self {
        if first_non_binary_value(&gray).is_none() {
            return Self { pixels: gray };
        }

        let level = otsu_level(&gray);
        log::debug!("Input is not binary, applying Otsu threshold at level {}", level);
        Self {
            pixels: threshold(&gray, level),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Total number of pixels, used as the porosity denominator
    pub fn pixel_area(&self) -> u64 {
        self.pixels.width() as u64 * self.pixels.height() as u64
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y)[0] == FOREGROUND
    }
}

/// Returns the first pixel value that is neither 0 nor 255, if any
fn first_non_binary_value(image: &GrayImage) -> Option<u8> {
    image
        .pixels()
        .map(|p| p[0])
        .find(|&v| v != FOREGROUND && v != BACKGROUND)
}

/// Crop a grayscale image to the half-open rectangle `[x1, x2) x [y1, y2)`.
///
/// Coordinates are clamped to the image; an empty result is an error.
pub fn crop_to_roi(image: &GrayImage, roi: [u32; 4]) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    let [x1, y1, x2, y2] = roi;

    let (x1, x2) = (x1.min(x2).min(width), x1.max(x2).min(width));
    let (y1, y2) = (y1.min(y2).min(height), y1.max(y2).min(height));

    if x2 <= x1 || y2 <= y1 {
        return Err(PoreError::InvalidRoi(format!(
            "region {:?} is empty inside a {}x{} image",
            roi, width, height
        )));
    }

    Ok(imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}
