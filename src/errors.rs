use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for SoilPoreR
#[derive(Error, Debug)]
pub enum PoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pixel calibration: {0}")]
    InvalidCalibration(String),

    #[error("Image is not binary: found pixel value {value} (expected 0 or 255)")]
    NonBinaryImage { value: u8 },

    #[error("Invalid region of interest: {0}")]
    InvalidRoi(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output file already exists: {0}")]
    OutputExists(PathBuf),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Invalid pore hierarchy: {0}")]
    InvalidHierarchy(String),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, PoreError>;
