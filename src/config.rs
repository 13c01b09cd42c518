use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::calibration::Calibration;
use crate::classification::{ShapeBinningKey, SizeClassBounds};
use crate::edge_touch::DEFAULT_BORDER_MARGIN;
use crate::errors::{PoreError, Result};

/// Configuration for SoilPoreR
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    /// Pixels per micrometre of the mosaic
    #[serde(default = "default_pixel_calibration")]
    pub pixel_calibration: f64,

    /// Width (pixels) of the border band used for edge-touch detection
    #[serde(default = "default_border_margin")]
    pub border_margin: u32,

    /// Optional crop `[x1, y1, x2, y2]` applied before analysis
    #[serde(default)]
    pub roi: Option<[u32; 4]>,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default)]
    pub overwrite_outputs: bool,

    #[serde(default = "default_global_stats_filename")]
    pub global_stats_filename: String,

    #[serde(default = "default_write_hierarchy")]
    pub write_hierarchy: bool,

    #[serde(default)]
    pub shape_binning_key: ShapeBinningKey,

    #[serde(default)]
    pub size_classes: SizeClassBounds,
}

fn default_pixel_calibration() -> f64 {
    0.3051
}

fn default_border_margin() -> u32 {
    DEFAULT_BORDER_MARGIN
}

fn default_parallel() -> bool {
    true
}

fn default_global_stats_filename() -> String {
    "global_pore_stats.csv".to_string()
}

fn default_write_hierarchy() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            pixel_calibration: default_pixel_calibration(),
            border_margin: default_border_margin(),
            roi: None,
            use_parallel: true,
            overwrite_outputs: false,
            global_stats_filename: default_global_stats_filename(),
            write_hierarchy: true,
            shape_binning_key: ShapeBinningKey::default(),
            size_classes: SizeClassBounds::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PoreError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        Self::from_toml_str(&content).map_err(|e| {
            PoreError::Config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PoreError::Config(e.to_string()))
    }

    /// Validated calibration value
    pub fn calibration(&self) -> Result<Calibration> {
        Calibration::new(self.pixel_calibration)
    }

    /// Validate analysis parameters without touching the filesystem
    pub fn validate_parameters(&self) -> Result<()> {
        self.calibration()?;

        if self.border_margin == 0 {
            return Err(PoreError::Config("border_margin must be at least 1 pixel".to_string()));
        }

        if let Some([x1, y1, x2, y2]) = self.roi {
            if x1 == x2 || y1 == y2 {
                return Err(PoreError::InvalidRoi(format!(
                    "roi {:?} has zero width or height",
                    [x1, y1, x2, y2]
                )));
            }
        }

        if self.global_stats_filename.trim().is_empty() {
            return Err(PoreError::Config(
                "global_stats_filename must not be empty".to_string(),
            ));
        }

        self.size_classes.validate()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Check input path exists
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(PoreError::InvalidPath(input_path));
        }

        self.validate_parameters()?;

        // Create output directory if it doesn't exist
        fs::create_dir_all(&self.output_base_dir).map_err(|e| {
            PoreError::Io(io::Error::new(
                ErrorKind::Other,
                format!("Failed to create output directory: {}", e),
            ))
        })?;

        Ok(())
    }
}
