// src/pipeline.rs - Per-mosaic analysis: extraction, edge flags, descriptors, classification

use std::fmt;
use std::path::{Path, PathBuf};

use crate::calibration::Calibration;
use crate::classification::{
    classify_pores, summarize, ClassificationBins, GlobalSummary, ShapeBinningKey, SizeClassBounds,
};
use crate::config::Config;
use crate::contours::extract_contours;
use crate::edge_touch::{classify_edge_pores, DEFAULT_BORDER_MARGIN};
use crate::errors::Result;
use crate::hierarchy::{write_pore_hierarchy, PoreHierarchy};
use crate::image_io::{prepare_binary, InputImage};
use crate::image_utils::BinaryImage;
use crate::output::{append_global_stats, ensure_writable, write_classification_csvs};
use crate::pore::PoreRecord;
use crate::shape_analysis::{compute_descriptors, PoreDescriptors};

/// Engine parameters that do not depend on the calibration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub border_margin: u32,
    pub shape_binning_key: ShapeBinningKey,
    pub size_classes: SizeClassBounds,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            border_margin: DEFAULT_BORDER_MARGIN,
            shape_binning_key: ShapeBinningKey::default(),
            size_classes: SizeClassBounds::default(),
        }
    }
}

impl From<&Config> for AnalysisOptions {
    fn from(config: &Config) -> Self {
        Self {
            border_margin: config.border_margin,
            shape_binning_key: config.shape_binning_key,
            size_classes: config.size_classes.clone(),
        }
    }
}

/// Non-fatal conditions reported alongside the results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisNotice {
    NoContoursFound,
}

impl fmt::Display for AnalysisNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisNotice::NoContoursFound => write!(f, "no contours found in image"),
        }
    }
}

/// Everything derived from one binary image and one calibration
#[derive(Debug, Clone, PartialEq)]
pub struct PoreAnalysis {
    pub pores: Vec<PoreRecord>,
    /// Parallel to `pores`; `None` for small or degenerate pores
    pub descriptors: Vec<Option<PoreDescriptors>>,
    pub area_50: u64,
    pub summary: GlobalSummary,
    pub bins: ClassificationBins,
    pub notices: Vec<AnalysisNotice>,
}

/// Run the morphometry engine on a binary image.
///
/// Pure: the image is only borrowed and identical inputs give identical output.
pub fn analyze_pores(
    image: &BinaryImage,
    calibration: Calibration,
    options: &AnalysisOptions,
) -> PoreAnalysis {
    let (width, height) = image.dimensions();
    let area_50 = calibration.area_50();
    let mut notices = Vec::new();

    // Step 1: Two-level contour extraction
    let extracted = extract_contours(image);
    if extracted.is_empty() {
        log::warn!("No contours found in {}x{} image", width, height);
        notices.push(AnalysisNotice::NoContoursFound);
    }

    // Step 2: Edge-touch flags for every outer ring
    let edge_flags = classify_edge_pores(
        extracted.iter().map(|pore| &pore.outer),
        width,
        height,
        options.border_margin,
    );

    // Step 3: Pore records in extraction order
    let pores: Vec<PoreRecord> = extracted
        .into_iter()
        .zip(edge_flags)
        .enumerate()
        .map(|(id, (pore, is_edge))| PoreRecord::new(id, is_edge, pore.outer, pore.inclusions))
        .collect();

    // Step 4: Descriptors, only for pores above the size threshold
    let descriptors: Vec<Option<PoreDescriptors>> = pores
        .iter()
        .map(|pore| {
            if pore.net_area > area_50 as f64 {
                compute_descriptors(pore, calibration)
            } else {
                None
            }
        })
        .collect();

    // Step 5: Aggregation and classification
    let summary = summarize(&pores, area_50, image.pixel_area());
    let bins = classify_pores(
        &pores,
        &descriptors,
        area_50,
        options.shape_binning_key,
        &options.size_classes,
    );

    log::info!(
        "{} pores ({} large, {} inclusions), porosity {:.4}, area_50 = {} px",
        summary.num_pores,
        summary.num_pores_large,
        summary.num_inclusions,
        summary.porosity,
        area_50
    );

    PoreAnalysis {
        pores,
        descriptors,
        area_50,
        summary,
        bins,
        notices,
    }
}

/// Path of the JSON pore hierarchy for a mosaic
pub fn hierarchy_path<P: AsRef<Path>>(output_dir: P, mosaic_name: &str) -> PathBuf {
    output_dir.as_ref().join(format!("{}.json", mosaic_name))
}

/// Process a single mosaic: binarize, analyze and write its per-mosaic outputs.
///
/// The global statistics row is left to `record_global_stats`, so batch runs
/// can append rows in a fixed order.
pub fn process_image(input_image: InputImage, config: &Config) -> Result<PoreAnalysis> {
    let calibration = config.calibration()?;
    let binary = prepare_binary(&input_image, config.roi)?;
    let filename = input_image.filename;

    log::debug!(
        "Analyzing {} ({}x{}) at {}",
        input_image.path.display(),
        binary.width(),
        binary.height(),
        calibration
    );

    let analysis = analyze_pores(&binary, calibration, &AnalysisOptions::from(config));

    let json_path = hierarchy_path(&config.output_base_dir, &filename);
    if config.write_hierarchy {
        ensure_writable(&json_path, config.overwrite_outputs)?;
    }

    let written = write_classification_csvs(
        &analysis.bins,
        &config.output_base_dir,
        &filename,
        config.overwrite_outputs,
    )?;
    log::debug!("Wrote {} classification files for {}", written.len(), filename);

    if config.write_hierarchy {
        let hierarchy = PoreHierarchy::from_pores(&analysis.pores);
        write_pore_hierarchy(&hierarchy, &json_path, config.overwrite_outputs)?;
    }

    Ok(analysis)
}

/// Append a mosaic's summary row to the global statistics file
pub fn record_global_stats(config: &Config, mosaic_name: &str, summary: &GlobalSummary) -> Result<()> {
    let path = Path::new(&config.output_base_dir).join(&config.global_stats_filename);
    append_global_stats(path, mosaic_name, summary)
}
