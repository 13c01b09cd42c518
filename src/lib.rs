// src/lib.rs - Library interface for SoilPoreR

pub mod calibration;
pub mod classification;
pub mod config;
pub mod contours;
pub mod edge_touch;
pub mod ellipse_fit;
pub mod errors;
pub mod hierarchy;
pub mod image_io;
pub mod image_utils;
pub mod output;
pub mod pipeline;
pub mod pore;
pub mod shape_analysis;

// Re-export commonly used types and functions
pub use errors::{PoreError, Result};
pub use config::Config;
pub use calibration::Calibration;
pub use image_utils::BinaryImage;
pub use image_io::{InputImage, get_image_files_in_dir, load_image};
pub use pipeline::{
    analyze_pores,
    process_image,
    record_global_stats,
    AnalysisNotice,
    AnalysisOptions,
    PoreAnalysis,
};

// Re-export pore model and geometry
pub use pore::{Polygon, PoreRecord};
pub use contours::extract_contours;
pub use edge_touch::{classify_edge_pores, touches_border};
pub use ellipse_fit::{fit_ellipse, EllipseFit};
pub use shape_analysis::{
    calculate_perimeter,
    calculate_shape_index,
    compute_descriptors,
    convex_hull_area,
    polygon_area,
    rectangle_sides,
    PoreDescriptors,
};

// Re-export classification and persistence
pub use classification::{
    classify_pores,
    summarize,
    valid_bin_keys,
    BinKey,
    ClassificationBins,
    ClassifiedPoreRow,
    GlobalSummary,
    IrregularityClass,
    ShapeBinningKey,
    ShapeCategory,
    SizeCategory,
    SizeClass,
    SizeClassBounds,
    SizeMetric,
};
pub use hierarchy::{load_pore_hierarchy, write_pore_hierarchy, PoreHierarchy};
pub use output::{append_global_stats, write_classification_csvs};
