use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use csv::{Writer, WriterBuilder};

use crate::classification::{valid_bin_keys, ClassificationBins, ClassifiedPoreRow, GlobalSummary};
use crate::errors::{PoreError, Result};

/// Header of the global statistics sheet
pub const GLOBAL_STATS_HEADER: [&str; 10] = [
    "Mosaic",
    "Num pores",
    "Num inclusions",
    "Porosity",
    "Num pores <= 50",
    "Num inclusions <= 50",
    "% area <= 50",
    "Num pores > 50",
    "Num inclusions > 50",
    "% area > 50",
];

/// Refuse to replace an existing file unless overwriting is allowed
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(PoreError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

fn is_edge_text(is_edge: bool) -> &'static str {
    if is_edge { "True" } else { "False" }
}

/// Append one mosaic's summary to the global statistics CSV.
///
/// The header is written only when the file is created.
pub fn append_global_stats<P: AsRef<Path>>(
    path: P,
    mosaic_name: &str,
    summary: &GlobalSummary,
) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(PoreError::Io)?;
    }

    let is_new = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    if is_new {
        writer.write_record(GLOBAL_STATS_HEADER)?;
    }

    writer.write_record(&[
        mosaic_name.to_string(),
        summary.num_pores.to_string(),
        summary.num_inclusions.to_string(),
        format!("{:.6}", summary.porosity),
        summary.num_pores_small.to_string(),
        summary.num_inclusions_small.to_string(),
        format!("{:.6}", summary.pct_area_small),
        summary.num_pores_large.to_string(),
        summary.num_inclusions_large.to_string(),
        format!("{:.6}", summary.pct_area_large),
    ])?;

    // Flush writer
    writer.flush().map_err(|e| PoreError::CsvOutput(csv::Error::from(e)))?;

    Ok(())
}

/// Write one CSV per valid (shape, size) pairing under
/// `output_dir/<mosaic>/<shape>/<size>.csv`. Empty bins get a header-only file.
pub fn write_classification_csvs<P: AsRef<Path>>(
    bins: &ClassificationBins,
    output_dir: P,
    mosaic_name: &str,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let mosaic_dir = output_dir.as_ref().join(mosaic_name);
    let keys = valid_bin_keys();

    // Check everything first so a refused run leaves no partial output
    let targets: Vec<PathBuf> = keys
        .iter()
        .map(|key| {
            mosaic_dir
                .join(key.shape.name())
                .join(format!("{}.csv", key.size.name()))
        })
        .collect();
    for target in &targets {
        ensure_writable(target, overwrite)?;
    }

    for (key, target) in keys.iter().zip(&targets) {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(PoreError::Io)?;
        }

        let rows = bins.get(key).map(Vec::as_slice).unwrap_or(&[]);
        let metric = key.size.metric;
        let mut writer = Writer::from_path(target)?;

        writer.write_record(&[
            "Pore id",
            "is_edge",
            "Area",
            "Perimeter",
            "Shape",
            "Convex Shape",
            "Pore elongation",
            "Irregular",
            "Slightly irregulars",
            "Slightly regulars",
            "Regulars",
            metric.column_name(),
            metric.secondary_column_name().unwrap_or(""),
            "Angle(if elongated)",
        ])?;

        for row in rows {
            writer.write_record(&classified_row_record(row))?;
        }

        writer.flush().map_err(|e| PoreError::CsvOutput(csv::Error::from(e)))?;
    }

    Ok(targets)
}

fn classified_row_record(row: &ClassifiedPoreRow) -> Vec<String> {
    let [irregular, slightly_irregular, slightly_regular, regular] = row.irregularity.flags();

    vec![
        row.id.to_string(),
        is_edge_text(row.is_edge).to_string(),
        format!("{:.6}", row.area),
        format!("{:.6}", row.perimeter),
        format!("{:.6}", row.shape_index),
        format!("{:.6}", row.convex_shape_index),
        format!("{:.6}", row.elongation),
        irregular.to_string(),
        slightly_irregular.to_string(),
        slightly_regular.to_string(),
        regular.to_string(),
        format!("{:.6}", row.size_value),
        format_optional(row.secondary_size),
        format_optional(row.angle),
    ]
}
