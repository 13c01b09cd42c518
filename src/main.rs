use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::{bail, Context};
use clap::Parser;
use rayon::prelude::*;

use soil_pore_rust_lib::{
    get_image_files_in_dir, load_image, process_image, record_global_stats, Calibration, Config,
    PoreAnalysis,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "SoilPoreR - Pore Morphometry for Soil Thin Sections")]
struct Args {
    /// Path to input mosaic or directory of mosaics
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file (defaults are used if it is absent)
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Pixels per micrometre (overwrites config)
    #[clap(long)]
    calibration: Option<Calibration>,

    /// Region of interest as x1,y1,x2,y2 (overwrites config)
    #[clap(long, value_parser = parse_roi)]
    roi: Option<[u32; 4]>,

    /// Replace existing output files
    #[clap(long)]
    overwrite: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

fn parse_roi(text: &str) -> Result<[u32; 4], String> {
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<u32>().map_err(|e| format!("'{}': {}", part, e)))
        .collect::<Result<Vec<u32>, String>>()?;

    match values.as_slice() {
        &[x1, y1, x2, y2] => Ok([x1, y1, x2, y2]),
        _ => Err(format!("expected 4 comma-separated values, got {}", values.len())),
    }
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        log::info!("Config file {} not found, using defaults", args.config);
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if let Some(calibration) = args.calibration {
        config.pixel_calibration = calibration.pixels_per_unit();
    }

    if let Some(roi) = args.roi {
        config.roi = Some(roi);
    }

    if args.overwrite {
        config.overwrite_outputs = true;
    }

    Ok(config)
}

fn analyze_file(path: &Path, config: &Config) -> anyhow::Result<(String, PoreAnalysis)> {
    println!("Processing: {}", path.display());

    let input_image = load_image(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let mosaic_name = input_image.filename.clone();

    let analysis = process_image(input_image, config)
        .with_context(|| format!("Failed to analyze {}", path.display()))?;

    for notice in &analysis.notices {
        println!("  {}: {}", mosaic_name, notice);
    }

    Ok((mosaic_name, analysis))
}

/// Main function
fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = load_config(&args)?;

    // Validate configuration
    config.validate()?;

    // Start timing
    let start_time = Instant::now();

    let input_path = PathBuf::from(&config.input_path);

    let files = if input_path.is_file() {
        println!("Processing single file: {}", input_path.display());
        vec![input_path]
    } else if input_path.is_dir() {
        println!("Processing directory: {}", input_path.display());
        let files = get_image_files_in_dir(&input_path)?;
        println!("Found {} image files", files.len());
        files
    } else {
        bail!("Input path {} is neither a file nor a directory", input_path.display());
    };

    let results: Vec<anyhow::Result<(String, PoreAnalysis)>> = if config.use_parallel {
        files.par_iter().map(|path| analyze_file(path, &config)).collect()
    } else {
        files.iter().map(|path| analyze_file(path, &config)).collect()
    };

    // Global statistics are appended in input order
    let mut failures = 0usize;
    for result in results {
        match result {
            Ok((mosaic_name, analysis)) => {
                record_global_stats(&config, &mosaic_name, &analysis.summary)
                    .with_context(|| format!("Failed to record global stats for {}", mosaic_name))?;
            }
            Err(e) => {
                log::error!("{:#}", e);
                failures += 1;
            }
        }
    }

    // Report elapsed time
    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    if failures > 0 {
        bail!("{} of {} mosaics failed", failures, files.len());
    }

    Ok(())
}
