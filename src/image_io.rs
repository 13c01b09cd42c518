use std::path::{Path, PathBuf};
use std::fs;
use image::GrayImage;

use crate::errors::{PoreError, Result};
use crate::image_utils::{crop_to_roi, BinaryImage};

/// Extensions accepted when scanning a directory of mosaics
const MOSAIC_EXTENSIONS: [&str; 6] = ["tif", "tiff", "png", "jpg", "jpeg", "bmp"];

/// Represents an input mosaic with its metadata
pub struct InputImage {
    pub image: GrayImage,
    pub path: PathBuf,
    /// File stem, used as the mosaic name in every output
    pub filename: String,
}

/// Get all mosaic images from a directory (recursively), sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(PoreError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(PoreError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut image_files = Vec::new();
    find_image_files_recursive(dir_path, &mut image_files)?;
    image_files.sort();

    Ok(image_files)
}

fn is_mosaic_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            MOSAIC_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn find_image_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_image_files_recursive(&path, result)?;
        } else if path.is_file() && is_mosaic_file(&path) {
            result.push(path);
        }
    }

    Ok(())
}

/// Load a mosaic as 8-bit grayscale
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| PoreError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let img = image::open(path).map_err(PoreError::Image)?;

    Ok(InputImage {
        image: img.to_luma8(),
        path: path.to_path_buf(),
        filename,
    })
}

/// Crop to the optional region of interest and binarize
pub fn prepare_binary(input: &InputImage, roi: Option<[u32; 4]>) -> Result<BinaryImage> {
    let gray = match roi {
        Some(roi) => crop_to_roi(&input.image, roi)?,
        None => input.image.clone(),
    };

    Ok(BinaryImage::from_gray(gray))
}
