// src/contours.rs - Two-level contour extraction (pores and their inclusions)

use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

use crate::image_utils::BinaryImage;
use crate::pore::Polygon;

/// A top-level pore boundary with the inclusion boundaries nested directly inside it
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPore {
    pub outer: Polygon,
    pub inclusions: Vec<Polygon>,
}

/// Decompose a binary image into pores and inclusions.
///
/// Every outer border becomes a pore, every hole border becomes an inclusion
/// of the outer border enclosing it. Foreground islands sitting inside a hole
/// are outer borders too, so they come back as pores of their own. Pores are
/// returned in border-following (raster) order, which fixes their ids.
///
/// Everything outside the image counts as background, so blobs touching any
/// side (including column 0) are traced as outer borders.
pub fn extract_contours(image: &BinaryImage) -> Vec<ExtractedPore> {
    let padded = pad_with_background(image);
    let contours: Vec<Contour<i32>> = find_contours(&padded);

    // Maps a contour index to the pore it produced, if any
    let mut pore_slots: Vec<Option<usize>> = vec![None; contours.len()];
    let mut pores: Vec<ExtractedPore> = Vec::new();
    let mut holes = Vec::new();
    let mut dropped = 0usize;
    let mut orphaned = 0usize;

    for (idx, contour) in contours.into_iter().enumerate() {
        let points = unpad(contour.points);
        match contour.border_type {
            BorderType::Outer => match Polygon::new(points) {
                Some(outer) => {
                    pore_slots[idx] = Some(pores.len());
                    pores.push(ExtractedPore {
                        outer,
                        inclusions: Vec::new(),
                    });
                }
                None => dropped += 1,
            },
            BorderType::Hole => holes.push((contour.parent, points)),
        }
    }

    for (parent, points) in holes {
        let Some(pore_idx) = parent.and_then(|p| pore_slots.get(p).copied().flatten()) else {
            // Parent outer border was degenerate
            orphaned += 1;
            continue;
        };
        match Polygon::new(points) {
            Some(hole) => pores[pore_idx].inclusions.push(hole),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::debug!("Dropped {} degenerate contours (fewer than 3 points)", dropped);
    }
    if orphaned > 0 {
        log::debug!("Dropped {} hole contours whose pore was degenerate", orphaned);
    }

    pores
}

/// Copy of the image with a one-pixel background frame
fn pad_with_background(image: &BinaryImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut padded, image.as_gray(), 1, 1);
    padded
}

/// Shift points traced on the padded image back to image coordinates
fn unpad(points: Vec<Point<i32>>) -> Vec<Point<i32>> {
    points
        .into_iter()
        .map(|p| Point::new(p.x - 1, p.y - 1))
        .collect()
}
