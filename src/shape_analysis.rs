// src/shape_analysis.rs - Per-pore geometric descriptors

use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use std::f64::consts::PI;

use crate::calibration::Calibration;
use crate::ellipse_fit::fit_ellipse;
use crate::pore::PoreRecord;

/// Shape index below which a pore is modelled as a rectangle
pub const RECTANGLE_SHAPE_LIMIT: f64 = PI / 4.0;

/// Shape and size descriptors of a single pore.
///
/// Lengths (`equivalent_diameter`, ellipse axes, rectangle sides) are in
/// physical units; the indices are dimensionless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoreDescriptors {
    pub shape_index: f64,
    pub convex_shape_index: f64,
    pub elongation: f64,
    /// `None` when the convex shape index is not positive
    pub irregularity_angle_deg: Option<f64>,
    pub equivalent_diameter: f64,
    /// Ellipse values are `None` when the outer ring cannot be fitted
    pub ellipse_minor: Option<f64>,
    pub ellipse_major: Option<f64>,
    pub ellipse_angle: Option<f64>,
    /// Rectangle sides, only reported for shape indices below pi/4
    pub rect_minor: Option<f64>,
    pub rect_major: Option<f64>,
}

/// Area enclosed by a closed ring (shoelace formula)
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let n = points.len();
    let twice_area: i64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
        })
        .sum();

    twice_area.abs() as f64 / 2.0
}

/// Calculate the perimeter of a closed ring of contour points
pub fn calculate_perimeter(contour_points: &[Point<i32>]) -> f64 {
    if contour_points.len() < 2 {
        return 0.0;
    }

    let mut perimeter = 0.0;
    let n = contour_points.len();

    for i in 0..n {
        let p1 = contour_points[i];
        let p2 = contour_points[(i + 1) % n]; // Wrap around to first point

        let dx = (p2.x - p1.x) as f64;
        let dy = (p2.y - p1.y) as f64;
        perimeter += (dx * dx + dy * dy).sqrt();
    }

    perimeter
}

/// Area of the convex hull of a ring
pub fn convex_hull_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    polygon_area(&convex_hull(points))
}

/// Isoperimetric compactness 4πA/P², 1.0 for a perfect circle
pub fn calculate_shape_index(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    (4.0 * PI * area) / (perimeter * perimeter)
}

/// Sides `(a, b)`, `a <= b`, of the rectangle with the given area and perimeter.
///
/// Solves `t² - (P/2) t + A = 0`; `None` when no real rectangle exists.
pub fn rectangle_sides(area: f64, perimeter: f64) -> Option<(f64, f64)> {
    let quarter = perimeter / 4.0;
    let discriminant = quarter * quarter - area;
    if discriminant < 0.0 || area <= 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    Some((quarter - root, quarter + root))
}

/// Compute every descriptor of a pore.
///
/// Returns `None` when the pore has no positive net area or perimeter; such
/// pores still count towards the global totals but cannot be classified.
pub fn compute_descriptors(pore: &PoreRecord, calibration: Calibration) -> Option<PoreDescriptors> {
    let area = pore.net_area;
    let perimeter = pore.net_perimeter;

    if !(area > 0.0 && perimeter > 0.0) {
        log::debug!(
            "Pore {} is degenerate (area {:.2}, perimeter {:.2}), descriptors unavailable",
            pore.id, area, perimeter
        );
        return None;
    }

    let shape_index = calculate_shape_index(area, perimeter);

    let convex_area = convex_hull_area(pore.outer.points())
        - pore
            .inclusions
            .iter()
            .map(|inclusion| convex_hull_area(inclusion.points()))
            .sum::<f64>();
    let convex_shape_index = calculate_shape_index(convex_area, perimeter);

    let elongation = (shape_index * shape_index + convex_shape_index * convex_shape_index).sqrt();
    let irregularity_angle_deg = (convex_shape_index > 0.0)
        .then(|| shape_index.atan2(convex_shape_index).to_degrees());

    let equivalent_diameter = calibration.to_physical_length(2.0 * (area / PI).sqrt());

    let ellipse = fit_ellipse(pore.outer.points());

    let rect = if shape_index < RECTANGLE_SHAPE_LIMIT {
        rectangle_sides(area, perimeter)
    } else {
        None
    };

    Some(PoreDescriptors {
        shape_index,
        convex_shape_index,
        elongation,
        irregularity_angle_deg,
        equivalent_diameter,
        ellipse_minor: ellipse.map(|e| calibration.to_physical_length(e.minor_axis)),
        ellipse_major: ellipse.map(|e| calibration.to_physical_length(e.major_axis)),
        ellipse_angle: ellipse.map(|e| e.angle_deg),
        rect_minor: rect.map(|(a, _)| calibration.to_physical_length(a)),
        rect_major: rect.map(|(_, b)| calibration.to_physical_length(b)),
    })
}
