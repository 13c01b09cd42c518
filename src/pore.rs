// src/pore.rs - Polygon and pore record types shared by every analysis stage

use imageproc::point::Point;

use crate::shape_analysis::{calculate_perimeter, polygon_area};

/// Axis-aligned bounding box in pixel coordinates (inclusive on both ends)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x + 1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y + 1) as u32
    }
}

/// A closed ring of at least three pixel-centre points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<Point<i32>>,
}

impl Polygon {
    /// Build a polygon from a traced ring, dropping an explicit closing point.
    ///
    /// Returns `None` for degenerate rings with fewer than three points.
    pub fn new(mut points: Vec<Point<i32>>) -> Option<Self> {
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        if points.len() < 3 {
            return None;
        }

        Some(Self { points })
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed area (shoelace formula over the ring)
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Length of the closed ring
    pub fn perimeter(&self) -> f64 {
        calculate_perimeter(&self.points)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.points[0];
        self.points.iter().skip(1).fold(
            BoundingBox {
                min_x: first.x,
                min_y: first.y,
                max_x: first.x,
                max_y: first.y,
            },
            |bbox, p| BoundingBox {
                min_x: bbox.min_x.min(p.x),
                min_y: bbox.min_y.min(p.y),
                max_x: bbox.max_x.max(p.x),
                max_y: bbox.max_y.max(p.y),
            },
        )
    }
}

/// A pore: its outer boundary, the solid inclusions directly inside it and
/// the net geometry that results from subtracting them.
#[derive(Debug, Clone, PartialEq)]
pub struct PoreRecord {
    /// Stable 0-based id in extraction order
    pub id: usize,
    pub is_edge: bool,
    pub outer: Polygon,
    pub inclusions: Vec<Polygon>,
    /// Outer area minus the area of every inclusion
    pub net_area: f64,
    /// Outer perimeter plus the perimeter of every inclusion
    pub net_perimeter: f64,
}

impl PoreRecord {
    pub fn new(id: usize, is_edge: bool, outer: Polygon, inclusions: Vec<Polygon>) -> Self {
        let net_area = outer.area() - inclusions.iter().map(Polygon::area).sum::<f64>();
        let net_perimeter =
            outer.perimeter() + inclusions.iter().map(Polygon::perimeter).sum::<f64>();

        Self {
            id,
            is_edge,
            outer,
            inclusions,
            net_area,
            net_perimeter,
        }
    }

    pub fn num_inclusions(&self) -> usize {
        self.inclusions.len()
    }
}
