// src/edge_touch.rs - Flag pores whose outer boundary reaches the image border

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::pore::{BoundingBox, Polygon};

/// Default width of the border band, in pixels
pub const DEFAULT_BORDER_MARGIN: u32 = 1;

const MASK_ON: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    /// Whether the bounding box comes within `margin` pixels of this side
    fn is_near(self, bbox: &BoundingBox, width: i32, height: i32, margin: i32) -> bool {
        match self {
            Side::Left => bbox.min_x <= margin,
            Side::Right => bbox.max_x >= width - 1 - margin,
            Side::Top => bbox.min_y <= margin,
            Side::Bottom => bbox.max_y >= height - 1 - margin,
        }
    }
}

/// Determine whether a polygon touches the border of a `width` x `height` image.
///
/// Only polygons whose bounding box comes near an edge are rasterised, and
/// then only into a mask the size of that bounding box, so the total cost over
/// all pores stays proportional to the sum of their bounding-box areas.
pub fn touches_border(polygon: &Polygon, width: u32, height: u32, margin: u32) -> bool {
    let bbox = polygon.bounding_box();
    let (w, h, m) = (width as i32, height as i32, margin as i32);

    let near_sides: Vec<Side> = Side::ALL
        .into_iter()
        .filter(|side| side.is_near(&bbox, w, h, m))
        .collect();

    if near_sides.is_empty() {
        return false;
    }

    let mask = rasterize_local(polygon, &bbox);

    near_sides
        .into_iter()
        .any(|side| band_has_foreground(&mask, &bbox, side, w, h, m))
}

/// Edge-touch flag for every outer polygon, in input order
pub fn classify_edge_pores<'a, I>(outers: I, width: u32, height: u32, margin: u32) -> Vec<bool>
where
    I: IntoIterator<Item = &'a Polygon>,
{
    outers
        .into_iter()
        .map(|polygon| touches_border(polygon, width, height, margin))
        .collect()
}

/// Fill the polygon into a mask covering only its bounding box
fn rasterize_local(polygon: &Polygon, bbox: &BoundingBox) -> GrayImage {
    let mut mask = GrayImage::new(bbox.width(), bbox.height());
    let local: Vec<Point<i32>> = polygon
        .points()
        .iter()
        .map(|p| Point::new(p.x - bbox.min_x, p.y - bbox.min_y))
        .collect();

    draw_polygon_mut(&mut mask, &local, Luma([MASK_ON]));

    // The ring itself is part of the pore even where the fill is degenerate
    for p in &local {
        mask.put_pixel(p.x as u32, p.y as u32, Luma([MASK_ON]));
    }

    mask
}

/// Scan only the part of the mask that overlaps the side's border band.
///
/// The band is `x < margin` (left), `x >= width - margin` (right) and the
/// same for rows, in image coordinates.
fn band_has_foreground(
    mask: &GrayImage,
    bbox: &BoundingBox,
    side: Side,
    width: i32,
    height: i32,
    margin: i32,
) -> bool {
    let (mask_w, mask_h) = (mask.width() as i32, mask.height() as i32);

    let (x_range, y_range) = match side {
        Side::Left => (0..(margin - bbox.min_x).clamp(0, mask_w), 0..mask_h),
        Side::Right => ((width - margin - bbox.min_x).clamp(0, mask_w)..mask_w, 0..mask_h),
        Side::Top => (0..mask_w, 0..(margin - bbox.min_y).clamp(0, mask_h)),
        Side::Bottom => (0..mask_w, (height - margin - bbox.min_y).clamp(0, mask_h)..mask_h),
    };

    y_range
        .flat_map(|ly| x_range.clone().map(move |lx| (lx, ly)))
        .any(|(lx, ly)| mask.get_pixel(lx as u32, ly as u32)[0] == MASK_ON)
}
