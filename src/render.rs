//! Drawing of classified boxes onto the display frame and the shadow mask.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::classifier::Classification;
use crate::tracker::{BoundingBox, Midpoint};

/// Border thickness of box outlines, in pixels.
pub const BOX_THICKNESS: i32 = 2;

/// Radius of the midpoint marker, in pixels.
pub const MIDPOINT_RADIUS: i32 = 4;

/// Draw a thick rectangle, growing outwards from `bbox`.
pub fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: i32) {
    if bbox.is_empty() {
        return;
    }
    for offset in 0..thickness {
        let rect = Rect::at(bbox.x as i32 - offset, bbox.y as i32 - offset).of_size(
            bbox.width + (offset * 2) as u32,
            bbox.height + (offset * 2) as u32,
        );
        draw_hollow_rect_mut(img, rect, color);
    }
}

pub fn draw_midpoint(img: &mut RgbImage, point: Midpoint, color: Rgb<u8>) {
    draw_filled_circle_mut(img, (point.x as i32, point.y as i32), MIDPOINT_RADIUS, color);
}

/// Outline each box on `frame` and mark its midpoint on both `frame` and `shadow`.
pub fn draw_classifications(
    frame: &mut RgbImage,
    shadow: &mut RgbImage,
    classifications: &[Classification],
) {
    for c in classifications {
        let color = c.color.rgb();
        draw_box(frame, &c.bbox, color, BOX_THICKNESS);
        draw_midpoint(frame, c.midpoint, color);
        draw_midpoint(shadow, c.midpoint, color);
    }
}
