//! Grayscale appearance template matched by normalized cross-correlation.

use image::RgbImage;
use ndarray::{Array2, ArrayView2, s};

use crate::tracker::rect::BoundingBox;

/// Variance below which a patch is considered flat.
const FLAT_EPSILON: f32 = 1e-6;

/// Convert an RGB frame to a luma plane indexed as `[row, column]`.
pub fn gray_plane(frame: &RgbImage) -> Array2<f32> {
    let luma = image::imageops::grayscale(frame);
    let (width, height) = luma.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        luma.get_pixel(col as u32, row as u32).0[0] as f32
    })
}

/// Cut the region covered by `bbox` out of a plane.
///
/// Returns `None` when the box is empty or does not fit inside the plane.
pub fn extract(plane: &Array2<f32>, bbox: &BoundingBox) -> Option<Array2<f32>> {
    let (rows, cols) = plane.dim();
    if bbox.is_empty() || bbox.bottom() as usize > rows || bbox.right() as usize > cols {
        return None;
    }
    let (x, y) = (bbox.x as usize, bbox.y as usize);
    let (w, h) = (bbox.width as usize, bbox.height as usize);
    Some(plane.slice(s![y..y + h, x..x + w]).to_owned())
}

/// Best match found by [`Template::search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub x: u32,
    pub y: u32,
    /// Normalized cross-correlation in `[-1, 1]`
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct Template {
    patch: Array2<f32>,
}

impl Template {
    pub fn new(patch: Array2<f32>) -> Self {
        Self { patch }
    }

    pub fn from_plane(plane: &Array2<f32>, bbox: &BoundingBox) -> Option<Self> {
        extract(plane, bbox).map(Self::new)
    }

    /// (width, height) of the template.
    pub fn size(&self) -> (u32, u32) {
        let (rows, cols) = self.patch.dim();
        (cols as u32, rows as u32)
    }

    /// A template with no texture cannot be located reliably.
    pub fn is_flat(&self) -> bool {
        let mean = self.patch.mean().unwrap_or(0.0);
        let var = self.patch.mapv(|v| (v - mean) * (v - mean)).sum();
        var <= FLAT_EPSILON
    }

    /// Blend a new observation into the template: `t = (1 - rate) * t + rate * patch`.
    pub fn blend(&mut self, patch: &Array2<f32>, rate: f32) {
        if rate <= 0.0 || patch.dim() != self.patch.dim() {
            return;
        }
        self.patch.zip_mut_with(patch, |t, &p| *t = (1.0 - rate) * *t + rate * p);
    }

    /// Normalized cross-correlation between the template and an equally sized window.
    pub fn correlate(&self, window: ArrayView2<'_, f32>) -> f32 {
        let t_mean = self.patch.mean().unwrap_or(0.0);
        let w_mean = window.mean().unwrap_or(0.0);

        let mut cross = 0.0f32;
        let mut t_var = 0.0f32;
        let mut w_var = 0.0f32;
        for (&t, &w) in self.patch.iter().zip(window.iter()) {
            let dt = t - t_mean;
            let dw = w - w_mean;
            cross += dt * dw;
            t_var += dt * dt;
            w_var += dw * dw;
        }

        let denom = (t_var * w_var).sqrt();
        if denom <= FLAT_EPSILON {
            0.0
        } else {
            cross / denom
        }
    }

    /// Exhaustive search over top-left positions inside `area`.
    ///
    /// `area` is expressed in plane coordinates and must contain at least one
    /// full template placement; otherwise `None`.
    pub fn search(&self, plane: &Array2<f32>, area: &BoundingBox) -> Option<Match> {
        let (rows, cols) = plane.dim();
        let (tw, th) = (self.patch.ncols(), self.patch.nrows());

        let x_end = (area.right() as usize).min(cols);
        let y_end = (area.bottom() as usize).min(rows);
        if x_end < area.x as usize + tw || y_end < area.y as usize + th {
            return None;
        }

        let mut best: Option<Match> = None;
        for y in area.y as usize..=y_end - th {
            for x in area.x as usize..=x_end - tw {
                let window = plane.slice(s![y..y + th, x..x + tw]);
                let score = self.correlate(window);
                if best.is_none_or(|b| score > b.score) {
                    best = Some(Match {
                        x: x as u32,
                        y: y as u32,
                        score,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(r: usize, c: usize) -> f32 {
        let mut v = (r as u32).wrapping_mul(73_856_093) ^ (c as u32).wrapping_mul(19_349_663);
        v ^= v >> 13;
        v = v.wrapping_mul(0x5bd1_e995);
        v ^= v >> 15;
        (v & 0xff) as f32
    }

    fn textured_plane(rows: usize, cols: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |(r, c)| noise(r, c))
    }

    #[test]
    fn test_finds_exact_location() {
        let plane = textured_plane(60, 80);
        let bbox = BoundingBox::new(30, 20, 10, 8);
        let template = Template::from_plane(&plane, &bbox).unwrap();

        let found = template
            .search(&plane, &BoundingBox::new(20, 10, 40, 30))
            .unwrap();
        assert_eq!((found.x, found.y), (30, 20));
        assert!((found.score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_search_area_too_small() {
        let plane = textured_plane(60, 80);
        let template = Template::from_plane(&plane, &BoundingBox::new(0, 0, 10, 10)).unwrap();
        assert!(template.search(&plane, &BoundingBox::new(0, 0, 5, 5)).is_none());
    }

    #[test]
    fn test_flat_template() {
        let template = Template::new(Array2::from_elem((4, 4), 12.0));
        assert!(template.is_flat());
        let window = Array2::from_elem((4, 4), 12.0);
        assert_eq!(template.correlate(window.view()), 0.0);
    }

    #[test]
    fn test_extract_out_of_plane() {
        let plane = textured_plane(10, 10);
        assert!(extract(&plane, &BoundingBox::new(5, 5, 10, 10)).is_none());
        assert!(extract(&plane, &BoundingBox::new(5, 5, 0, 3)).is_none());
    }

    #[test]
    fn test_gray_plane_layout() {
        let mut frame = RgbImage::new(3, 2);
        frame.put_pixel(2, 1, image::Rgb([255, 255, 255]));
        let plane = gray_plane(&frame);
        assert_eq!(plane.dim(), (2, 3));
        assert!(plane[[1, 2]] > 250.0);
        assert_eq!(plane[[0, 0]], 0.0);
    }
}
