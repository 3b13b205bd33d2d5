use std::fmt;

use image::{Rgb, RgbImage};

use crate::classifier::ClassifyError;
use crate::tracker::Midpoint;

/// The "outside" sentinel: pure black on every channel.
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Pixel dimensions of a frame or mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, point: Midpoint) -> bool {
        point.x < self.width && point.y < self.height
    }

    /// Nearest point inside the bounds. Bounds must be non-empty.
    #[inline]
    pub fn clamp(&self, point: Midpoint) -> Midpoint {
        Midpoint::new(
            point.x.min(self.width.saturating_sub(1)),
            point.y.min(self.height.saturating_sub(1)),
        )
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Lane-shadow raster, aligned pixel-for-pixel with a frame.
///
/// Always non-empty, so every point can be clamped onto a valid pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskImage {
    pixels: RgbImage,
}

impl MaskImage {
    pub fn new(pixels: RgbImage) -> Result<Self, ClassifyError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ClassifyError::MalformedMask(format!(
                "mask has no pixels ({})",
                FrameSize::of(&pixels)
            )));
        }
        Ok(Self { pixels })
    }

    /// Build from a packed RGB buffer, row-major.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ClassifyError> {
        let len = data.len();
        let malformed = || {
            ClassifyError::MalformedMask(format!(
                "{len} bytes do not make a {width}x{height} RGB mask"
            ))
        };
        if len as u64 != width as u64 * height as u64 * 3 {
            return Err(malformed());
        }
        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(malformed)?;
        Self::new(pixels)
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::of(&self.pixels)
    }

    /// Pixel at `(row = point.y, column = point.x)`, if inside the mask.
    pub fn get(&self, point: Midpoint) -> Option<Rgb<u8>> {
        self.pixels.get_pixel_checked(point.x, point.y).copied()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbImage {
        self.pixels
    }
}
