/// Axis-aligned bounding box in frame-pixel space.
///
/// Stored as TLWH: top-left x, top-left y, width, height. All coordinates are
/// non-negative integers, matching what a tracker reports for a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    /// Top-left x coordinate
    pub x: u32,
    /// Top-left y coordinate
    pub y: u32,
    /// Width of the bounding box
    pub width: u32,
    /// Height of the bounding box
    pub height: u32,
}

/// Integer center point of a bounding box, used as a pixel index into a mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Midpoint {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl Midpoint {
    #[inline]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl BoundingBox {
    /// Create a new box from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a box from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    ///
    /// Inverted corners collapse to an empty box.
    #[inline]
    pub fn from_tlbr(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
        }
    }

    /// Create a box from signed TLWH values, e.g. a tracker rectangle that
    /// starts left of or above the frame. The part before the origin is cut off.
    pub fn from_signed(x: i32, y: i32, width: i32, height: i32) -> Self {
        let x2 = (x as i64 + width.max(0) as i64).max(0) as u32;
        let y2 = (y as i64 + height.max(0) as i64).max(0) as u32;
        Self::from_tlbr(x.max(0) as u32, y.max(0) as u32, x2, y2)
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [u32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Midpoint using truncating division: `(x + w / 2, y + h / 2)`.
    #[inline]
    pub fn midpoint(&self) -> Midpoint {
        Midpoint {
            x: self.x.saturating_add(self.width / 2),
            y: self.y.saturating_add(self.height / 2),
        }
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect with a `width` x `height` frame. Returns `None` when nothing
    /// of the box remains inside the frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let x1 = self.x.min(width);
        let y1 = self.y.min(height);
        let x2 = self.right().min(width);
        let y2 = self.bottom().min(height);
        let clamped = BoundingBox::from_tlbr(x1, y1, x2, y2);
        if clamped.is_empty() {
            None
        } else {
            Some(clamped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint_truncates() {
        let bbox = BoundingBox::new(10, 10, 5, 5);
        assert_eq!(bbox.midpoint(), Midpoint::new(12, 12));

        let bbox = BoundingBox::new(0, 0, 0, 0);
        assert_eq!(bbox.midpoint(), Midpoint::new(0, 0));

        let bbox = BoundingBox::new(100, 100, 50, 50);
        assert_eq!(bbox.midpoint(), Midpoint::new(125, 125));
    }

    #[test]
    fn test_from_signed_cuts_negative_origin() {
        assert_eq!(
            BoundingBox::from_signed(-5, 10, 20, 8),
            BoundingBox::new(0, 10, 15, 8)
        );
        assert_eq!(BoundingBox::from_signed(3, 4, 5, 6), BoundingBox::new(3, 4, 5, 6));
        assert!(BoundingBox::from_signed(-30, 0, 20, 8).is_empty());
        assert!(BoundingBox::from_signed(0, 0, 0, 0).is_empty());
    }

    #[test]
    fn test_from_tlbr() {
        let bbox = BoundingBox::from_tlbr(10, 20, 40, 60);
        assert_eq!(bbox, BoundingBox::new(10, 20, 30, 40));
        assert_eq!(bbox.to_tlbr(), [10, 20, 40, 60]);

        // Inverted corners
        assert!(BoundingBox::from_tlbr(40, 60, 10, 20).is_empty());
    }

    #[test]
    fn test_clamp_to_frame() {
        let bbox = BoundingBox::new(280, 290, 40, 40);
        assert_eq!(bbox.clamp_to(300, 300), Some(BoundingBox::new(280, 290, 20, 10)));

        let outside = BoundingBox::new(400, 400, 10, 10);
        assert_eq!(outside.clamp_to(300, 300), None);
    }

    #[test]
    fn test_area() {
        assert_eq!(BoundingBox::new(0, 0, 10, 20).area(), 200);
        assert!(BoundingBox::new(5, 5, 0, 10).is_empty());
    }
}
