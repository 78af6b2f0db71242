use glam::Vec2;

/// Axis-aligned region in normalized texture space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UvRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl UvRect {
    /// The whole texture, `(0, 0)..(1, 1)`.
    pub const FULL: UvRect = UvRect {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };

    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_coords(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
    }

    /// Extent of the region; negative components mirror the region.
    #[inline]
    pub fn size(self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        let size = self.size();
        size.x == 0.0 || size.y == 0.0
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_covers_unit_square() {
        assert_eq!(UvRect::FULL.size(), Vec2::ONE);
        assert!(!UvRect::FULL.is_empty());
    }

    #[test]
    fn size_can_be_negative_for_mirrored_regions() {
        let mirrored = UvRect::from_coords(1.0, 0.0, 0.0, 1.0);
        assert_eq!(mirrored.size(), Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn degenerate_region_is_empty() {
        assert!(UvRect::from_coords(0.5, 0.0, 0.5, 1.0).is_empty());
    }
}
