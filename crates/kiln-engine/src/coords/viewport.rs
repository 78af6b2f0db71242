/// Viewport rectangle in framebuffer pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport covering a whole `width` x `height` target.
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, gl_extent(width), gl_extent(height))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Clamps a pixel extent into the `i32` range GL expects.
#[inline]
pub(crate) fn gl_extent(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
