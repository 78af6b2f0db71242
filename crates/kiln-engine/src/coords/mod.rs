//! Small value types shared by the render layer.
//!
//! Conventions:
//! - `Viewport` is in framebuffer pixels, origin bottom-left (GL convention)
//! - `UvRect` is in normalized texture space, `(0, 0)` bottom-left, `(1, 1)` top-right

mod color;
mod uv_rect;
mod viewport;

pub use color::Color;
pub use uv_rect::UvRect;
pub use viewport::Viewport;
pub(crate) use viewport::gl_extent;
