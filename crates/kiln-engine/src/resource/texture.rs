use std::rc::Rc;

use crate::coords::gl_extent;
use crate::gl::TextureId;
use crate::render::RenderContext;

/// Pixel storage of a 2D texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    Rgba8,
    Rgb8,
    R8,
    Rgba16F,
    Rgba32F,
    Depth24,
    Depth32F,
}

impl TextureFormat {
    /// `(internal format, pixel format, pixel type)` for `tex_image_2d`.
    pub fn to_gl(self) -> (i32, u32, u32) {
        let (internal, format, ty) = match self {
            TextureFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
            TextureFormat::Rgb8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
            TextureFormat::R8 => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
            TextureFormat::Rgba16F => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
            TextureFormat::Rgba32F => (glow::RGBA32F, glow::RGBA, glow::FLOAT),
            TextureFormat::Depth24 => {
                (glow::DEPTH_COMPONENT24, glow::DEPTH_COMPONENT, glow::UNSIGNED_INT)
            }
            TextureFormat::Depth32F => {
                (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT)
            }
        };
        (internal as i32, format, ty)
    }

    /// Bytes per pixel of the upload data.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 | TextureFormat::Depth24 | TextureFormat::Depth32F => 4,
            TextureFormat::Rgba16F => 8,
            TextureFormat::Rgba32F => 16,
        }
    }

    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth24 | TextureFormat::Depth32F)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

impl Filter {
    fn to_gl(self) -> i32 {
        match self {
            Filter::Nearest => glow::NEAREST as i32,
            Filter::Linear => glow::LINEAR as i32,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: Filter,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Size in bytes of a full upload.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            filter: Filter::Linear,
        }
    }
}

/// GPU 2D texture; deleted when the last `Rc` drops.
pub struct Texture {
    ctx: RenderContext,
    id: TextureId,
    desc: TextureDesc,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("desc", &self.desc)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Creates a texture and uploads `pixels` (rows bottom to top), or leaves
    /// it uninitialized when `pixels` is `None`.
    ///
    /// Panics when `pixels` has the wrong length for `desc`.
    pub fn create_texture(&self, desc: TextureDesc, pixels: Option<&[u8]>) -> Rc<Texture> {
        Rc::new(self.build_texture(desc, pixels))
    }

    pub(crate) fn build_texture(&self, desc: TextureDesc, pixels: Option<&[u8]>) -> Texture {
        if let Some(data) = pixels {
            if data.len() != desc.byte_len() {
                log::error!(
                    "texture data is {} bytes, {}x{} {:?} needs {}",
                    data.len(),
                    desc.width,
                    desc.height,
                    desc.format,
                    desc.byte_len()
                );
                panic!("texture pixel data has the wrong length");
            }
        }

        let driver = self.driver();
        let id = driver
            .create_texture()
            .unwrap_or_else(|e| panic!("failed to create texture: {e}"));

        let (internal, format, ty) = desc.format.to_gl();
        driver.bind_texture(Some(id));
        driver.tex_image_2d(
            internal,
            gl_extent(desc.width),
            gl_extent(desc.height),
            format,
            ty,
            pixels,
        );
        driver.tex_parameter(glow::TEXTURE_MIN_FILTER, desc.filter.to_gl());
        driver.tex_parameter(glow::TEXTURE_MAG_FILTER, desc.filter.to_gl());
        driver.tex_parameter(glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        driver.tex_parameter(glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        driver.bind_texture(None);

        log::debug!(
            "texture {} created: {}x{} {:?}",
            id.get(),
            desc.width,
            desc.height,
            desc.format
        );

        Texture {
            ctx: self.clone(),
            id,
            desc,
        }
    }
}

impl Texture {
    /// Binds to texture unit `unit` (0-based).
    pub fn bind(&self, unit: u32) {
        let driver = self.ctx.driver();
        driver.active_texture(unit);
        driver.bind_texture(Some(self.id));
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.desc.width, self.desc.height)
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    #[inline]
    pub fn desc(&self) -> TextureDesc {
        self.desc
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.ctx.forget_texture(self.id);
        self.ctx.driver().delete_texture(self.id);
        log::debug!("texture {} deleted", self.id.get());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{Call, RecordingDriver};
    use crate::render::ContextInfo;

    fn context() -> (RenderContext, RecordingDriver) {
        let driver = RecordingDriver::new();
        let ctx = RenderContext::new(driver.clone(), ContextInfo::default());
        driver.clear_calls();
        (ctx, driver)
    }

    #[test]
    fn upload_records_format_and_pixels() {
        let (ctx, driver) = context();
        let pixels = vec![7u8; 2 * 2 * 4];

        let texture =
            ctx.create_texture(TextureDesc::new(2, 2, TextureFormat::Rgba8), Some(&pixels));

        assert!(driver.calls().contains(&Call::TexImage2d {
            internal_format: glow::RGBA8 as i32,
            width: 2,
            height: 2,
            format: glow::RGBA,
            ty: glow::UNSIGNED_BYTE,
            pixels: Some(pixels),
        }));
        assert_eq!(texture.size(), (2, 2));
    }

    #[test]
    #[should_panic(expected = "wrong length")]
    fn wrong_pixel_length_panics() {
        let (ctx, _driver) = context();
        ctx.create_texture(TextureDesc::new(2, 2, TextureFormat::Rgb8), Some(&[0; 4]));
    }

    #[test]
    fn last_handle_drop_deletes_texture() {
        let (ctx, driver) = context();
        let texture = ctx.create_texture(TextureDesc::new(4, 4, TextureFormat::R8), None);
        let other = Rc::clone(&texture);
        let id = texture.id();

        drop(texture);
        assert_eq!(driver.count(|c| *c == Call::DeleteTexture(id)), 0);

        drop(other);
        assert_eq!(driver.count(|c| *c == Call::DeleteTexture(id)), 1);
    }

    #[test]
    fn depth_formats_are_flagged() {
        assert!(TextureFormat::Depth24.is_depth());
        assert!(!TextureFormat::Rgba32F.is_depth());
        assert_eq!(TextureDesc::new(3, 2, TextureFormat::Rgba16F).byte_len(), 48);
    }
}
