use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use image::DynamicImage;

use crate::render::RenderContext;

use super::cache::ResourceCache;
use super::texture::{Filter, Texture, TextureDesc, TextureFormat};

/// Loads image files into textures, one live texture per path.
#[derive(Debug)]
pub struct TextureLoader {
    cache: ResourceCache<Texture>,
    filter: Filter,
}

impl Default for TextureLoader {
    fn default() -> Self {
        Self::new(Filter::Linear)
    }
}

impl TextureLoader {
    pub fn new(filter: Filter) -> Self {
        Self {
            cache: ResourceCache::new(),
            filter,
        }
    }

    /// Texture for the image at `path`, decoded on first use.
    pub fn load_texture(
        &mut self,
        ctx: &RenderContext,
        path: impl AsRef<Path>,
    ) -> Result<Rc<Texture>> {
        let filter = self.filter;
        self.cache.fetch(path, |path| {
            let image = image::open(path)
                .with_context(|| format!("failed to decode image {}", path.display()))?;
            log::info!(
                "loaded image {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            Ok(ctx.build_texture(image_desc(&image, filter), Some(&flipped_rgba(&image))))
        })
    }

    pub fn cache(&self) -> &ResourceCache<Texture> {
        &self.cache
    }

    /// Forgets textures nobody holds anymore.
    pub fn purge(&mut self) {
        self.cache.purge();
    }
}

fn image_desc(image: &DynamicImage, filter: Filter) -> TextureDesc {
    TextureDesc::new(image.width(), image.height(), TextureFormat::Rgba8).with_filter(filter)
}

/// RGBA8 pixels with rows reordered to GL's bottom-left origin.
fn flipped_rgba(image: &DynamicImage) -> Vec<u8> {
    image.flipv().to_rgba8().into_raw()
}

/// Uploads `image` as an RGBA8 texture without caching it.
pub fn texture_from_image(
    ctx: &RenderContext,
    image: &DynamicImage,
    filter: Filter,
) -> Rc<Texture> {
    ctx.create_texture(image_desc(image, filter), Some(&flipped_rgba(image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{Call, RecordingDriver};
    use crate::render::ContextInfo;
    use image::{Rgba, RgbaImage};

    fn context() -> (RenderContext, RecordingDriver) {
        let driver = RecordingDriver::new();
        let ctx = RenderContext::new(driver.clone(), ContextInfo::default());
        driver.clear_calls();
        (ctx, driver)
    }

    #[test]
    fn image_rows_are_uploaded_bottom_first() {
        let (ctx, driver) = context();
        let mut image = RgbaImage::new(1, 2);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 1, Rgba([0, 0, 255, 255]));

        let texture = texture_from_image(&ctx, &DynamicImage::ImageRgba8(image), Filter::Nearest);

        let uploaded = driver.calls().into_iter().find_map(|c| match c {
            Call::TexImage2d { pixels, .. } => pixels,
            _ => None,
        });
        assert_eq!(uploaded, Some(vec![0, 0, 255, 255, 255, 0, 0, 255]));
        assert_eq!(texture.size(), (1, 2));
    }

    #[test]
    fn missing_file_is_an_error_and_not_cached() {
        let (ctx, _driver) = context();
        let mut loader = TextureLoader::default();

        let err = loader
            .load_texture(&ctx, "does/not/exist.png")
            .unwrap_err();

        assert!(format!("{err:#}").contains("does/not/exist.png"));
        assert!(loader.cache().is_empty());
    }

    #[test]
    fn loading_twice_shares_the_texture() {
        let (ctx, driver) = context();
        let path = std::env::temp_dir().join(format!("kiln-loader-{}.png", std::process::id()));
        RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]))
            .save(&path)
            .unwrap();
        let mut loader = TextureLoader::default();

        let a = loader.load_texture(&ctx, &path).unwrap();
        let b = loader.load_texture(&ctx, &path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(driver.count(|c| matches!(c, Call::CreateTexture(_))), 1);
    }
}
