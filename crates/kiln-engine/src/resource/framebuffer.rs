use std::rc::Rc;

use crate::gl::{FramebufferId, GlDriver};
use crate::render::RenderContext;

use super::texture::Texture;

/// Render target: the window's back buffer or an off-screen framebuffer.
///
/// An off-screen framebuffer shares ownership of its attachments; dropping it
/// releases only the framebuffer object.
pub struct Framebuffer {
    ctx: RenderContext,
    id: Option<FramebufferId>,
    colors: Vec<Rc<Texture>>,
    depth: Option<Rc<Texture>>,
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("id", &self.id)
            .field("colors", &self.colors.len())
            .field("depth", &self.depth.is_some())
            .finish_non_exhaustive()
    }
}

fn fatal(message: String) -> ! {
    log::error!("{message}");
    panic!("{message}");
}

fn color_attachment(slot: usize) -> u32 {
    glow::COLOR_ATTACHMENT0 + slot as u32
}

fn check_complete(driver: &dyn GlDriver, id: FramebufferId) {
    let status = driver.check_framebuffer_status();
    if status != glow::FRAMEBUFFER_COMPLETE {
        fatal(format!(
            "framebuffer {} incomplete (status 0x{status:04X})",
            id.get()
        ));
    }
}

impl Framebuffer {
    /// The default target presented by the window.
    pub fn back_buffer(ctx: &RenderContext) -> Self {
        Self {
            ctx: ctx.clone(),
            id: None,
            colors: Vec::new(),
            depth: None,
        }
    }

    /// Off-screen framebuffer with no attachments; pair with `bind_target`.
    pub fn empty(ctx: &RenderContext) -> Self {
        let id = Self::allocate(ctx);
        log::debug!("framebuffer {} created without attachments", id.get());
        Self {
            ctx: ctx.clone(),
            id: Some(id),
            colors: Vec::new(),
            depth: None,
        }
    }

    /// Off-screen framebuffer rendering into `colors` (slots 0..) and `depth`.
    ///
    /// Panics on a depth texture given as color, a color texture given as
    /// depth, more colors than the driver supports, or an incomplete result.
    pub fn with_targets(
        ctx: &RenderContext,
        colors: &[Rc<Texture>],
        depth: Option<Rc<Texture>>,
    ) -> Self {
        let driver = ctx.driver();

        let max = driver.max_color_attachments() as usize;
        if colors.len() > max {
            fatal(format!(
                "{} color attachments requested, driver supports {max}",
                colors.len()
            ));
        }
        if let Some(slot) = colors.iter().position(|t| t.format().is_depth()) {
            fatal(format!(
                "color attachment {slot} has depth format {:?}",
                colors[slot].format()
            ));
        }
        if let Some(depth) = depth.as_ref().filter(|t| !t.format().is_depth()) {
            fatal(format!(
                "depth attachment has color format {:?}",
                depth.format()
            ));
        }

        let id = Self::allocate(ctx);
        ctx.bind_framebuffer(Some(id));

        for (slot, texture) in colors.iter().enumerate() {
            driver.framebuffer_texture_2d(color_attachment(slot), Some(texture.id()));
        }
        if let Some(depth) = &depth {
            driver.framebuffer_texture_2d(glow::DEPTH_ATTACHMENT, Some(depth.id()));
        }

        let buffers: Vec<u32> = (0..colors.len()).map(color_attachment).collect();
        if buffers.is_empty() {
            driver.draw_buffers(&[glow::NONE]);
        } else {
            driver.draw_buffers(&buffers);
        }

        check_complete(driver, id);

        if let Some(first) = colors.first() {
            ctx.set_color_target(Some((id, first.id())));
        }

        log::debug!(
            "framebuffer {} created: {} color, {} depth",
            id.get(),
            colors.len(),
            if depth.is_some() { 1 } else { 0 }
        );

        Self {
            ctx: ctx.clone(),
            id: Some(id),
            colors: colors.to_vec(),
            depth,
        }
    }

    fn allocate(ctx: &RenderContext) -> FramebufferId {
        ctx.driver()
            .create_framebuffer()
            .unwrap_or_else(|e| fatal(format!("failed to create framebuffer: {e}")))
    }

    /// `None` for the back buffer.
    #[inline]
    pub fn id(&self) -> Option<FramebufferId> {
        self.id
    }

    #[inline]
    pub fn is_back_buffer(&self) -> bool {
        self.id.is_none()
    }

    pub fn color_targets(&self) -> &[Rc<Texture>] {
        &self.colors
    }

    pub fn depth_target(&self) -> Option<&Rc<Texture>> {
        self.depth.as_ref()
    }

    /// Makes this the current target; no-op when it already is.
    pub fn bind(&self) {
        self.ctx.bind_framebuffer(self.id);
    }

    /// Binds this framebuffer and renders into `texture` through color slot 0.
    ///
    /// The attachment is only changed when `texture` differs from the one
    /// last attached through this call. The framebuffer keeps a handle on the
    /// texture until it is retargeted or dropped.
    pub fn bind_target(&mut self, texture: &Rc<Texture>) {
        let Some(id) = self.id else {
            fatal("bind_target on the back buffer".to_string());
        };
        if texture.format().is_depth() {
            fatal(format!(
                "color target has depth format {:?}",
                texture.format()
            ));
        }

        self.bind();

        if self.ctx.color_target() == Some((id, texture.id())) {
            log::trace!("texture {} already attached; skipped", texture.id().get());
            return;
        }

        let driver = self.ctx.driver();
        driver.framebuffer_texture_2d(color_attachment(0), Some(texture.id()));
        if self.colors.is_empty() {
            driver.draw_buffers(&[color_attachment(0)]);
        }
        if cfg!(debug_assertions) {
            check_complete(driver, id);
        }

        match self.colors.first_mut() {
            Some(slot) => *slot = Rc::clone(texture),
            None => self.colors.push(Rc::clone(texture)),
        }
        self.ctx.set_color_target(Some((id, texture.id())));
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.ctx.forget_framebuffer(id);
            self.ctx.driver().delete_framebuffer(id);
            log::debug!("framebuffer {} deleted", id.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{Call, RecordingDriver};
    use crate::render::ContextInfo;
    use crate::resource::{TextureDesc, TextureFormat};

    fn context() -> (RenderContext, RecordingDriver) {
        let driver = RecordingDriver::new();
        let ctx = RenderContext::new(driver.clone(), ContextInfo::default());
        driver.clear_calls();
        (ctx, driver)
    }

    fn color(ctx: &RenderContext) -> Rc<Texture> {
        ctx.create_texture(TextureDesc::new(4, 4, TextureFormat::Rgba8), None)
    }

    fn depth(ctx: &RenderContext) -> Rc<Texture> {
        ctx.create_texture(TextureDesc::new(4, 4, TextureFormat::Depth24), None)
    }

    fn reattachments(driver: &RecordingDriver) -> usize {
        driver.count(|c| {
            matches!(
                c,
                Call::FramebufferTexture2d { attachment, .. }
                    if *attachment == glow::COLOR_ATTACHMENT0
            )
        })
    }

    // ── back buffer ───────────────────────────────────────────────────────

    #[test]
    fn back_buffer_binds_default_target() {
        let (ctx, driver) = context();
        let offscreen = Framebuffer::empty(&ctx);
        let back = Framebuffer::back_buffer(&ctx);

        offscreen.bind();
        back.bind();
        back.bind();

        assert!(back.is_back_buffer());
        assert_eq!(driver.count(|c| *c == Call::BindFramebuffer(None)), 1);
    }

    // ── retargeting ───────────────────────────────────────────────────────

    #[test]
    fn bind_target_reattaches_only_on_change() {
        let (ctx, driver) = context();
        let mut fb = Framebuffer::empty(&ctx);
        let a = color(&ctx);
        let b = color(&ctx);

        fb.bind_target(&a);
        fb.bind_target(&a);
        assert_eq!(reattachments(&driver), 1);

        fb.bind_target(&b);
        assert_eq!(reattachments(&driver), 2);
        assert_eq!(ctx.bindings().color_target, Some((fb.id().unwrap(), b.id())));
    }

    #[test]
    fn bind_target_rebinds_framebuffer_after_switch() {
        let (ctx, driver) = context();
        let mut fb = Framebuffer::empty(&ctx);
        let a = color(&ctx);

        fb.bind_target(&a);
        Framebuffer::back_buffer(&ctx).bind();
        fb.bind_target(&a);

        assert_eq!(
            driver.count(|c| *c == Call::BindFramebuffer(fb.id())),
            2
        );
        assert_eq!(reattachments(&driver), 1);
    }

    #[test]
    fn retarget_keeps_texture_alive() {
        let (ctx, driver) = context();
        let mut fb = Framebuffer::empty(&ctx);
        let a = color(&ctx);
        let id = a.id();

        fb.bind_target(&a);
        drop(a);
        assert_eq!(driver.count(|c| *c == Call::DeleteTexture(id)), 0);

        drop(fb);
        assert_eq!(driver.count(|c| *c == Call::DeleteTexture(id)), 1);
    }

    // ── creation with targets ─────────────────────────────────────────────

    #[test]
    fn with_targets_attaches_each_slot() {
        let (ctx, driver) = context();
        let colors = [color(&ctx), color(&ctx)];
        let fb = Framebuffer::with_targets(&ctx, &colors, Some(depth(&ctx)));

        let calls = driver.calls();
        assert!(calls.contains(&Call::FramebufferTexture2d {
            attachment: glow::COLOR_ATTACHMENT1,
            texture: Some(colors[1].id()),
        }));
        assert!(calls.contains(&Call::DrawBuffers(vec![
            glow::COLOR_ATTACHMENT0,
            glow::COLOR_ATTACHMENT1,
        ])));
        assert_eq!(fb.color_targets().len(), 2);
        assert!(fb.depth_target().is_some());
    }

    #[test]
    fn with_targets_counts_as_initial_color_target() {
        let (ctx, driver) = context();
        let a = color(&ctx);
        let mut fb = Framebuffer::with_targets(&ctx, &[Rc::clone(&a)], None);
        driver.clear_calls();

        fb.bind_target(&a);

        assert_eq!(reattachments(&driver), 0);
    }

    #[test]
    #[should_panic(expected = "depth format")]
    fn depth_texture_as_color_panics() {
        let (ctx, _driver) = context();
        Framebuffer::with_targets(&ctx, &[depth(&ctx)], None);
    }

    #[test]
    #[should_panic(expected = "color format")]
    fn color_texture_as_depth_panics() {
        let (ctx, _driver) = context();
        Framebuffer::with_targets(&ctx, &[], Some(color(&ctx)));
    }

    #[test]
    #[should_panic(expected = "driver supports 1")]
    fn too_many_color_targets_panics() {
        let (ctx, driver) = context();
        driver.set_max_color_attachments(1);
        Framebuffer::with_targets(&ctx, &[color(&ctx), color(&ctx)], None);
    }

    #[test]
    #[should_panic(expected = "incomplete")]
    fn incomplete_framebuffer_panics() {
        let (ctx, driver) = context();
        driver.set_framebuffer_status(glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
        Framebuffer::with_targets(&ctx, &[color(&ctx)], None);
    }

    // ── drop ──────────────────────────────────────────────────────────────

    #[test]
    fn drop_clears_markers_and_spares_textures() {
        let (ctx, driver) = context();
        let a = color(&ctx);
        let mut fb = Framebuffer::empty(&ctx);
        fb.bind_target(&a);
        let id = fb.id().unwrap();

        drop(fb);

        assert_eq!(ctx.bindings().framebuffer, None);
        assert_eq!(ctx.bindings().color_target, None);
        assert_eq!(driver.count(|c| *c == Call::DeleteFramebuffer(id)), 1);
        assert_eq!(driver.count(|c| matches!(c, Call::DeleteTexture(_))), 0);
    }
}
