use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::coords::{Color, Viewport};
use crate::gl::{FramebufferId, GlDriver, ProgramId, TextureId, VertexArrayId};
use crate::resource::PrimitiveType;

use super::state::{
    self, BlendFactor, BlendOp, ClearMask, CompareFunc, CullMode, RenderState, RenderStateTable,
    encode_bool,
};

/// Context creation parameters reported by the shell before any GPU call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextInfo {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub gl_major: u8,
    pub gl_minor: u8,
}

impl Default for ContextInfo {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fullscreen: false,
            gl_major: 3,
            gl_minor: 3,
        }
    }
}

/// Objects currently bound through one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bindings {
    pub program: Option<ProgramId>,
    /// `None` is the default back buffer.
    pub framebuffer: Option<FramebufferId>,
    pub vertex_array: Option<VertexArrayId>,
    /// Color texture last attached to slot 0 through `Framebuffer::bind_target`.
    pub color_target: Option<(FramebufferId, TextureId)>,
}

struct Shared {
    driver: Box<dyn GlDriver>,
    info: ContextInfo,
    state: RefCell<RenderStateTable>,
    bindings: RefCell<Bindings>,
}

/// Handle to one GPU context and the state mirrored for it.
///
/// Cloning is cheap; every clone refers to the same table and bindings.
/// Resources keep a clone so they can release their GPU objects on drop.
#[derive(Clone)]
pub struct RenderContext {
    shared: Rc<Shared>,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("info", &self.shared.info)
            .field("bindings", &*self.shared.bindings.borrow())
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Wraps `driver` and applies the start-up render state.
    pub fn new<D: GlDriver + 'static>(driver: D, info: ContextInfo) -> Self {
        let viewport = Viewport::full(info.width, info.height);
        let ctx = Self {
            shared: Rc::new(Shared {
                driver: Box::new(driver),
                info,
                state: RefCell::new(RenderStateTable::new(viewport)),
                bindings: RefCell::new(Bindings::default()),
            }),
        };

        log::info!(
            "render context created: {}x{} GL {}.{}{}",
            info.width,
            info.height,
            info.gl_major,
            info.gl_minor,
            if info.fullscreen { " (fullscreen)" } else { "" }
        );

        ctx.apply_startup_state(viewport);
        ctx
    }

    fn apply_startup_state(&self, viewport: Viewport) {
        let driver = self.driver();
        driver.pixel_store(glow::UNPACK_ALIGNMENT, 1);

        let clear = Color::transparent();
        driver.clear_color(clear.r, clear.g, clear.b, clear.a);
        driver.viewport(viewport.x, viewport.y, viewport.width, viewport.height);

        self.set_depth_test(true);
        self.set_cull_mode(CullMode::None);
        self.set_blend(false);
        self.set_blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
    }

    #[inline]
    pub fn info(&self) -> ContextInfo {
        self.shared.info
    }

    /// Snapshot of the mirrored render state.
    pub fn state(&self) -> Ref<'_, RenderStateTable> {
        self.shared.state.borrow()
    }

    /// Snapshot of the bound-object markers.
    pub fn bindings(&self) -> Bindings {
        *self.shared.bindings.borrow()
    }

    #[inline]
    pub(crate) fn driver(&self) -> &dyn GlDriver {
        self.shared.driver.as_ref()
    }

    /// True when both handles refer to the same context.
    pub fn ptr_eq(&self, other: &RenderContext) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    // ── render state ──────────────────────────────────────────────────────

    /// Stores `value` for `state` and issues the GL change, unless the table
    /// already holds it.
    ///
    /// Panics on a value that is not valid for `state` and on the states this
    /// backend does not implement (`AlphaTest*`, `DepthBias`).
    pub fn set_render_state(&self, state: RenderState, value: u32) {
        state::validate(state, value);
        let mut table = self.shared.state.borrow_mut();
        if !table.set(state, value) {
            log::trace!("render state {state:?} already {value}; skipped");
            return;
        }
        state::apply(self.driver(), &table, state, value);
    }

    /// `set_render_state` with a raw enumerant. Panics when `state` is out of range.
    pub fn set_render_state_raw(&self, state: u32, value: u32) {
        let Some(state) = RenderState::from_raw(state) else {
            log::error!("render state enumerant {state} out of range");
            panic!(
                "render state enumerant {state} out of range (0..{})",
                RenderState::COUNT
            );
        };
        self.set_render_state(state, value);
    }

    pub fn set_blend(&self, enabled: bool) {
        self.set_render_state(RenderState::Blend, encode_bool(enabled));
    }

    /// Updates both blend factors with at most one `blend_func` call.
    pub fn set_blend_func(&self, src: BlendFactor, dst: BlendFactor) {
        let mut table = self.shared.state.borrow_mut();
        let src_changed = table.set(RenderState::BlendSrc, src.raw());
        let dst_changed = table.set(RenderState::BlendDst, dst.raw());
        if !(src_changed || dst_changed) {
            log::trace!("blend func already {src:?}/{dst:?}; skipped");
            return;
        }
        self.driver().blend_func(src.to_gl(), dst.to_gl());
    }

    pub fn set_blend_op(&self, op: BlendOp) {
        self.set_render_state(RenderState::BlendOp, op.raw());
    }

    pub fn set_depth_test(&self, enabled: bool) {
        self.set_render_state(RenderState::DepthTest, encode_bool(enabled));
    }

    pub fn set_depth_write(&self, enabled: bool) {
        self.set_render_state(RenderState::DepthWrite, encode_bool(enabled));
    }

    pub fn set_depth_func(&self, func: CompareFunc) {
        self.set_render_state(RenderState::DepthFunc, func.raw());
    }

    /// Depth written by `clear(ClearMask::DEPTH)`, in `[0, 1]`.
    pub fn set_depth_clear_value(&self, depth: f32) {
        self.set_render_state(RenderState::DepthClearValue, depth.to_bits());
    }

    pub fn set_cull_mode(&self, mode: CullMode) {
        self.set_render_state(RenderState::CullMode, mode.raw());
    }

    pub fn set_multisample(&self, enabled: bool) {
        self.set_render_state(RenderState::Multisample, encode_bool(enabled));
    }

    pub fn set_clear_color(&self, color: Color) {
        if !self.shared.state.borrow_mut().set_clear_color(color) {
            log::trace!("clear color unchanged; skipped");
            return;
        }
        self.driver().clear_color(color.r, color.g, color.b, color.a);
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        if !self.shared.state.borrow_mut().set_viewport(viewport) {
            log::trace!("viewport unchanged; skipped");
            return;
        }
        self.driver()
            .viewport(viewport.x, viewport.y, viewport.width, viewport.height);
    }

    pub fn clear(&self, mask: ClearMask) {
        self.driver().clear(mask.to_gl());
    }

    pub fn clear_all(&self) {
        self.clear(ClearMask::ALL);
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Draws `count` indices starting at index `first` from the bound geometry.
    pub fn draw_indexed(&self, primitive: PrimitiveType, count: u32, first: u32) {
        debug_assert!(
            self.bindings().vertex_array.is_some(),
            "draw_indexed with no geometry bound"
        );
        let offset = first as usize * std::mem::size_of::<u32>();
        self.driver().draw_elements(
            primitive.to_gl(),
            count as i32,
            glow::UNSIGNED_INT,
            offset as i32,
        );
    }

    // ── bound-object markers ──────────────────────────────────────────────

    pub(crate) fn use_program(&self, program: ProgramId) {
        let mut bindings = self.shared.bindings.borrow_mut();
        if bindings.program == Some(program) {
            log::trace!("program {} already bound; skipped", program.get());
            return;
        }
        bindings.program = Some(program);
        self.driver().use_program(Some(program));
    }

    pub(crate) fn forget_program(&self, program: ProgramId) {
        let mut bindings = self.shared.bindings.borrow_mut();
        if bindings.program == Some(program) {
            bindings.program = None;
        }
    }

    pub(crate) fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        let mut bindings = self.shared.bindings.borrow_mut();
        if bindings.framebuffer == framebuffer {
            log::trace!("framebuffer {framebuffer:?} already bound; skipped");
            return;
        }
        bindings.framebuffer = framebuffer;
        self.driver().bind_framebuffer(framebuffer);
    }

    pub(crate) fn forget_framebuffer(&self, framebuffer: FramebufferId) {
        let mut bindings = self.shared.bindings.borrow_mut();
        if bindings.framebuffer == Some(framebuffer) {
            bindings.framebuffer = None;
        }
        if matches!(bindings.color_target, Some((fb, _)) if fb == framebuffer) {
            bindings.color_target = None;
        }
    }

    pub(crate) fn color_target(&self) -> Option<(FramebufferId, TextureId)> {
        self.shared.bindings.borrow().color_target
    }

    pub(crate) fn set_color_target(&self, target: Option<(FramebufferId, TextureId)>) {
        self.shared.bindings.borrow_mut().color_target = target;
    }

    /// Drops the color-target marker when `texture` is the attached one.
    pub(crate) fn forget_texture(&self, texture: TextureId) {
        let mut bindings = self.shared.bindings.borrow_mut();
        if matches!(bindings.color_target, Some((_, tex)) if tex == texture) {
            bindings.color_target = None;
        }
    }

    pub(crate) fn bind_vertex_array(&self, vao: Option<VertexArrayId>) {
        let mut bindings = self.shared.bindings.borrow_mut();
        if bindings.vertex_array == vao {
            log::trace!("vertex array {vao:?} already bound; skipped");
            return;
        }
        bindings.vertex_array = vao;
        self.driver().bind_vertex_array(vao);
    }

    pub(crate) fn forget_vertex_array(&self, vao: VertexArrayId) {
        let mut bindings = self.shared.bindings.borrow_mut();
        if bindings.vertex_array == Some(vao) {
            bindings.vertex_array = None;
        }
    }
}
