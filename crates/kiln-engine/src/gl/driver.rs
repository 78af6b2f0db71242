use std::num::NonZeroU32;

macro_rules! gl_object_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            /// Raw GL object name.
            #[inline]
            pub fn get(self) -> u32 {
                self.0.get()
            }
        }
    };
}

gl_object_id!(
    /// Linked GPU program.
    ProgramId
);
gl_object_id!(
    /// Vertex or index buffer object.
    BufferId
);
gl_object_id!(
    /// Vertex array object.
    VertexArrayId
);
gl_object_id!(
    /// 2D texture object.
    TextureId
);
gl_object_id!(
    /// Off-screen framebuffer object. The default back buffer has no id.
    FramebufferId
);

/// Uniform slot inside one linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation(pub u32);

/// Typed payload for a single uniform upload.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformData {
    F32(f32),
    I32(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

/// The GL command subset the render layer issues.
///
/// Arguments that name GL enumerants (`cap`, `target`, `mode`, ...) carry the raw
/// GL values (`glow::BLEND`, `glow::ARRAY_BUFFER`, ...). Translation from the
/// engine's own enums happens in `render::state` and the resource types, so a
/// driver only forwards.
///
/// Implementations assume they are called on the thread that owns the GL context.
pub trait GlDriver {
    // ── pipeline state ────────────────────────────────────────────────────

    fn enable(&self, cap: u32);
    fn disable(&self, cap: u32);
    fn blend_func(&self, src: u32, dst: u32);
    fn blend_equation(&self, mode: u32);
    fn cull_face(&self, mode: u32);
    fn depth_mask(&self, write: bool);
    fn depth_func(&self, func: u32);
    fn clear_depth(&self, depth: f32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: u32);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn pixel_store(&self, pname: u32, value: i32);
    fn max_color_attachments(&self) -> u32;

    // ── programs ──────────────────────────────────────────────────────────

    /// Compiles both stages and links them. `Err` carries the driver's info log.
    fn link_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId, String>;
    fn delete_program(&self, program: ProgramId);
    fn use_program(&self, program: Option<ProgramId>);
    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Uploads to the currently bound program.
    fn uniform(&self, location: UniformLocation, data: UniformData);

    // ── vertex data ───────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> Result<VertexArrayId, String>;
    fn delete_vertex_array(&self, vao: VertexArrayId);
    fn bind_vertex_array(&self, vao: Option<VertexArrayId>);
    fn create_buffer(&self) -> Result<BufferId, String>;
    fn delete_buffer(&self, buffer: BufferId);
    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>);
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        components: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );
    fn enable_vertex_attrib_array(&self, index: u32);
    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&self) -> Result<TextureId, String>;
    fn delete_texture(&self, texture: TextureId);
    /// Selects texture unit `unit` (0-based, not `TEXTURE0 + n`).
    fn active_texture(&self, unit: u32);
    /// Binds to `TEXTURE_2D` on the active unit.
    fn bind_texture(&self, texture: Option<TextureId>);
    /// Specifies level 0 of the `TEXTURE_2D` currently bound.
    fn tex_image_2d(
        &self,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    fn tex_parameter(&self, pname: u32, value: i32);

    // ── framebuffers ──────────────────────────────────────────────────────

    fn create_framebuffer(&self) -> Result<FramebufferId, String>;
    fn delete_framebuffer(&self, framebuffer: FramebufferId);
    /// `None` binds the default back buffer.
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>);
    /// Attaches a `TEXTURE_2D` level 0 to the bound framebuffer.
    fn framebuffer_texture_2d(&self, attachment: u32, texture: Option<TextureId>);
    fn draw_buffers(&self, buffers: &[u32]);
    fn check_framebuffer_status(&self) -> u32;
}
