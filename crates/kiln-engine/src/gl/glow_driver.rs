use glow::{
    HasContext, NativeBuffer, NativeFramebuffer, NativeProgram, NativeTexture,
    NativeUniformLocation, NativeVertexArray, PixelUnpackData,
};

use super::driver::{
    BufferId, FramebufferId, GlDriver, ProgramId, TextureId, UniformData, UniformLocation,
    VertexArrayId,
};

/// [`GlDriver`] backed by a real OpenGL context through `glow`.
pub struct GlowDriver {
    gl: glow::Context,
}

impl GlowDriver {
    /// Wraps a loaded `glow` context.
    ///
    /// # Safety
    ///
    /// The GL context `gl` was loaded from must be current on the calling thread
    /// and stay current for as long as the driver (or any `RenderContext` built on
    /// it) is used.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    fn compile_stage(&self, stage: u32, source: &str) -> Result<glow::NativeShader, String> {
        // SAFETY: context currency is guaranteed by `GlowDriver::new`.
        unsafe {
            let shader = self.gl.create_shader(stage)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(shader)
        }
    }
}

// SAFETY (all methods below): the context is current on this thread, as required
// by `GlowDriver::new`; object names passed in were created by this driver.
impl GlDriver for GlowDriver {
    fn enable(&self, cap: u32) {
        unsafe { self.gl.enable(cap) }
    }

    fn disable(&self, cap: u32) {
        unsafe { self.gl.disable(cap) }
    }

    fn blend_func(&self, src: u32, dst: u32) {
        unsafe { self.gl.blend_func(src, dst) }
    }

    fn blend_equation(&self, mode: u32) {
        unsafe { self.gl.blend_equation(mode) }
    }

    fn cull_face(&self, mode: u32) {
        unsafe { self.gl.cull_face(mode) }
    }

    fn depth_mask(&self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn depth_func(&self, func: u32) {
        unsafe { self.gl.depth_func(func) }
    }

    fn clear_depth(&self, depth: f32) {
        unsafe { self.gl.clear_depth_f32(depth) }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn pixel_store(&self, pname: u32, value: i32) {
        unsafe { self.gl.pixel_store_i32(pname, value) }
    }

    fn max_color_attachments(&self) -> u32 {
        let max = unsafe { self.gl.get_parameter_i32(glow::MAX_COLOR_ATTACHMENTS) };
        u32::try_from(max).unwrap_or(0)
    }

    fn link_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId, String> {
        let vs = self.compile_stage(glow::VERTEX_SHADER, vertex)?;
        let fs = match self.compile_stage(glow::FRAGMENT_SHADER, fragment) {
            Ok(fs) => fs,
            Err(log) => {
                unsafe { self.gl.delete_shader(vs) };
                return Err(log);
            }
        };

        unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);

            let linked = self.gl.get_program_link_status(program);
            let log = if linked {
                String::new()
            } else {
                self.gl.get_program_info_log(program)
            };

            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);
            self.gl.delete_shader(vs);
            self.gl.delete_shader(fs);

            if !linked {
                self.gl.delete_program(program);
                return Err(log);
            }
            Ok(ProgramId(program.0))
        }
    }

    fn delete_program(&self, program: ProgramId) {
        unsafe { self.gl.delete_program(NativeProgram(program.0)) }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe { self.gl.use_program(program.map(|p| NativeProgram(p.0))) }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        unsafe { self.gl.get_attrib_location(NativeProgram(program.0), name) }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        unsafe {
            self.gl
                .get_uniform_location(NativeProgram(program.0), name)
                .map(|loc| UniformLocation(loc.0))
        }
    }

    fn uniform(&self, location: UniformLocation, data: UniformData) {
        let loc = NativeUniformLocation(location.0);
        unsafe {
            match data {
                UniformData::F32(v) => self.gl.uniform_1_f32(Some(&loc), v),
                UniformData::I32(v) => self.gl.uniform_1_i32(Some(&loc), v),
                UniformData::Vec2([x, y]) => self.gl.uniform_2_f32(Some(&loc), x, y),
                UniformData::Vec3([x, y, z]) => self.gl.uniform_3_f32(Some(&loc), x, y, z),
                UniformData::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(Some(&loc), x, y, z, w),
            }
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, String> {
        unsafe { self.gl.create_vertex_array().map(|v| VertexArrayId(v.0)) }
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        unsafe { self.gl.delete_vertex_array(NativeVertexArray(vao.0)) }
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayId>) {
        unsafe { self.gl.bind_vertex_array(vao.map(|v| NativeVertexArray(v.0))) }
    }

    fn create_buffer(&self) -> Result<BufferId, String> {
        unsafe { self.gl.create_buffer().map(|b| BufferId(b.0)) }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        unsafe { self.gl.delete_buffer(NativeBuffer(buffer.0)) }
    }

    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>) {
        unsafe { self.gl.bind_buffer(target, buffer.map(|b| NativeBuffer(b.0))) }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        components: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, components, data_type, normalized, stride, offset)
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, index_type, offset) }
    }

    fn create_texture(&self) -> Result<TextureId, String> {
        unsafe { self.gl.create_texture().map(|t| TextureId(t.0)) }
    }

    fn delete_texture(&self, texture: TextureId) {
        unsafe { self.gl.delete_texture(NativeTexture(texture.0)) }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, texture: Option<TextureId>) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, texture.map(|t| NativeTexture(t.0)))
        }
    }

    fn tex_image_2d(
        &self,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn tex_parameter(&self, pname: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(glow::TEXTURE_2D, pname, value) }
    }

    fn create_framebuffer(&self) -> Result<FramebufferId, String> {
        unsafe { self.gl.create_framebuffer().map(|f| FramebufferId(f.0)) }
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        unsafe { self.gl.delete_framebuffer(NativeFramebuffer(framebuffer.0)) }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        unsafe {
            self.gl.bind_framebuffer(
                glow::FRAMEBUFFER,
                framebuffer.map(|f| NativeFramebuffer(f.0)),
            )
        }
    }

    fn framebuffer_texture_2d(&self, attachment: u32, texture: Option<TextureId>) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment,
                glow::TEXTURE_2D,
                texture.map(|t| NativeTexture(t.0)),
                0,
            )
        }
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        unsafe { self.gl.draw_buffers(buffers) }
    }

    fn check_framebuffer_status(&self) -> u32 {
        unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) }
    }
}
