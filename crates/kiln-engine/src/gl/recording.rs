use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::rc::Rc;

use super::driver::{
    BufferId, FramebufferId, GlDriver, ProgramId, TextureId, UniformData, UniformLocation,
    VertexArrayId,
};

/// One driver call as observed by [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Enable(u32),
    Disable(u32),
    BlendFunc { src: u32, dst: u32 },
    BlendEquation(u32),
    CullFace(u32),
    DepthMask(bool),
    DepthFunc(u32),
    ClearDepth(f32),
    ClearColor([f32; 4]),
    Clear(u32),
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    PixelStore { pname: u32, value: i32 },

    LinkProgram(ProgramId),
    DeleteProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    Uniform { location: UniformLocation, data: UniformData },

    CreateVertexArray(VertexArrayId),
    DeleteVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BindBuffer { target: u32, buffer: Option<BufferId> },
    BufferData { target: u32, data: Vec<u8>, usage: u32 },
    VertexAttribPointer {
        index: u32,
        components: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    EnableVertexAttribArray(u32),
    DrawElements { mode: u32, count: i32, index_type: u32, offset: i32 },

    CreateTexture(TextureId),
    DeleteTexture(TextureId),
    ActiveTexture(u32),
    BindTexture(Option<TextureId>),
    TexImage2d {
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<Vec<u8>>,
    },
    TexParameter { pname: u32, value: i32 },

    CreateFramebuffer(FramebufferId),
    DeleteFramebuffer(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    FramebufferTexture2d { attachment: u32, texture: Option<TextureId> },
    DrawBuffers(Vec<u32>),
}

/// Interface a headless program exposes, recovered from its GLSL declarations.
#[derive(Debug, Default, Clone)]
struct ProgramInputs {
    attributes: Vec<(String, u32)>,
    uniforms: Vec<String>,
}

#[derive(Debug)]
struct Recorder {
    calls: Vec<Call>,
    next_name: u32,
    programs: HashMap<ProgramId, ProgramInputs>,
    max_color_attachments: u32,
    framebuffer_status: u32,
    link_failure: Option<String>,
}

impl Recorder {
    fn next_name(&mut self) -> NonZeroU32 {
        self.next_name += 1;
        NonZeroU32::new(self.next_name).unwrap_or(NonZeroU32::MIN)
    }
}

/// Headless [`GlDriver`] that records every call instead of talking to a GPU.
///
/// Object names are handed out from one increasing counter. Program inputs are
/// recovered from `uniform` and vertex-stage `in` declarations in the linked
/// sources, so uniform lookups behave like a real driver for well-formed shaders
/// (one declaration per statement).
///
/// Cloning is cheap and clones share the same recording, so tests keep one clone
/// and hand the other to a `RenderContext`.
#[derive(Debug, Clone)]
pub struct RecordingDriver {
    inner: Rc<RefCell<Recorder>>,
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Recorder {
                calls: Vec::new(),
                next_name: 0,
                programs: HashMap::new(),
                max_color_attachments: 8,
                framebuffer_status: glow::FRAMEBUFFER_COMPLETE,
                link_failure: None,
            })),
        }
    }

    /// Snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    /// Drops the recorded calls; object bookkeeping is kept.
    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn set_max_color_attachments(&self, max: u32) {
        self.inner.borrow_mut().max_color_attachments = max;
    }

    /// Status returned by subsequent `check_framebuffer_status` calls.
    pub fn set_framebuffer_status(&self, status: u32) {
        self.inner.borrow_mut().framebuffer_status = status;
    }

    /// Makes the next `link_program` fail with `log`.
    pub fn fail_next_link(&self, log: impl Into<String>) {
        self.inner.borrow_mut().link_failure = Some(log.into());
    }

    fn record(&self, call: Call) {
        self.inner.borrow_mut().calls.push(call);
    }

    fn allocate(&self) -> NonZeroU32 {
        self.inner.borrow_mut().next_name()
    }
}

impl GlDriver for RecordingDriver {
    fn enable(&self, cap: u32) {
        self.record(Call::Enable(cap));
    }

    fn disable(&self, cap: u32) {
        self.record(Call::Disable(cap));
    }

    fn blend_func(&self, src: u32, dst: u32) {
        self.record(Call::BlendFunc { src, dst });
    }

    fn blend_equation(&self, mode: u32) {
        self.record(Call::BlendEquation(mode));
    }

    fn cull_face(&self, mode: u32) {
        self.record(Call::CullFace(mode));
    }

    fn depth_mask(&self, write: bool) {
        self.record(Call::DepthMask(write));
    }

    fn depth_func(&self, func: u32) {
        self.record(Call::DepthFunc(func));
    }

    fn clear_depth(&self, depth: f32) {
        self.record(Call::ClearDepth(depth));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearColor([r, g, b, a]));
    }

    fn clear(&self, mask: u32) {
        self.record(Call::Clear(mask));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport { x, y, width, height });
    }

    fn pixel_store(&self, pname: u32, value: i32) {
        self.record(Call::PixelStore { pname, value });
    }

    fn max_color_attachments(&self) -> u32 {
        self.inner.borrow().max_color_attachments
    }

    fn link_program(&self, vertex: &str, fragment: &str) -> Result<ProgramId, String> {
        if let Some(log) = self.inner.borrow_mut().link_failure.take() {
            return Err(log);
        }

        let mut uniforms = scan_declarations(vertex, "uniform");
        for name in scan_declarations(fragment, "uniform") {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }

        let attributes = vertex_inputs(vertex);

        let id = ProgramId(self.allocate());
        self.inner.borrow_mut().programs.insert(
            id,
            ProgramInputs {
                attributes,
                uniforms,
            },
        );
        self.record(Call::LinkProgram(id));
        Ok(id)
    }

    fn delete_program(&self, program: ProgramId) {
        self.inner.borrow_mut().programs.remove(&program);
        self.record(Call::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.record(Call::UseProgram(program));
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let inner = self.inner.borrow();
        let inputs = inner.programs.get(&program)?;
        inputs
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| *slot)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let inner = self.inner.borrow();
        let inputs = inner.programs.get(&program)?;
        inputs
            .uniforms
            .iter()
            .position(|n| n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn uniform(&self, location: UniformLocation, data: UniformData) {
        self.record(Call::Uniform { location, data });
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, String> {
        let id = VertexArrayId(self.allocate());
        self.record(Call::CreateVertexArray(id));
        Ok(id)
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        self.record(Call::DeleteVertexArray(vao));
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayId>) {
        self.record(Call::BindVertexArray(vao));
    }

    fn create_buffer(&self) -> Result<BufferId, String> {
        let id = BufferId(self.allocate());
        self.record(Call::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.record(Call::DeleteBuffer(buffer));
    }

    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>) {
        self.record(Call::BindBuffer { target, buffer });
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        self.record(Call::BufferData {
            target,
            data: data.to_vec(),
            usage,
        });
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
        self.record(Call::VertexAttribPointer {
            index,
            components,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableVertexAttribArray(index));
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: i32) {
        self.record(Call::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }

    fn create_texture(&self) -> Result<TextureId, String> {
        let id = TextureId(self.allocate());
        self.record(Call::CreateTexture(id));
        Ok(id)
    }

    fn delete_texture(&self, texture: TextureId) {
        self.record(Call::DeleteTexture(texture));
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, texture: Option<TextureId>) {
        self.record(Call::BindTexture(texture));
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
        self.record(Call::TexImage2d {
            internal_format,
            width,
            height,
            format,
            ty,
            pixels: pixels.map(<[u8]>::to_vec),
        });
    }

    fn tex_parameter(&self, pname: u32, value: i32) {
        self.record(Call::TexParameter { pname, value });
    }

    fn create_framebuffer(&self) -> Result<FramebufferId, String> {
        let id = FramebufferId(self.allocate());
        self.record(Call::CreateFramebuffer(id));
        Ok(id)
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        self.record(Call::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        self.record(Call::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture_2d(&self, attachment: u32, texture: Option<TextureId>) {
        self.record(Call::FramebufferTexture2d {
            attachment,
            texture,
        });
    }

    fn draw_buffers(&self, buffers: &[u32]) {
        self.record(Call::DrawBuffers(buffers.to_vec()));
    }

    fn check_framebuffer_status(&self) -> u32 {
        self.inner.borrow().framebuffer_status
    }
}

// ── GLSL declaration scan ─────────────────────────────────────────────────

fn strip_line_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Names declared as `<keyword> <type> <name>;`, in declaration order.
fn scan_declarations(source: &str, keyword: &str) -> Vec<String> {
    strip_line_comments(source)
        .split(';')
        .filter_map(|stmt| {
            let tokens: Vec<&str> = stmt.split_whitespace().collect();
            tokens.iter().position(|t| *t == keyword)?;
            let name = tokens.last()?;
            let name = name.split('[').next().unwrap_or(name);
            Some(name.to_string())
        })
        .collect()
}

/// Vertex-stage inputs with their slots; explicit `layout(location = N)` wins,
/// otherwise slots follow declaration order.
fn vertex_inputs(source: &str) -> Vec<(String, u32)> {
    let stripped = strip_line_comments(source);
    let mut next_slot = 0;
    let mut inputs = Vec::new();

    for stmt in stripped.split(';') {
        let tokens: Vec<&str> = stmt.split_whitespace().collect();
        if !tokens.contains(&"in") {
            continue;
        }
        let Some(name) = tokens.last() else { continue };

        let slot = explicit_location(stmt).unwrap_or(next_slot);
        next_slot = slot + 1;
        inputs.push((name.to_string(), slot));
    }

    inputs
}

fn explicit_location(stmt: &str) -> Option<u32> {
    let after = &stmt[stmt.find("location")? + "location".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "#version 330 core\n\
        layout(location = 1) in vec2 texcoord;\n\
        layout(location = 0) in vec3 position;\n\
        uniform vec2 vScale; // comment; with semicolon\n\
        out vec2 uv;\n\
        void main() { uv = texcoord * vScale; gl_Position = vec4(position, 1.0); }\n";

    const FS: &str = "#version 330 core\n\
        in vec2 uv;\n\
        uniform sampler2D sTexture;\n\
        uniform vec2 vScale;\n\
        out vec4 color;\n\
        void main() { color = texture(sTexture, uv); }\n";

    #[test]
    fn link_recovers_uniforms_from_both_stages() {
        let driver = RecordingDriver::new();
        let program = driver.link_program(VS, FS).unwrap();

        assert_eq!(driver.uniform_location(program, "vScale"), Some(UniformLocation(0)));
        assert_eq!(driver.uniform_location(program, "sTexture"), Some(UniformLocation(1)));
        assert_eq!(driver.uniform_location(program, "missing"), None);
    }

    #[test]
    fn link_honours_explicit_attribute_locations() {
        let driver = RecordingDriver::new();
        let program = driver.link_program(VS, FS).unwrap();

        assert_eq!(driver.attrib_location(program, "position"), Some(0));
        assert_eq!(driver.attrib_location(program, "texcoord"), Some(1));
        assert_eq!(driver.attrib_location(program, "uv"), None);
    }

    #[test]
    fn fail_next_link_applies_once() {
        let driver = RecordingDriver::new();
        driver.fail_next_link("syntax error");

        assert_eq!(driver.link_program(VS, FS), Err("syntax error".to_string()));
        assert!(driver.link_program(VS, FS).is_ok());
    }

    #[test]
    fn clones_share_one_recording() {
        let driver = RecordingDriver::new();
        let observer = driver.clone();
        driver.enable(glow::BLEND);

        assert_eq!(observer.calls(), vec![Call::Enable(glow::BLEND)]);
    }
}
