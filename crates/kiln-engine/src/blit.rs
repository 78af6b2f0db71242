//! GPU-side texture copy and resample.
//!
//! One framebuffer and one unit quad are reused for every copy; the
//! destination is swapped in through `Framebuffer::bind_target`.

use std::rc::Rc;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::coords::{UvRect, Viewport};
use crate::render::RenderContext;
use crate::resource::{
    ElementType, Framebuffer, PrimitiveType, Shader, StaticGeometry, Texture, VertexAttribute,
    VertexLayout, VertexList,
};

/// Vertex stage of the identity blit shader.
///
/// Positions and UVs of the unit quad are remapped with `vPosOffset`/`vPosScale`
/// and `vUVOffset`/`vUVScale`. Custom blit shaders declare the same inputs.
pub const IDENTITY_VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 texcoord;
uniform vec2 vPosOffset;
uniform vec2 vPosScale;
uniform vec2 vUVOffset;
uniform vec2 vUVScale;
out vec2 fUV;
void main() {
    fUV = vUVOffset + texcoord * vUVScale;
    vec2 pos = vPosOffset + position.xy * vPosScale;
    gl_Position = vec4(pos * 2.0 - 1.0, 0.0, 1.0);
}
"#;

/// Fragment stage of the identity blit shader.
pub const IDENTITY_FRAGMENT_SHADER: &str = r#"#version 330 core
in vec2 fUV;
uniform sampler2D sTexture;
out vec4 outColor;
void main() {
    outColor = texture(sTexture, fUV);
}
"#;

/// Position + UV vertex of the blit quad.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

/// Vertex list of the unit quad `(0, 0)..(1, 1)` with matching UVs.
pub fn unit_quad() -> VertexList<QuadVertex> {
    let layout = VertexLayout::new(std::mem::size_of::<QuadVertex>())
        .with(VertexAttribute::new("position", 0, 3, ElementType::Float, 0))
        .with(VertexAttribute::new("texcoord", 1, 2, ElementType::Float, 12));

    let mut list = VertexList::new(layout);
    for [x, y] in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
        list.add_vertex(QuadVertex {
            pos: [x, y, 0.0],
            uv: [x, y],
        });
    }
    list.add_triangle(0, 1, 2);
    list.add_triangle(0, 2, 3);
    list
}

/// Copies (and resamples) texture regions on the GPU.
pub struct TextureBlitter {
    ctx: RenderContext,
    framebuffer: Framebuffer,
    quad: StaticGeometry,
    identity: Shader,
}

impl std::fmt::Debug for TextureBlitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureBlitter")
            .field("framebuffer", &self.framebuffer)
            .field("quad", &self.quad)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl TextureBlitter {
    pub fn new(ctx: &RenderContext) -> Result<Self> {
        let identity = Shader::link(ctx, IDENTITY_VERTEX_SHADER, IDENTITY_FRAGMENT_SHADER)
            .context("failed to build the identity blit shader")?;
        let framebuffer = Framebuffer::empty(ctx);
        let quad = ctx.create_static_geometry(&unit_quad(), PrimitiveType::Triangles);

        Ok(Self {
            ctx: ctx.clone(),
            framebuffer,
            quad,
            identity,
        })
    }

    /// Shader used when a copy is given none.
    pub fn identity_shader(&self) -> &Shader {
        &self.identity
    }

    /// Copies all of `src` over all of `dst`.
    pub fn copy(&mut self, src: &Rc<Texture>, dst: &Rc<Texture>, shader: Option<&Shader>) {
        self.copy_region(UvRect::FULL, src, UvRect::FULL, dst, shader);
    }

    /// Copies all of `src` into the `to` region of `dst`.
    pub fn copy_into(
        &mut self,
        src: &Rc<Texture>,
        to: UvRect,
        dst: &Rc<Texture>,
        shader: Option<&Shader>,
    ) {
        self.copy_region(UvRect::FULL, src, to, dst, shader);
    }

    /// Copies the `from` region of `src` into the `to` region of `dst`.
    ///
    /// Both regions are in normalized coordinates; differing sizes resample
    /// with the source texture's filter. Leaves `dst` attached to the blit
    /// framebuffer, which stays bound.
    pub fn copy_region(
        &mut self,
        from: UvRect,
        src: &Rc<Texture>,
        to: UvRect,
        dst: &Rc<Texture>,
        shader: Option<&Shader>,
    ) {
        debug_assert!(
            !Rc::ptr_eq(src, dst),
            "blit source and destination are the same texture"
        );

        self.framebuffer.bind_target(dst);
        self.ctx.set_viewport(Viewport::full(dst.width(), dst.height()));

        let shader = shader.unwrap_or(&self.identity);
        shader.bind();
        shader.set_uniform_by_name("vUVOffset", from.min);
        shader.set_uniform_by_name("vUVScale", from.size());
        shader.set_uniform_by_name("vPosOffset", to.min);
        shader.set_uniform_by_name("vPosScale", to.size());
        shader.set_uniform_by_name("sTexture", 0i32);

        src.bind(0);
        self.quad.bind();
        self.ctx
            .draw_indexed(self.quad.primitive_type(), self.quad.index_count(), 0);
    }
}
