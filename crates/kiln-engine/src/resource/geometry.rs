use std::borrow::Cow;

use bytemuck::Pod;

use crate::gl::{BufferId, VertexArrayId};
use crate::render::RenderContext;

/// Component type of a vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ElementType {
    Float,
    Int,
    /// One byte per component.
    Bool,
}

impl ElementType {
    pub fn to_gl(self) -> u32 {
        match self {
            ElementType::Float => glow::FLOAT,
            ElementType::Int => glow::INT,
            ElementType::Bool => glow::UNSIGNED_BYTE,
        }
    }

    pub fn size(self) -> usize {
        match self {
            ElementType::Float | ElementType::Int => 4,
            ElementType::Bool => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveType {
    pub fn to_gl(self) -> u32 {
        match self {
            PrimitiveType::Points => glow::POINTS,
            PrimitiveType::Lines => glow::LINES,
            PrimitiveType::LineStrip => glow::LINE_STRIP,
            PrimitiveType::Triangles => glow::TRIANGLES,
            PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
            PrimitiveType::TriangleFan => glow::TRIANGLE_FAN,
        }
    }
}

/// One attribute slot in a vertex layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: Cow<'static, str>,
    pub index: u32,
    pub components: u8,
    pub element_type: ElementType,
    /// Byte offset inside one vertex.
    pub offset: usize,
    pub normalized: bool,
}

impl VertexAttribute {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        index: u32,
        components: u8,
        element_type: ElementType,
        offset: usize,
    ) -> Self {
        assert!(
            (1..=4).contains(&components),
            "vertex attribute needs 1 to 4 components, got {components}"
        );
        Self {
            name: name.into(),
            index,
            components,
            element_type,
            offset,
            normalized: false,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Bytes covered by this attribute.
    pub fn byte_len(&self) -> usize {
        self.components as usize * self.element_type.size()
    }
}

/// Ordered attribute list plus the byte stride of one vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    stride: usize,
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            attributes: Vec::new(),
        }
    }

    /// Appends `attribute`. Panics when it does not fit inside the stride or
    /// reuses a slot.
    pub fn with(mut self, attribute: VertexAttribute) -> Self {
        assert!(
            attribute.offset + attribute.byte_len() <= self.stride,
            "vertex attribute {:?} ends at byte {} past stride {}",
            attribute.name,
            attribute.offset + attribute.byte_len(),
            self.stride
        );
        assert!(
            self.attributes.iter().all(|a| a.index != attribute.index),
            "vertex attribute slot {} used twice",
            attribute.index
        );
        self.attributes.push(attribute);
        self
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }
}

/// CPU-side vertex and index data awaiting upload.
#[derive(Debug, Clone)]
pub struct VertexList<V: Pod> {
    layout: VertexLayout,
    vertices: Vec<V>,
    indices: Vec<u32>,
}

impl<V: Pod> VertexList<V> {
    /// Panics if `layout`'s stride is not the size of `V`.
    pub fn new(layout: VertexLayout) -> Self {
        assert_eq!(
            layout.stride(),
            std::mem::size_of::<V>(),
            "vertex layout stride does not match the vertex type"
        );
        Self {
            layout,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Appends a vertex and returns its index.
    pub fn add_vertex(&mut self, vertex: V) -> u32 {
        self.vertices.push(vertex);
        (self.vertices.len() - 1) as u32
    }

    pub fn add_index(&mut self, index: u32) {
        self.indices.push(index);
    }

    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    #[inline]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    #[inline]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Write-once vertex array with its vertex and index buffers.
pub struct StaticGeometry {
    ctx: RenderContext,
    vao: VertexArrayId,
    vbo: BufferId,
    ibo: BufferId,
    primitive: PrimitiveType,
    index_count: u32,
}

impl std::fmt::Debug for StaticGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticGeometry")
            .field("vao", &self.vao)
            .field("primitive", &self.primitive)
            .field("index_count", &self.index_count)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Uploads `list` into a new vertex array and leaves nothing bound.
    ///
    /// Panics when `list` has no vertices or no indices, or when the driver
    /// cannot allocate the objects.
    pub fn create_static_geometry<V: Pod>(
        &self,
        list: &VertexList<V>,
        primitive: PrimitiveType,
    ) -> StaticGeometry {
        if list.vertices().is_empty() || list.indices().is_empty() {
            log::error!(
                "static geometry needs vertices and indices ({} vertices, {} indices)",
                list.vertices().len(),
                list.indices().len()
            );
            panic!("static geometry created from an empty vertex or index list");
        }

        let driver = self.driver();
        let vao = driver
            .create_vertex_array()
            .unwrap_or_else(|e| panic!("failed to create vertex array: {e}"));
        let vbo = driver
            .create_buffer()
            .unwrap_or_else(|e| panic!("failed to create vertex buffer: {e}"));
        let ibo = driver
            .create_buffer()
            .unwrap_or_else(|e| panic!("failed to create index buffer: {e}"));

        self.bind_vertex_array(Some(vao));

        driver.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        driver.buffer_data(glow::ARRAY_BUFFER, list.vertex_bytes(), glow::STATIC_DRAW);

        let layout = list.layout();
        for attribute in layout.attributes() {
            driver.vertex_attrib_pointer(
                attribute.index,
                i32::from(attribute.components),
                attribute.element_type.to_gl(),
                attribute.normalized,
                layout.stride() as i32,
                attribute.offset as i32,
            );
            driver.enable_vertex_attrib_array(attribute.index);
        }

        driver.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
        driver.buffer_data(glow::ELEMENT_ARRAY_BUFFER, list.index_bytes(), glow::STATIC_DRAW);

        // The vertex array must go first or it forgets its index buffer.
        self.bind_vertex_array(None);
        driver.bind_buffer(glow::ARRAY_BUFFER, None);
        driver.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

        log::debug!(
            "static geometry created: vao {} ({} vertices, {} indices)",
            vao.get(),
            list.vertices().len(),
            list.indices().len()
        );

        StaticGeometry {
            ctx: self.clone(),
            vao,
            vbo,
            ibo,
            primitive,
            index_count: list.indices().len() as u32,
        }
    }
}

impl StaticGeometry {
    /// Makes the vertex array current; no-op when it already is.
    pub fn bind(&self) {
        self.ctx.bind_vertex_array(Some(self.vao));
    }

    /// Binds and draws every index.
    pub fn draw(&self) {
        self.bind();
        self.ctx.draw_indexed(self.primitive, self.index_count, 0);
    }

    #[inline]
    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    pub fn vertex_array(&self) -> VertexArrayId {
        self.vao
    }
}

impl Drop for StaticGeometry {
    fn drop(&mut self) {
        self.ctx.forget_vertex_array(self.vao);
        let driver = self.ctx.driver();
        driver.delete_vertex_array(self.vao);
        driver.delete_buffer(self.vbo);
        driver.delete_buffer(self.ibo);
        log::debug!("static geometry deleted: vao {}", self.vao.get());
    }
}
