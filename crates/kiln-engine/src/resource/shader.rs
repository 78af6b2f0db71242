use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{Result, anyhow};
use glam::{Vec2, Vec3, Vec4};

use crate::gl::{ProgramId, UniformData, UniformLocation};
use crate::render::RenderContext;

/// Resolved uniform slot; `Uniform::INVALID` when the name is not active.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Uniform(Option<UniformLocation>);

impl Uniform {
    pub const INVALID: Uniform = Uniform(None);

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0.is_some()
    }

    #[inline]
    pub fn location(self) -> Option<UniformLocation> {
        self.0
    }
}

/// Values that can be uploaded as a single uniform.
pub trait UniformValue: Copy {
    fn to_uniform_data(self) -> UniformData;
}

impl UniformValue for f32 {
    fn to_uniform_data(self) -> UniformData {
        UniformData::F32(self)
    }
}

impl UniformValue for i32 {
    fn to_uniform_data(self) -> UniformData {
        UniformData::I32(self)
    }
}

impl UniformValue for Vec2 {
    fn to_uniform_data(self) -> UniformData {
        UniformData::Vec2(self.to_array())
    }
}

impl UniformValue for Vec3 {
    fn to_uniform_data(self) -> UniformData {
        UniformData::Vec3(self.to_array())
    }
}

impl UniformValue for Vec4 {
    fn to_uniform_data(self) -> UniformData {
        UniformData::Vec4(self.to_array())
    }
}

/// Linked GPU program with cached attribute and uniform lookups.
///
/// The program is deleted on drop.
pub struct Shader {
    ctx: RenderContext,
    id: ProgramId,
    attributes: RefCell<HashMap<String, Option<u32>>>,
    uniforms: RefCell<HashMap<String, Uniform>>,
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Shader {
    /// Takes ownership of an already linked program.
    pub fn from_program(ctx: &RenderContext, id: ProgramId) -> Self {
        log::debug!("shader program {} adopted", id.get());
        Self {
            ctx: ctx.clone(),
            id,
            attributes: RefCell::new(HashMap::new()),
            uniforms: RefCell::new(HashMap::new()),
        }
    }

    /// Compiles and links a vertex/fragment pair.
    pub fn link(ctx: &RenderContext, vertex: &str, fragment: &str) -> Result<Self> {
        let id = ctx
            .driver()
            .link_program(vertex, fragment)
            .map_err(|log| anyhow!("shader link failed: {}", log.trim_end()))?;
        Ok(Self::from_program(ctx, id))
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Makes this program current; no-op when it already is.
    pub fn bind(&self) {
        self.ctx.use_program(self.id);
    }

    pub fn is_bound(&self) -> bool {
        self.ctx.bindings().program == Some(self.id)
    }

    /// Vertex attribute slot for `name`, `None` if the program has no such input.
    pub fn attribute(&self, name: &str) -> Option<u32> {
        if let Some(slot) = self.attributes.borrow().get(name) {
            return *slot;
        }
        let slot = self.ctx.driver().attrib_location(self.id, name);
        self.attributes.borrow_mut().insert(name.to_owned(), slot);
        slot
    }

    pub fn uniform(&self, name: &str) -> Uniform {
        if let Some(uniform) = self.uniforms.borrow().get(name) {
            return *uniform;
        }
        let uniform = Uniform(self.ctx.driver().uniform_location(self.id, name));
        if !uniform.is_valid() {
            log::debug!("uniform {name:?} not active in program {}", self.id.get());
        }
        self.uniforms.borrow_mut().insert(name.to_owned(), uniform);
        uniform
    }

    /// Uploads `value` to `uniform`. The program must be bound; an invalid
    /// uniform is ignored.
    pub fn set_uniform<V: UniformValue>(&self, uniform: Uniform, value: V) {
        debug_assert!(
            self.is_bound(),
            "uniform set on program {} while it is not bound",
            self.id.get()
        );
        if let Some(location) = uniform.location() {
            self.ctx.driver().uniform(location, value.to_uniform_data());
        }
    }

    pub fn set_uniform_by_name<V: UniformValue>(&self, name: &str, value: V) {
        let uniform = self.uniform(name);
        self.set_uniform(uniform, value);
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.ctx.forget_program(self.id);
        self.ctx.driver().delete_program(self.id);
        log::debug!("shader program {} deleted", self.id.get());
    }
}
