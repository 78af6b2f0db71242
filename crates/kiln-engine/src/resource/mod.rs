//! GPU resource wrappers.
//!
//! Every resource holds a `RenderContext` clone, releases its GPU object on
//! drop and clears the matching bound-object marker.

pub mod cache;
mod framebuffer;
mod geometry;
mod loader;
mod shader;
mod texture;

pub use cache::ResourceCache;
pub use framebuffer::Framebuffer;
pub use geometry::{
    ElementType, PrimitiveType, StaticGeometry, VertexAttribute, VertexLayout, VertexList,
};
pub use loader::{TextureLoader, texture_from_image};
pub use shader::{Shader, Uniform, UniformValue};
pub use texture::{Filter, Texture, TextureDesc, TextureFormat};
