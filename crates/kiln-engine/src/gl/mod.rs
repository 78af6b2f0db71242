//! GL driver seam.
//!
//! Everything above this module talks to the GPU through [`GlDriver`]:
//! - [`GlowDriver`] forwards to a real OpenGL context via `glow`
//! - [`RecordingDriver`] records calls for headless runs and tests

mod driver;
mod glow_driver;
mod recording;

pub use driver::{
    BufferId, FramebufferId, GlDriver, ProgramId, TextureId, UniformData, UniformLocation,
    VertexArrayId,
};
pub use glow_driver::GlowDriver;
pub use recording::{Call, RecordingDriver};
