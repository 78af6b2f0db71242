//! Render state machine.
//!
//! `RenderContext` mirrors the GPU's pipeline state and bound objects so that
//! redundant changes never reach the driver.
//!
//! Convention:
//! - every state change goes through a `RenderContext`, never the driver directly
//! - values are stored encoded (`u32`), see `state` for the encodings

mod ctx;
pub mod state;

pub use ctx::{Bindings, ContextInfo, RenderContext};
pub use state::{
    BlendFactor, BlendOp, ClearMask, CompareFunc, CullMode, RenderState, RenderStateTable,
};
