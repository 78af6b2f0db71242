//! Window + runtime loop.
//!
//! Owns the `winit` event loop and window, creates the GL context through
//! `glutin`, and hands a `RenderContext` to registered closures.

mod runtime;

pub use runtime::{FrameCtx, Runtime, RuntimeConfig};
