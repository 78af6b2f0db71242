//! Kiln engine crate.
//!
//! Render-state tracking and GPU resource ownership over OpenGL, plus the
//! window runtime that hosts them.

pub mod gl;
pub mod render;
pub mod resource;
pub mod blit;

pub mod coords;
pub mod input;
pub mod logging;
pub mod time;
pub mod window;
