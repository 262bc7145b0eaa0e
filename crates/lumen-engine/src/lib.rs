//! lumen engine crate.
//!
//! A single-pass render loop: a [`Scene`] (geometry, textures, one shader
//! program, per-frame uniforms) is turned into GPU state once, then re-encoded
//! and submitted every frame by a [`Renderer`].
//!
//! - [`source`]: the scene data contract and the `RenderSource` tick hook
//! - [`render`]: the handlers and the frame-loop `Renderer`
//! - [`backend`]: the `Device` / `FrameEncoder` traits and a recording backend
//! - [`device`]: the wgpu backend and window surface
//! - [`window`]: a winit runtime that drives one renderer

pub mod backend;
pub mod color;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;
pub mod source;
pub mod window;

pub use color::Color;
pub use error::{LoadError, SetupError};
pub use render::{Renderer, RendererState};
pub use source::{RenderSource, Scene, ShaderProgram, Uniform, UniformValue, Vertex};
