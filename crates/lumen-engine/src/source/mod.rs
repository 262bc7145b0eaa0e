//! Scene description consumed by the renderer.
//!
//! `Scene` is plain data. `RenderSource` adds the per-frame `tick()` hook that
//! lets an application animate that data between frames.

mod shader;
mod uniform;
mod vertex;

use std::path::PathBuf;

use crate::color::Color;

pub use shader::{ShaderProgram, ShaderSource};
pub use uniform::{Uniform, UniformType, UniformValue, UNIFORM_SLOT_SIZE};
pub use vertex::{
    Vertex, VertexAttribute, VertexFormat, VertexLayout, COLOR_LOCATION, POSITION_LOCATION,
    TEX_COORD_BASE_LOCATION, TEX_COORD_SETS,
};

/// Everything needed to draw one frame.
///
/// Invariants checked when a renderer is built:
/// - `indices.len()` is a multiple of 3 and every index is `< vertices.len()`
/// - `texture_paths.len()` does not exceed the available texture slots
/// - uniform types match the shader's uniform block, when it declares one
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub shader: ShaderProgram,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub clear_color: Color,
    /// Texture for slot `i` is `texture_paths[i]`.
    pub texture_paths: Vec<PathBuf>,
    /// Uploaded in this order, one 4-byte slot each.
    pub uniforms: Vec<Uniform>,
}

impl Scene {
    /// Creates an empty scene drawn with `shader`.
    pub fn new(shader: ShaderProgram) -> Self {
        Self {
            shader,
            vertices: Vec::new(),
            indices: Vec::new(),
            clear_color: Color::BLACK,
            texture_paths: Vec::new(),
            uniforms: Vec::new(),
        }
    }

    pub fn uniform_types(&self) -> Vec<UniformType> {
        self.uniforms.iter().map(Uniform::ty).collect()
    }

    /// Looks up a uniform by name for in-place updates from `tick()`.
    pub fn uniform_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        self.uniforms.iter_mut().find(|u| u.name == name)
    }
}

/// Scene provider driven by the renderer.
pub trait RenderSource {
    /// Current scene state.
    fn scene(&self) -> &Scene;

    /// Advances the scene by one frame.
    ///
    /// Called exactly once per rendered frame, before any command of that frame
    /// is encoded.
    fn tick(&mut self) {}
}

impl RenderSource for Scene {
    fn scene(&self) -> &Scene {
        self
    }
}
