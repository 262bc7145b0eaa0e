//! Backend contracts.
//!
//! The renderer never talks to a graphics API directly. It builds resources
//! through a [`Device`] and records commands into a [`FrameEncoder`]:
//! - `device::WgpuDevice` / `device::WgpuFrameEncoder` drive a real GPU
//! - [`recording`] captures everything in memory (tests, headless capture)

pub mod recording;

use crate::color::Color;
use crate::error::SetupError;
use crate::source::{ShaderProgram, UniformType, VertexFormat, VertexLayout};

/// Device capabilities, resolved once at startup.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DeviceCaps {
    /// Textures a single fragment stage may sample.
    pub max_texture_slots: usize,
}

/// Intended use of a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    Vertex,
    Index,
    /// Uniform buffers are rewritten in place every frame.
    Uniform,
}

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Copy, Clone)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

/// One vertex-stage input declared by a shader.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderInput {
    pub location: u32,
    pub format: VertexFormat,
}

/// Reflected interface of a compiled shader program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderInterface {
    /// Inputs of the vertex entry point, bound by location.
    pub vertex_inputs: Vec<ShaderInput>,
    /// Member types of the uniform block, in declaration order. `None` when the
    /// shader declares no uniform block.
    pub uniforms: Option<Vec<UniformType>>,
    /// Texture slots the shader declares, ascending.
    pub texture_bindings: Vec<u32>,
    /// Whether the shader declares the shared sampler.
    pub uses_sampler: bool,
}

/// Shader module plus what it expects from the pipeline.
#[derive(Debug)]
pub struct CompiledShader<S> {
    pub module: S,
    pub interface: ShaderInterface,
}

/// Everything a device needs to build the pipeline-state object.
#[derive(Debug)]
pub struct PipelineDesc<'a, S> {
    pub label: &'a str,
    pub shader: &'a S,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub vertex_layout: &'a VertexLayout,
    /// Size of the uniform block in bytes; `None` when there are no uniforms.
    pub uniform_size: Option<u64>,
    /// Number of texture slots the pipeline binds (`0..texture_slots`).
    pub texture_slots: u32,
}

/// Resource factory.
///
/// Handles are owned by whoever created them; the device keeps no registry the
/// renderer relies on.
pub trait Device {
    type Buffer;
    type Texture;
    type Shader;
    type Pipeline;

    fn caps(&self) -> DeviceCaps;

    fn compile_shader(
        &self,
        program: &ShaderProgram,
    ) -> Result<CompiledShader<Self::Shader>, SetupError>;

    fn create_buffer(&self, label: &str, usage: BufferUsage, contents: &[u8]) -> Self::Buffer;

    /// Overwrites the start of `buffer` with `data`.
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]);

    fn create_texture(&self, label: &str, image: &TextureImage<'_>) -> Self::Texture;

    fn create_pipeline(
        &self,
        desc: &PipelineDesc<'_, Self::Shader>,
    ) -> Result<Self::Pipeline, SetupError>;
}

/// Command-encoding context for one frame.
///
/// Commands take effect in call order. A draw consumes whatever is bound at
/// the moment it is issued.
pub trait FrameEncoder<D: Device + ?Sized> {
    fn clear(&mut self, color: Color);
    fn set_pipeline(&mut self, pipeline: &D::Pipeline);
    fn set_vertex_buffer(&mut self, slot: u32, buffer: &D::Buffer);
    /// Index buffers are always `u32`.
    fn set_index_buffer(&mut self, buffer: &D::Buffer);
    fn set_uniform_buffer(&mut self, binding: u32, buffer: &D::Buffer);
    fn set_texture(&mut self, slot: u32, texture: &D::Texture);
    fn draw_indexed(&mut self, index_count: u32);

    /// Closes the pass. Further commands for this frame are invalid.
    fn end_encoding(&mut self) {}
}
