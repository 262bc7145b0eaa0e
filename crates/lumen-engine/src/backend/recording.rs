//! In-memory backend that records commands instead of executing them.
//!
//! Buffers keep their bytes so uploads can be inspected; every created
//! resource gets a sequential id so commands can be compared by value.

use std::cell::{Cell, RefCell};

use crate::color::Color;
use crate::error::SetupError;
use crate::source::{ShaderProgram, ShaderSource, VertexFormat, TEX_COORD_SETS};

use super::{
    BufferUsage, CompiledShader, Device, DeviceCaps, FrameEncoder, PipelineDesc, ShaderInput,
    ShaderInterface, TextureImage,
};

/// A recorded buffer handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferId {
    pub id: u32,
    pub usage: BufferUsage,
}

/// A recorded texture handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureId {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// A recorded pipeline handle.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PipelineId {
    pub id: u32,
    pub label: String,
    pub texture_slots: u32,
    pub uniform_size: Option<u64>,
}

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Clear(Color),
    SetPipeline(u32),
    SetVertexBuffer { slot: u32, buffer: u32 },
    SetIndexBuffer { buffer: u32 },
    SetUniformBuffer { binding: u32, buffer: u32 },
    SetTexture { slot: u32, texture: u32 },
    DrawIndexed { index_count: u32 },
}

impl Command {
    pub fn is_bind(&self) -> bool {
        matches!(
            self,
            Self::SetPipeline(_)
                | Self::SetVertexBuffer { .. }
                | Self::SetIndexBuffer { .. }
                | Self::SetUniformBuffer { .. }
                | Self::SetTexture { .. }
        )
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawIndexed { .. })
    }
}

/// Headless [`Device`].
///
/// `compile_shader` returns the configured interface (by default the position
/// and color inputs of `Vertex`, no uniform block), or the configured error.
pub struct RecordingDevice {
    caps: DeviceCaps,
    interface: ShaderInterface,
    shader_error: Option<String>,

    next_id: Cell<u32>,
    buffers: RefCell<Vec<Vec<u8>>>,
    buffer_writes: Cell<usize>,
    textures_created: Cell<usize>,
    pipelines_created: Cell<usize>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            caps: DeviceCaps { max_texture_slots: TEX_COORD_SETS },
            interface: ShaderInterface {
                vertex_inputs: vec![
                    ShaderInput { location: 0, format: VertexFormat::Float32x3 },
                    ShaderInput { location: 1, format: VertexFormat::Float32x3 },
                ],
                ..ShaderInterface::default()
            },
            shader_error: None,
            next_id: Cell::new(0),
            buffers: RefCell::new(Vec::new()),
            buffer_writes: Cell::new(0),
            textures_created: Cell::new(0),
            pipelines_created: Cell::new(0),
        }
    }

    pub fn with_max_texture_slots(mut self, slots: usize) -> Self {
        self.caps.max_texture_slots = slots;
        self
    }

    pub fn with_interface(mut self, interface: ShaderInterface) -> Self {
        self.interface = interface;
        self
    }

    /// Makes every subsequent `compile_shader` fail with `message`.
    pub fn with_shader_error(mut self, message: impl Into<String>) -> Self {
        self.shader_error = Some(message.into());
        self
    }

    /// Current bytes of a buffer created by this device.
    pub fn buffer_contents(&self, buffer: u32) -> Vec<u8> {
        self.buffers
            .borrow()
            .get(buffer as usize)
            .cloned()
            .unwrap_or_default()
    }

    pub fn buffer_writes(&self) -> usize {
        self.buffer_writes.get()
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created.get()
    }

    pub fn pipelines_created(&self) -> usize {
        self.pipelines_created.get()
    }

    fn next_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl Device for RecordingDevice {
    type Buffer = BufferId;
    type Texture = TextureId;
    type Shader = ShaderInterface;
    type Pipeline = PipelineId;

    fn caps(&self) -> DeviceCaps {
        self.caps
    }

    fn compile_shader(
        &self,
        program: &ShaderProgram,
    ) -> Result<CompiledShader<Self::Shader>, SetupError> {
        if let Some(message) = &self.shader_error {
            return Err(SetupError::Shader(message.clone()));
        }
        if let ShaderSource::Wgsl(code) = &program.source {
            if code.trim().is_empty() {
                return Err(SetupError::Shader("empty shader source".to_string()));
            }
        }
        Ok(CompiledShader {
            module: self.interface.clone(),
            interface: self.interface.clone(),
        })
    }

    fn create_buffer(&self, _label: &str, usage: BufferUsage, contents: &[u8]) -> Self::Buffer {
        // Ids double as indices into `buffers`, so buffers take ids from their own range.
        let mut buffers = self.buffers.borrow_mut();
        let id = buffers.len() as u32;
        buffers.push(contents.to_vec());
        BufferId { id, usage }
    }

    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]) {
        let mut buffers = self.buffers.borrow_mut();
        let Some(stored) = buffers.get_mut(buffer.id as usize) else { return };
        let n = data.len().min(stored.len());
        stored[..n].copy_from_slice(&data[..n]);
        self.buffer_writes.set(self.buffer_writes.get() + 1);
    }

    fn create_texture(&self, _label: &str, image: &TextureImage<'_>) -> Self::Texture {
        self.textures_created.set(self.textures_created.get() + 1);
        TextureId {
            id: self.next_id(),
            width: image.width,
            height: image.height,
        }
    }

    fn create_pipeline(
        &self,
        desc: &PipelineDesc<'_, Self::Shader>,
    ) -> Result<Self::Pipeline, SetupError> {
        self.pipelines_created.set(self.pipelines_created.get() + 1);
        Ok(PipelineId {
            id: self.next_id(),
            label: desc.label.to_string(),
            texture_slots: desc.texture_slots,
            uniform_size: desc.uniform_size,
        })
    }
}

/// Headless [`FrameEncoder`] collecting commands in call order.
#[derive(Debug, Default)]
pub struct RecordingEncoder {
    commands: Vec<Command>,
    ended: bool,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Returns the commands and resets the encoder for another frame.
    pub fn take(&mut self) -> Vec<Command> {
        self.ended = false;
        std::mem::take(&mut self.commands)
    }

    fn push(&mut self, cmd: Command) {
        debug_assert!(!self.ended, "command {cmd:?} recorded after end_encoding");
        self.commands.push(cmd);
    }
}

impl FrameEncoder<RecordingDevice> for RecordingEncoder {
    fn clear(&mut self, color: Color) {
        self.push(Command::Clear(color));
    }

    fn set_pipeline(&mut self, pipeline: &PipelineId) {
        self.push(Command::SetPipeline(pipeline.id));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: &BufferId) {
        self.push(Command::SetVertexBuffer { slot, buffer: buffer.id });
    }

    fn set_index_buffer(&mut self, buffer: &BufferId) {
        self.push(Command::SetIndexBuffer { buffer: buffer.id });
    }

    fn set_uniform_buffer(&mut self, binding: u32, buffer: &BufferId) {
        self.push(Command::SetUniformBuffer { binding, buffer: buffer.id });
    }

    fn set_texture(&mut self, slot: u32, texture: &TextureId) {
        self.push(Command::SetTexture { slot, texture: texture.id });
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.push(Command::DrawIndexed { index_count });
    }

    fn end_encoding(&mut self) {
        self.ended = true;
    }
}
