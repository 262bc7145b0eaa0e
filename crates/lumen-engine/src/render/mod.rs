//! Frame orchestration.
//!
//! Each handler owns the GPU resources for one slice of the scene and is built
//! once, when the `Renderer` is constructed. Per frame, the renderer calls the
//! handlers in a fixed order so every bind lands before the draw.

mod assets;
mod pipeline;
mod renderer;
mod texture_loader;
mod textures;
mod uniforms;
mod vertex;

use crate::backend::{Device, FrameEncoder};
use crate::source::Scene;

pub use assets::{AssetReader, FsAssets};
pub use pipeline::PipelineHandler;
pub use renderer::{Renderer, RendererState};
pub use texture_loader::{TextureHandle, TextureLoader};
pub use textures::TextureHandler;
pub use uniforms::{serialize_uniforms, UniformsHandler, UNIFORM_BINDING};
pub use vertex::{VertexHandler, VERTEX_BUFFER_SLOT};

/// Per-frame encode step shared by all handlers.
///
/// Setup is each handler's fallible `new`; `encode` runs every frame and must
/// not fail. Inconsistent input degrades the frame instead.
pub trait EncodeStage<D: Device> {
    fn encode<E>(&mut self, device: &D, scene: &Scene, encoder: &mut E)
    where
        E: FrameEncoder<D> + ?Sized;
}
