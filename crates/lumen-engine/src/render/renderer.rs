use crate::backend::{Device, DeviceCaps, FrameEncoder};
use crate::error::SetupError;
use crate::source::{RenderSource, TEX_COORD_SETS};

use super::assets::{AssetReader, FsAssets};
use super::pipeline::PipelineHandler;
use super::texture_loader::TextureLoader;
use super::textures::TextureHandler;
use super::uniforms::UniformsHandler;
use super::vertex::VertexHandler;
use super::EncodeStage;

/// Where the renderer is in its frame loop.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RendererState {
    /// Built and idle, waiting for the next frame.
    Ready,
    /// Encoding a frame.
    Rendering,
}

/// Drives one scene through one pipeline, one frame at a time.
///
/// Construction does all fallible work (shader compile, validation, uploads,
/// texture loads). After that, [`render_frame`](Self::render_frame) cannot
/// fail; it always encodes, in this order:
///
/// 1. `tick()` on the source
/// 2. clear with the scene's clear color
/// 3. pipeline bind
/// 4. vertex + index buffer bind
/// 5. uniform upload + bind
/// 6. texture binds
/// 7. indexed draw
///
/// Acquiring the frame target and submitting the encoded commands belong to
/// the caller (see `Renderer::draw` for the wgpu backend).
pub struct Renderer<D: Device, S: RenderSource> {
    source: S,
    pipeline: PipelineHandler<D>,
    vertices: VertexHandler<D>,
    uniforms: UniformsHandler<D>,
    textures: TextureHandler<D>,
    state: RendererState,
    frame_index: u64,
}

impl<D: Device, S: RenderSource> Renderer<D, S> {
    /// Texture slots usable on a device: bounded by the device and by the
    /// texture-coordinate sets a vertex carries.
    pub fn texture_slot_count(caps: DeviceCaps) -> usize {
        caps.max_texture_slots.min(TEX_COORD_SETS)
    }

    /// Builds a renderer that reads textures from the filesystem.
    pub fn new(device: &D, source: S) -> Result<Self, SetupError> {
        Self::with_assets(device, source, FsAssets::new())
    }

    /// Builds a renderer that reads textures through `assets`.
    pub fn with_assets<A>(device: &D, source: S, assets: A) -> Result<Self, SetupError>
    where
        A: AssetReader + 'static,
    {
        let scene = source.scene();
        let slot_count = Self::texture_slot_count(device.caps());

        let vertices = VertexHandler::new(device, scene)?;
        let textures =
            TextureHandler::new(device, scene, TextureLoader::new(Box::new(assets)), slot_count)?;
        let uniforms = UniformsHandler::new(device, scene)?;
        let pipeline = PipelineHandler::new(
            device,
            scene,
            vertices.layout(),
            uniforms.layout(),
            textures.texture_count(),
        )?;

        log::info!(
            "renderer ready: {} indices, {} uniforms, {}/{} texture slots",
            vertices.index_count(),
            uniforms.layout().len(),
            textures.texture_count(),
            slot_count
        );

        Ok(Self {
            source,
            pipeline,
            vertices,
            uniforms,
            textures,
            state: RendererState::Ready,
            frame_index: 0,
        })
    }

    /// Advances the source one frame and encodes that frame into `encoder`.
    pub fn render_frame<E>(&mut self, device: &D, encoder: &mut E)
    where
        E: FrameEncoder<D> + ?Sized,
    {
        debug_assert_eq!(self.state, RendererState::Ready);
        self.state = RendererState::Rendering;

        self.source.tick();
        let scene = self.source.scene();

        encoder.clear(scene.clear_color);
        self.pipeline.encode(device, scene, encoder);
        self.vertices.encode(device, scene, encoder);
        self.uniforms.encode(device, scene, encoder);
        self.textures.encode(device, scene, encoder);
        // The draw consumes what is bound right now; nothing may be bound after it.
        self.vertices.draw(encoder);
        encoder.end_encoding();

        self.frame_index += 1;
        self.state = RendererState::Ready;
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Number of frames rendered so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access between frames.
    ///
    /// Geometry and the uniform layout are fixed at construction; changing
    /// them here only affects what later frames clamp to.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn uniforms(&self) -> &UniformsHandler<D> {
        &self.uniforms
    }

    pub fn textures(&self) -> &TextureHandler<D> {
        &self.textures
    }

    pub fn pipeline(&self) -> &PipelineHandler<D> {
        &self.pipeline
    }

    pub fn into_source(self) -> S {
        self.source
    }
}
