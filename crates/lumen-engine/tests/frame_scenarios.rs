//! End-to-end frames through the public API on the recording backend.

use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use lumen_engine::backend::recording::{Command, RecordingDevice, RecordingEncoder};
use lumen_engine::backend::{ShaderInput, ShaderInterface};
use lumen_engine::render::AssetReader;
use lumen_engine::source::{UniformType, VertexFormat};
use lumen_engine::{
    Color, RenderSource, Renderer, Scene, SetupError, ShaderProgram, Uniform, UniformValue, Vertex,
};

#[derive(Default)]
struct PngAssets(HashMap<PathBuf, Vec<u8>>);

impl PngAssets {
    fn with_png(mut self, path: &str, width: u32, height: u32) -> Self {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        self.0.insert(PathBuf::from(path), bytes);
        self
    }
}

impl AssetReader for PngAssets {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

fn unit_square() -> Scene {
    let mut scene = Scene::new(ShaderProgram::wgsl("// recorded"));
    scene.vertices = vec![
        Vertex::new([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0]).with_uv([0.0, 1.0]),
        Vertex::new([0.5, -0.5, 0.0], [0.0, 1.0, 0.0]).with_uv([1.0, 1.0]),
        Vertex::new([0.5, 0.5, 0.0], [0.0, 0.0, 1.0]).with_uv([1.0, 0.0]),
        Vertex::new([-0.5, 0.5, 0.0], [1.0, 1.0, 0.0]).with_uv([0.0, 0.0]),
    ];
    scene.indices = vec![0, 1, 2, 0, 2, 3];
    scene
}

/// Advances a `time` uniform by a fixed step per tick.
struct Clock {
    scene: Scene,
    ticks: u32,
}

impl RenderSource for Clock {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tick(&mut self) {
        self.ticks += 1;
        if let Some(time) = self.scene.uniform_mut("time") {
            time.value = UniformValue::Float(self.ticks as f32 / 60.0);
        }
    }
}

#[test]
fn unit_square_without_textures_or_uniforms() {
    let device = RecordingDevice::new();
    let mut scene = unit_square();
    scene.clear_color = Color::rgb(0.0, 0.0, 0.0);
    let mut renderer = Renderer::with_assets(&device, scene, PngAssets::default()).unwrap();
    let mut encoder = RecordingEncoder::new();

    renderer.render_frame(&device, &mut encoder);

    let cmds = encoder.take();
    let kinds: Vec<&str> = cmds
        .iter()
        .map(|c| match c {
            Command::Clear(_) => "clear",
            Command::SetPipeline(_) => "pipeline",
            Command::SetVertexBuffer { .. } => "vertex",
            Command::SetIndexBuffer { .. } => "index",
            Command::SetUniformBuffer { .. } => "uniform",
            Command::SetTexture { .. } => "texture",
            Command::DrawIndexed { .. } => "draw",
        })
        .collect();
    assert_eq!(kinds, ["clear", "pipeline", "vertex", "index", "draw"]);
    assert_eq!(cmds.last(), Some(&Command::DrawIndexed { index_count: 6 }));
}

#[test]
fn textured_square_with_two_float_uniforms() {
    let device = RecordingDevice::new().with_interface(ShaderInterface {
        vertex_inputs: vec![
            ShaderInput { location: 0, format: VertexFormat::Float32x3 },
            ShaderInput { location: 2, format: VertexFormat::Float32x2 },
        ],
        uniforms: Some(vec![UniformType::Float, UniformType::Float]),
        texture_bindings: vec![0],
        uses_sampler: true,
    });
    let mut scene = unit_square();
    scene.texture_paths = vec![PathBuf::from("checker.png")];
    scene.uniforms = vec![Uniform::float("time", 0.0), Uniform::float("scale", 1.5)];
    let assets = PngAssets::default().with_png("checker.png", 4, 4);

    let mut renderer =
        Renderer::with_assets(&device, Clock { scene, ticks: 0 }, assets).unwrap();
    let mut encoder = RecordingEncoder::new();

    renderer.render_frame(&device, &mut encoder);
    let cmds = encoder.take();

    assert_eq!(renderer.uniforms().size(), Some(8));
    assert_eq!(renderer.uniforms().bytes().len(), 8);

    let texture_binds: Vec<_> = cmds
        .iter()
        .filter(|c| matches!(c, Command::SetTexture { .. }))
        .collect();
    assert_eq!(texture_binds.len(), 1);
    assert!(matches!(texture_binds[0], Command::SetTexture { slot: 0, .. }));

    let uniform_buffer = cmds
        .iter()
        .find_map(|c| match c {
            Command::SetUniformBuffer { buffer, .. } => Some(*buffer),
            _ => None,
        })
        .unwrap();
    let bytes = device.buffer_contents(uniform_buffer);
    assert_eq!(bytes.len(), 8);
    assert_eq!(f32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 1.0 / 60.0);
    assert_eq!(f32::from_ne_bytes(bytes[4..8].try_into().unwrap()), 1.5);
}

#[test]
fn many_frames_keep_the_same_shape() {
    let device = RecordingDevice::new();
    let source = Clock { scene: unit_square(), ticks: 0 };
    let mut renderer = Renderer::with_assets(&device, source, PngAssets::default()).unwrap();
    let mut encoder = RecordingEncoder::new();

    renderer.render_frame(&device, &mut encoder);
    let first = encoder.take();
    for _ in 0..59 {
        renderer.render_frame(&device, &mut encoder);
        assert_eq!(encoder.take(), first);
    }

    assert_eq!(renderer.source().ticks, 60);
    assert_eq!(renderer.frame_index(), 60);
}

#[test]
fn setup_errors_surface_from_the_constructor() {
    let device = RecordingDevice::new();

    let mut bad_index = unit_square();
    bad_index.indices[5] = 4;
    assert!(matches!(
        Renderer::with_assets(&device, bad_index, PngAssets::default()),
        Err(SetupError::IndexOutOfBounds { position: 5, index: 4, vertex_count: 4 })
    ));

    let mut missing_texture = unit_square();
    missing_texture.texture_paths = vec![PathBuf::from("nope.png")];
    assert!(matches!(
        Renderer::with_assets(&device, missing_texture, PngAssets::default()),
        Err(SetupError::Texture(_))
    ));

    let mut stray_uniform = unit_square();
    stray_uniform.uniforms = vec![Uniform::int("frame", 0)];
    assert!(matches!(
        Renderer::with_assets(&device, stray_uniform, PngAssets::default()),
        Err(SetupError::UniformLayoutMismatch { .. })
    ));

    let empty_shader = Scene::new(ShaderProgram::wgsl(""));
    assert!(matches!(
        Renderer::with_assets(&device, empty_shader, PngAssets::default()),
        Err(SetupError::Shader(_))
    ));
}
