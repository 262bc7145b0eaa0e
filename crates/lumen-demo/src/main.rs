//! Spinning quad demo.
//!
//! `lumen-demo [texture]` draws a vertex-colored quad rotating at a fixed
//! rate; with a texture path the quad is textured instead.

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use lumen_engine::device::GpuInit;
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::window::{Runtime, RuntimeConfig};
use lumen_engine::{Color, RenderSource, Scene, ShaderProgram, Uniform, UniformValue, Vertex};
use winit::dpi::LogicalSize;

/// Full turns per second.
const SPIN_RATE: f32 = 0.25;

struct SpinningQuad {
    scene: Scene,
    started: Instant,
}

impl SpinningQuad {
    fn new(texture: Option<PathBuf>) -> Self {
        let shader = match texture {
            Some(_) => ShaderProgram::wgsl(include_str!("../shaders/textured.wgsl")),
            None => ShaderProgram::wgsl(include_str!("../shaders/quad.wgsl")),
        };

        let mut scene = Scene::new(shader);
        scene.vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], [1.0, 0.2, 0.2]).with_uv([0.0, 1.0]),
            Vertex::new([0.5, -0.5, 0.0], [0.2, 1.0, 0.2]).with_uv([1.0, 1.0]),
            Vertex::new([0.5, 0.5, 0.0], [0.2, 0.2, 1.0]).with_uv([1.0, 0.0]),
            Vertex::new([-0.5, 0.5, 0.0], [1.0, 1.0, 0.2]).with_uv([0.0, 0.0]),
        ];
        scene.indices = vec![0, 1, 2, 0, 2, 3];
        scene.clear_color = Color::from_srgb_u8(0x12, 0x14, 0x1c, 0xff);
        scene.texture_paths = texture.into_iter().collect();
        scene.uniforms = vec![Uniform::float("time", 0.0), Uniform::float("angle", 0.0)];

        Self {
            scene,
            started: Instant::now(),
        }
    }
}

impl RenderSource for SpinningQuad {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn tick(&mut self) {
        let t = self.started.elapsed().as_secs_f32();
        if let Some(u) = self.scene.uniform_mut("time") {
            u.value = UniformValue::Float(t);
        }
        if let Some(u) = self.scene.uniform_mut("angle") {
            u.value = UniformValue::Float((t * SPIN_RATE * TAU) % TAU);
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let texture = std::env::args_os().nth(1).map(PathBuf::from);
    match &texture {
        Some(path) => log::info!("texturing quad with {}", path.display()),
        None => log::info!("no texture given; drawing vertex colors"),
    }

    let config = RuntimeConfig {
        title: "lumen demo".to_string(),
        initial_size: LogicalSize::new(800.0, 800.0),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), move || SpinningQuad::new(texture.clone()))
}
