use std::borrow::Cow;

use wgpu::util::DeviceExt;

use crate::backend::{
    BufferUsage, CompiledShader, Device, DeviceCaps, PipelineDesc, TextureImage,
};
use crate::error::SetupError;
use crate::source::{ShaderProgram, ShaderSource};

use super::reflect::{self, SAMPLER_GROUP, TEXTURE_GROUP, UNIFORM_GROUP};

/// Uniform buffers are allocated in multiples of this many bytes.
const UNIFORM_ALIGNMENT: u64 = 16;

/// [`Device`] backed by a wgpu device and queue.
///
/// Pipelines target `surface_format`. Cloning is cheap: wgpu handles are
/// reference counted.
#[derive(Clone)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    caps: DeviceCaps,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        let limits = device.limits();
        let caps = DeviceCaps {
            max_texture_slots: limits.max_sampled_textures_per_shader_stage as usize,
        };
        Self {
            device,
            queue,
            surface_format,
            caps,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Runs `f` inside a validation error scope and returns what it caught.
    fn validated<T>(&self, f: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

/// Uploaded RGBA texture plus the view bound to its slot.
pub struct WgpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Render pipeline plus the bind-group layouts its frames are bound with.
///
/// Group layout:
/// - group 0: uniform buffer at binding 0 (empty without uniforms)
/// - group 1: texture `slot` at binding `slot`
/// - group 2: linear sampler at binding 0 (empty without textures)
#[derive(Clone)]
pub struct WgpuPipeline {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniform_layout: wgpu::BindGroupLayout,
    pub(crate) texture_layout: wgpu::BindGroupLayout,
    pub(crate) sampler_group: wgpu::BindGroup,
    pub(crate) uniform_size: Option<u64>,
    pub(crate) texture_slots: u32,
}

impl WgpuPipeline {
    pub fn raw(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

impl Device for WgpuDevice {
    type Buffer = wgpu::Buffer;
    type Texture = WgpuTexture;
    type Shader = wgpu::ShaderModule;
    type Pipeline = WgpuPipeline;

    fn caps(&self) -> DeviceCaps {
        self.caps
    }

    fn compile_shader(
        &self,
        program: &ShaderProgram,
    ) -> Result<CompiledShader<Self::Shader>, SetupError> {
        let code: Cow<'_, str> = match &program.source {
            ShaderSource::Wgsl(code) => Cow::Borrowed(code.as_ref()),
            ShaderSource::Path(path) => Cow::Owned(std::fs::read_to_string(path).map_err(|e| {
                SetupError::Shader(format!("failed to read {}: {e}", path.display()))
            })?),
        };

        let interface =
            reflect::reflect_wgsl(&code, &program.vertex_entry, &program.fragment_entry)?;

        let label = format!("lumen shader ({})", program.label());
        let module = self
            .validated(|| {
                self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&label),
                    source: wgpu::ShaderSource::Wgsl(code),
                })
            })
            .map_err(|e| SetupError::Shader(format!("{label}: {e}")))?;

        log::debug!(
            "compiled {label}: {} vertex inputs, uniform block {:?}",
            interface.vertex_inputs.len(),
            interface.uniforms
        );

        Ok(CompiledShader { module, interface })
    }

    fn create_buffer(&self, label: &str, usage: BufferUsage, contents: &[u8]) -> Self::Buffer {
        match usage {
            BufferUsage::Vertex | BufferUsage::Index => {
                let usage = if usage == BufferUsage::Vertex {
                    wgpu::BufferUsages::VERTEX
                } else {
                    wgpu::BufferUsages::INDEX
                };
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: usage | wgpu::BufferUsages::COPY_DST,
                })
            }
            BufferUsage::Uniform => {
                // Only the allocation is padded; the bytes written stay exact.
                let size = (contents.len() as u64)
                    .max(1)
                    .next_multiple_of(UNIFORM_ALIGNMENT);
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                self.write_buffer(&buffer, contents);
                buffer
            }
        }
    }

    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.queue.write_buffer(buffer, 0, data);
    }

    fn create_texture(&self, label: &str, image: &TextureImage<'_>) -> Self::Texture {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        WgpuTexture { texture, view }
    }

    fn create_pipeline(
        &self,
        desc: &PipelineDesc<'_, Self::Shader>,
    ) -> Result<Self::Pipeline, SetupError> {
        if desc.texture_slots as usize > self.caps.max_texture_slots {
            return Err(SetupError::Pipeline(format!(
                "{} texture slots requested, device supports {}",
                desc.texture_slots, self.caps.max_texture_slots
            )));
        }

        self.validated(|| self.build_pipeline(desc))
            .map_err(|e| SetupError::Pipeline(format!("{}: {e}", desc.label)))
    }
}

impl WgpuDevice {
    fn build_pipeline(&self, desc: &PipelineDesc<'_, wgpu::ShaderModule>) -> WgpuPipeline {
        let uniform_entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .uniform_size
            .map(|size| wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(size),
                },
                count: None,
            })
            .into_iter()
            .collect();

        let texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..desc.texture_slots)
            .map(|slot| wgpu::BindGroupLayoutEntry {
                binding: slot,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();

        let sampler_entries: Vec<wgpu::BindGroupLayoutEntry> = (desc.texture_slots > 0)
            .then_some(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            })
            .into_iter()
            .collect();

        let layout = |group: u32, entries: &[wgpu::BindGroupLayoutEntry]| {
            self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} group {group}", desc.label)),
                entries,
            })
        };
        let uniform_layout = layout(UNIFORM_GROUP, &uniform_entries);
        let texture_layout = layout(TEXTURE_GROUP, &texture_entries);
        let sampler_layout = layout(SAMPLER_GROUP, &sampler_entries);

        let sampler_group = if desc.texture_slots > 0 {
            let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("lumen linear sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            });
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lumen sampler bind group"),
                layout: &sampler_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                }],
            })
        } else {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lumen empty sampler bind group"),
                layout: &sampler_layout,
                entries: &[],
            })
        };

        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&uniform_layout, &texture_layout, &sampler_layout],
            immediate_size: 0,
        });

        let attributes: Vec<wgpu::VertexAttribute> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: a.format.into(),
                offset: a.offset,
                shader_location: a.location,
            })
            .collect();

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: desc.shader,
                entry_point: Some(desc.vertex_entry),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: desc.vertex_layout.stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },

            fragment: Some(wgpu::FragmentState {
                module: desc.shader,
                entry_point: Some(desc.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(color_target(self.surface_format))],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        WgpuPipeline {
            pipeline,
            uniform_layout,
            texture_layout,
            sampler_group,
            uniform_size: desc.uniform_size,
            texture_slots: desc.texture_slots,
        }
    }
}

/// Opaque single-target output: fragments overwrite the cleared color.
fn color_target(format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
    wgpu::ColorTargetState {
        format,
        blend: Some(wgpu::BlendState::REPLACE),
        write_mask: wgpu::ColorWrites::ALL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Renderer;
    use crate::source::{Scene, Vertex, VertexLayout};

    const SAMPLES_SLOT_0: &str = r#"
@group(1) @binding(0) var tex0: texture_2d<f32>;
@group(2) @binding(0) var samp: sampler;

struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(2) uv: vec2<f32>) -> VsOut {
    var out: VsOut;
    out.clip = vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return textureSample(tex0, samp, in.uv);
}
"#;

    const PLAIN: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;

    fn noop_device() -> WgpuDevice {
        let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        WgpuDevice::new(device, queue, wgpu::TextureFormat::Rgba8UnormSrgb)
    }

    fn triangle(shader: &'static str) -> Scene {
        let mut scene = Scene::new(ShaderProgram::wgsl(shader));
        scene.vertices = vec![
            Vertex::new([0.0, 0.5, 0.0], [1.0, 0.0, 0.0]),
            Vertex::new([-0.5, -0.5, 0.0], [0.0, 1.0, 0.0]),
            Vertex::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0]),
        ];
        scene.indices = vec![0, 1, 2];
        scene
    }

    #[test]
    fn sampling_shader_without_textures_fails_setup() {
        let device = noop_device();
        let result = Renderer::new(&device, triangle(SAMPLES_SLOT_0));
        assert!(matches!(
            result.err(),
            Some(SetupError::UnboundTexture { slot: 0, texture_count: 0 })
        ));
    }

    #[test]
    fn pipeline_validation_errors_are_returned() {
        let device = noop_device();
        let compiled = device
            .compile_shader(&ShaderProgram::wgsl(SAMPLES_SLOT_0))
            .unwrap();
        let layout = VertexLayout::of_vertex();

        // No texture slots in the layout, but the shader samples slot 0.
        let err = device
            .create_pipeline(&PipelineDesc {
                label: "unbound texture",
                shader: &compiled.module,
                vertex_entry: "vs_main",
                fragment_entry: "fs_main",
                vertex_layout: &layout,
                uniform_size: None,
                texture_slots: 0,
            })
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::Pipeline(ref m) if m.starts_with("unbound texture")));

        assert!(device
            .create_pipeline(&PipelineDesc {
                label: "one texture",
                shader: &compiled.module,
                vertex_entry: "vs_main",
                fragment_entry: "fs_main",
                vertex_layout: &layout,
                uniform_size: None,
                texture_slots: 1,
            })
            .is_ok());
    }

    #[test]
    fn fragments_replace_the_target() {
        let target = color_target(wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(target.blend, Some(wgpu::BlendState::REPLACE));
        assert_eq!(target.write_mask, wgpu::ColorWrites::ALL);
    }

    #[test]
    fn plain_triangle_builds_on_the_device() {
        let device = noop_device();
        assert!(Renderer::new(&device, triangle(PLAIN)).is_ok());
    }
}
