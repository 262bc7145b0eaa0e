use crate::backend::{Device, FrameEncoder, PipelineDesc, ShaderInterface};
use crate::error::SetupError;
use crate::source::{Scene, UniformType, VertexLayout, UNIFORM_SLOT_SIZE};

use super::EncodeStage;

/// Builds and binds the immutable pipeline-state object.
pub struct PipelineHandler<D: Device> {
    pipeline: D::Pipeline,
    interface: ShaderInterface,
}

impl<D: Device> PipelineHandler<D> {
    /// Compiles the scene's shader and links it with `vertex_layout`.
    ///
    /// Fails when the shader does not compile, when a vertex input of the
    /// shader has no matching attribute, when the shader's uniform block
    /// disagrees with `uniform_layout`, or when it declares textures or a
    /// sampler beyond the `texture_slots` the scene fills.
    pub fn new(
        device: &D,
        scene: &Scene,
        vertex_layout: &VertexLayout,
        uniform_layout: &[UniformType],
        texture_slots: usize,
    ) -> Result<Self, SetupError> {
        let program = &scene.shader;
        let compiled = device.compile_shader(program)?;

        check_vertex_inputs(&compiled.interface, vertex_layout)?;
        check_uniforms(&compiled.interface, uniform_layout)?;
        check_textures(&compiled.interface, texture_slots)?;

        let uniform_size = (!uniform_layout.is_empty())
            .then(|| (uniform_layout.len() * UNIFORM_SLOT_SIZE) as u64);

        let label = format!("lumen pipeline ({})", program.label());
        let pipeline = device.create_pipeline(&PipelineDesc {
            label: &label,
            shader: &compiled.module,
            vertex_entry: &program.vertex_entry,
            fragment_entry: &program.fragment_entry,
            vertex_layout,
            uniform_size,
            texture_slots: texture_slots as u32,
        })?;

        log::info!("built {label}");

        Ok(Self {
            pipeline,
            interface: compiled.interface,
        })
    }

    pub fn pipeline(&self) -> &D::Pipeline {
        &self.pipeline
    }

    /// Reflected interface of the compiled shader.
    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }
}

impl<D: Device> EncodeStage<D> for PipelineHandler<D> {
    fn encode<E>(&mut self, _device: &D, _scene: &Scene, encoder: &mut E)
    where
        E: FrameEncoder<D> + ?Sized,
    {
        encoder.set_pipeline(&self.pipeline);
    }
}

/// Every shader vertex input must be fed by an attribute of the same format.
/// Attributes the shader does not read are allowed.
fn check_vertex_inputs(interface: &ShaderInterface, layout: &VertexLayout) -> Result<(), SetupError> {
    for input in &interface.vertex_inputs {
        let Some(attr) = layout.attribute(input.location) else {
            return Err(SetupError::MissingVertexAttribute { location: input.location });
        };
        if attr.format != input.format {
            return Err(SetupError::IncompatibleVertexAttribute {
                location: input.location,
                expected: input.format,
                provided: attr.format,
            });
        }
    }
    Ok(())
}

fn check_uniforms(interface: &ShaderInterface, provided: &[UniformType]) -> Result<(), SetupError> {
    match &interface.uniforms {
        Some(expected) if expected.as_slice() != provided => Err(SetupError::UniformLayoutMismatch {
            expected: expected.clone(),
            provided: provided.to_vec(),
        }),
        None if !provided.is_empty() => Err(SetupError::UniformLayoutMismatch {
            expected: Vec::new(),
            provided: provided.to_vec(),
        }),
        _ => Ok(()),
    }
}

fn check_textures(interface: &ShaderInterface, texture_count: usize) -> Result<(), SetupError> {
    if let Some(&slot) = interface
        .texture_bindings
        .iter()
        .find(|&&slot| slot as usize >= texture_count)
    {
        return Err(SetupError::UnboundTexture { slot, texture_count });
    }
    if interface.uses_sampler && texture_count == 0 {
        return Err(SetupError::UnboundSampler);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Command, RecordingDevice, RecordingEncoder};
    use crate::backend::ShaderInput;
    use crate::source::{ShaderProgram, VertexFormat, TEX_COORD_BASE_LOCATION};

    fn interface(inputs: &[(u32, VertexFormat)], uniforms: Option<Vec<UniformType>>) -> ShaderInterface {
        ShaderInterface {
            vertex_inputs: inputs
                .iter()
                .map(|&(location, format)| ShaderInput { location, format })
                .collect(),
            uniforms,
            ..ShaderInterface::default()
        }
    }

    fn build(device: &RecordingDevice, uniforms: &[UniformType]) -> Result<PipelineHandler<RecordingDevice>, SetupError> {
        build_textured(device, uniforms, 0)
    }

    fn build_textured(
        device: &RecordingDevice,
        uniforms: &[UniformType],
        texture_slots: usize,
    ) -> Result<PipelineHandler<RecordingDevice>, SetupError> {
        let scene = Scene::new(ShaderProgram::wgsl("// test"));
        PipelineHandler::new(device, &scene, &VertexLayout::of_vertex(), uniforms, texture_slots)
    }

    fn sampling(texture_bindings: Vec<u32>) -> RecordingDevice {
        RecordingDevice::new().with_interface(ShaderInterface {
            vertex_inputs: vec![ShaderInput { location: 0, format: VertexFormat::Float32x3 }],
            texture_bindings,
            uses_sampler: true,
            ..ShaderInterface::default()
        })
    }

    #[test]
    fn accepts_position_color_and_uv_inputs() {
        let device = RecordingDevice::new().with_interface(interface(
            &[
                (0, VertexFormat::Float32x3),
                (1, VertexFormat::Float32x3),
                (TEX_COORD_BASE_LOCATION, VertexFormat::Float32x2),
            ],
            None,
        ));
        assert!(build(&device, &[]).is_ok());
        assert_eq!(device.pipelines_created(), 1);
    }

    #[test]
    fn format_mismatch_is_rejected() {
        let device = RecordingDevice::new()
            .with_interface(interface(&[(0, VertexFormat::Float32x4)], None));
        let err = build(&device, &[]).err().unwrap();
        assert!(matches!(
            err,
            SetupError::IncompatibleVertexAttribute {
                location: 0,
                expected: VertexFormat::Float32x4,
                provided: VertexFormat::Float32x3,
            }
        ));
        assert_eq!(device.pipelines_created(), 0);
    }

    #[test]
    fn unknown_location_is_rejected() {
        let device = RecordingDevice::new()
            .with_interface(interface(&[(9, VertexFormat::Float32x2)], None));
        let err = build(&device, &[]).err().unwrap();
        assert!(matches!(err, SetupError::MissingVertexAttribute { location: 9 }));
    }

    #[test]
    fn uniform_block_must_match_scene_uniforms() {
        let device = RecordingDevice::new().with_interface(interface(
            &[(0, VertexFormat::Float32x3)],
            Some(vec![UniformType::Float, UniformType::Int]),
        ));
        assert!(build(&device, &[UniformType::Float, UniformType::Int]).is_ok());

        let err = build(&device, &[UniformType::Float]).err().unwrap();
        assert!(matches!(err, SetupError::UniformLayoutMismatch { .. }));
    }

    #[test]
    fn uniforms_without_a_block_are_rejected() {
        let device = RecordingDevice::new();
        let err = build(&device, &[UniformType::Int]).err().unwrap();
        assert!(matches!(err, SetupError::UniformLayoutMismatch { .. }));
    }

    #[test]
    fn sampled_slots_must_be_filled_by_the_scene() {
        let device = sampling(vec![0, 1]);
        assert!(build_textured(&device, &[], 2).is_ok());
        assert!(build_textured(&device, &[], 3).is_ok());

        let err = build_textured(&device, &[], 1).err().unwrap();
        assert!(matches!(err, SetupError::UnboundTexture { slot: 1, texture_count: 1 }));
        assert_eq!(device.pipelines_created(), 2);
    }

    #[test]
    fn texture_shader_without_scene_textures_is_rejected() {
        let err = build(&sampling(vec![0]), &[]).err().unwrap();
        assert!(matches!(err, SetupError::UnboundTexture { slot: 0, texture_count: 0 }));

        let err = build(&sampling(Vec::new()), &[]).err().unwrap();
        assert!(matches!(err, SetupError::UnboundSampler));
    }

    #[test]
    fn compile_failure_is_fatal() {
        let device = RecordingDevice::new().with_shader_error("unexpected token");
        let err = build(&device, &[]).err().unwrap();
        assert!(matches!(err, SetupError::Shader(ref m) if m == "unexpected token"));
    }

    #[test]
    fn encode_binds_pipeline() {
        let device = RecordingDevice::new();
        let mut handler = build(&device, &[]).unwrap();
        let mut enc = RecordingEncoder::new();
        let scene = Scene::new(ShaderProgram::wgsl("// test"));

        handler.encode(&device, &scene, &mut enc);
        assert_eq!(enc.commands(), &[Command::SetPipeline(handler.pipeline().id)]);
    }
}
