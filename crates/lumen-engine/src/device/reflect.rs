//! WGSL interface reflection through naga.
//!
//! The shader is parsed and validated once at setup so that an incompatible
//! program fails with a `SetupError` instead of a wgpu validation panic.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{
    AddressSpace, Binding, ImageClass, ImageDimension, Module, ScalarKind, ShaderStage, TypeInner,
    VectorSize,
};

use crate::backend::{ShaderInput, ShaderInterface};
use crate::error::SetupError;
use crate::source::{UniformType, VertexFormat};

/// Bind group holding the uniform block.
pub(crate) const UNIFORM_GROUP: u32 = 0;
/// Bind group holding one texture per slot, binding = slot.
pub(crate) const TEXTURE_GROUP: u32 = 1;
/// Bind group holding the shared sampler at binding 0.
pub(crate) const SAMPLER_GROUP: u32 = 2;

/// Parses and validates `source`, then extracts what the pipeline checks
/// against: vertex inputs of `vertex_entry`, the uniform block, and the
/// texture and sampler bindings.
///
/// Resource globals outside the fixed group layout are rejected here.
pub(crate) fn reflect_wgsl(
    source: &str,
    vertex_entry: &str,
    fragment_entry: &str,
) -> Result<ShaderInterface, SetupError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| SetupError::Shader(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| SetupError::Shader(format!("validation failed: {e}")))?;

    let has_entry = |name: &str, stage: ShaderStage| {
        module.entry_points.iter().any(|ep| ep.name == name && ep.stage == stage)
    };
    if !has_entry(fragment_entry, ShaderStage::Fragment) {
        return Err(SetupError::Shader(format!("no fragment entry point `{fragment_entry}`")));
    }

    let (texture_bindings, uses_sampler) = resource_bindings(&module)?;

    Ok(ShaderInterface {
        vertex_inputs: vertex_inputs(&module, vertex_entry)?,
        uniforms: uniform_block(&module)?,
        texture_bindings,
        uses_sampler,
    })
}

fn vertex_inputs(module: &Module, entry: &str) -> Result<Vec<ShaderInput>, SetupError> {
    let ep = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry && ep.stage == ShaderStage::Vertex)
        .ok_or_else(|| SetupError::Shader(format!("no vertex entry point `{entry}`")))?;

    let mut inputs = Vec::new();
    for arg in &ep.function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(Binding::Location { location, .. }), ty) => {
                inputs.push(input(*location, ty)?);
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        inputs.push(input(location, &module.types[member.ty].inner)?);
                    }
                }
            }
            // Built-ins (vertex_index, instance_index) are not fed by the layout.
            _ => {}
        }
    }

    inputs.sort_by_key(|i| i.location);
    Ok(inputs)
}

fn input(location: u32, ty: &TypeInner) -> Result<ShaderInput, SetupError> {
    let format = match *ty {
        TypeInner::Scalar(s) if s.kind == ScalarKind::Float && s.width == 4 => VertexFormat::Float32,
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            match size {
                VectorSize::Bi => VertexFormat::Float32x2,
                VectorSize::Tri => VertexFormat::Float32x3,
                VectorSize::Quad => VertexFormat::Float32x4,
            }
        }
        _ => {
            return Err(SetupError::Shader(format!(
                "vertex input @location({location}) must be f32 or vecN<f32>"
            )));
        }
    };
    Ok(ShaderInput { location, format })
}

/// Member types of the `var<uniform>` at `@group(0) @binding(0)`, if any.
fn uniform_block(module: &Module) -> Result<Option<Vec<UniformType>>, SetupError> {
    let Some((_, var)) = module.global_variables.iter().find(|(_, var)| {
        var.space == AddressSpace::Uniform
            && var
                .binding
                .as_ref()
                .is_some_and(|b| b.group == UNIFORM_GROUP && b.binding == 0)
    }) else {
        return Ok(None);
    };

    let types = match &module.types[var.ty].inner {
        TypeInner::Struct { members, .. } => members
            .iter()
            .map(|m| uniform_type(&module.types[m.ty].inner, m.name.as_deref()))
            .collect::<Result<Vec<_>, _>>()?,
        scalar => vec![uniform_type(scalar, var.name.as_deref())?],
    };
    Ok(Some(types))
}

/// Texture slots declared in [`TEXTURE_GROUP`] and whether the sampler in
/// [`SAMPLER_GROUP`] is declared.
fn resource_bindings(module: &Module) -> Result<(Vec<u32>, bool), SetupError> {
    let mut textures = Vec::new();
    let mut sampler = false;

    for (_, var) in module.global_variables.iter() {
        let Some(rb) = var.binding.as_ref() else {
            continue;
        };
        let (group, binding) = (rb.group, rb.binding);
        let name = var.name.as_deref().unwrap_or("?");
        let ty = &module.types[var.ty].inner;

        let accepted = match (var.space, ty) {
            (AddressSpace::Uniform, _) => group == UNIFORM_GROUP && binding == 0,
            (
                AddressSpace::Handle,
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class: ImageClass::Sampled { kind: ScalarKind::Float, multi: false },
                },
            ) if group == TEXTURE_GROUP => {
                textures.push(binding);
                true
            }
            (AddressSpace::Handle, TypeInner::Sampler { comparison: false })
                if group == SAMPLER_GROUP && binding == 0 =>
            {
                sampler = true;
                true
            }
            _ => false,
        };

        if !accepted {
            return Err(SetupError::Shader(format!(
                "`{name}` at @group({group}) @binding({binding}) is not part of the bind layout \
                 (uniform block at @group({UNIFORM_GROUP}) @binding(0), texture_2d<f32> slots in \
                 @group({TEXTURE_GROUP}), sampler at @group({SAMPLER_GROUP}) @binding(0))"
            )));
        }
    }

    textures.sort_unstable();
    Ok((textures, sampler))
}

fn uniform_type(ty: &TypeInner, name: Option<&str>) -> Result<UniformType, SetupError> {
    match *ty {
        TypeInner::Scalar(s) if s.width == 4 && s.kind == ScalarKind::Sint => Ok(UniformType::Int),
        TypeInner::Scalar(s) if s.width == 4 && s.kind == ScalarKind::Float => Ok(UniformType::Float),
        _ => Err(SetupError::Shader(format!(
            "uniform `{}` must be i32 or f32",
            name.unwrap_or("?")
        ))),
    }
}
