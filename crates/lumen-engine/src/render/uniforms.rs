use crate::backend::{BufferUsage, Device, FrameEncoder};
use crate::error::SetupError;
use crate::source::{Scene, Uniform, UniformType, UNIFORM_SLOT_SIZE};

use super::EncodeStage;

/// Binding index of the uniform buffer.
pub const UNIFORM_BINDING: u32 = 0;

/// Serializes `uniforms` into `out` as a flat concatenation in list order.
///
/// `out` is cleared first. Every value takes one 4-byte slot in native byte
/// order; there is no padding between slots.
pub fn serialize_uniforms(uniforms: &[Uniform], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(uniforms.len() * UNIFORM_SLOT_SIZE);
    for u in uniforms {
        out.extend_from_slice(&u.value.to_ne_bytes());
    }
}

/// Uploads the scene's uniform values every frame and binds the buffer.
///
/// The buffer layout is fixed at setup from the uniform types. Values are
/// re-serialized and rewritten every frame, changed or not.
pub struct UniformsHandler<D: Device> {
    layout: Vec<UniformType>,
    buffer: Option<D::Buffer>,
    bytes: Vec<u8>,
    warned_layout_drift: bool,
}

impl<D: Device> UniformsHandler<D> {
    pub fn new(device: &D, scene: &Scene) -> Result<Self, SetupError> {
        let layout = scene.uniform_types();
        let mut bytes = Vec::new();
        serialize_uniforms(&scene.uniforms, &mut bytes);

        let buffer = if bytes.is_empty() {
            None
        } else {
            Some(device.create_buffer("lumen uniform buffer", BufferUsage::Uniform, &bytes))
        };

        log::debug!("uniforms handler: {} values, {} bytes", layout.len(), bytes.len());

        Ok(Self {
            layout,
            buffer,
            bytes,
            warned_layout_drift: false,
        })
    }

    /// Uniform types the buffer was laid out for.
    pub fn layout(&self) -> &[UniformType] {
        &self.layout
    }

    /// Size of the uniform block in bytes; `None` without uniforms.
    pub fn size(&self) -> Option<u64> {
        self.buffer.as_ref().map(|_| (self.layout.len() * UNIFORM_SLOT_SIZE) as u64)
    }

    /// Bytes of the most recent upload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl<D: Device> EncodeStage<D> for UniformsHandler<D> {
    fn encode<E>(&mut self, device: &D, scene: &Scene, encoder: &mut E)
    where
        E: FrameEncoder<D> + ?Sized,
    {
        let Some(buffer) = self.buffer.as_ref() else { return };

        serialize_uniforms(&scene.uniforms, &mut self.bytes);

        let size = self.layout.len() * UNIFORM_SLOT_SIZE;
        let drifted = self.bytes.len() != size
            || scene.uniforms.iter().zip(&self.layout).any(|(u, ty)| u.ty() != *ty);
        if drifted {
            if !self.warned_layout_drift {
                log::warn!(
                    "uniform layout changed after setup ({} values, expected {}); clamping to setup layout",
                    scene.uniforms.len(),
                    self.layout.len()
                );
                self.warned_layout_drift = true;
            }
            self.bytes.resize(size, 0);
        }

        device.write_buffer(buffer, &self.bytes);
        encoder.set_uniform_buffer(UNIFORM_BINDING, buffer);
    }
}
