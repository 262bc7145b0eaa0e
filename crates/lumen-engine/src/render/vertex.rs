use crate::backend::{BufferUsage, Device, FrameEncoder};
use crate::error::SetupError;
use crate::source::{Scene, VertexLayout};

use super::EncodeStage;

/// Vertex buffer slot the vertex records are bound to.
pub const VERTEX_BUFFER_SLOT: u32 = 0;

/// Owns the vertex and index buffers of the scene.
///
/// Geometry is validated and uploaded once. Each frame binds both buffers
/// (`encode`) and, after every other bind, issues the indexed draw (`draw`).
pub struct VertexHandler<D: Device> {
    layout: VertexLayout,
    vertex_buffer: Option<D::Buffer>,
    index_buffer: Option<D::Buffer>,
    vertex_count: usize,
    index_count: u32,
    warned_geometry_drift: bool,
}

impl<D: Device> VertexHandler<D> {
    pub fn new(device: &D, scene: &Scene) -> Result<Self, SetupError> {
        validate_indices(&scene.indices, scene.vertices.len())?;

        let layout = VertexLayout::of_vertex();

        // Nothing to draw is valid: frames still clear, but issue no draw.
        let (vertex_buffer, index_buffer) =
            if scene.vertices.is_empty() || scene.indices.is_empty() {
                log::debug!("scene has no geometry; frames will only clear");
                (None, None)
            } else {
                let vbo = device.create_buffer(
                    "lumen vertex buffer",
                    BufferUsage::Vertex,
                    bytemuck::cast_slice(&scene.vertices),
                );
                let ibo = device.create_buffer(
                    "lumen index buffer",
                    BufferUsage::Index,
                    bytemuck::cast_slice(&scene.indices),
                );
                (Some(vbo), Some(ibo))
            };

        let index_count = if index_buffer.is_some() { scene.indices.len() as u32 } else { 0 };

        log::debug!(
            "vertex handler: {} vertices, {} indices, stride {}",
            scene.vertices.len(),
            index_count,
            layout.stride
        );

        Ok(Self {
            layout,
            vertex_buffer,
            index_buffer,
            vertex_count: scene.vertices.len(),
            index_count,
            warned_geometry_drift: false,
        })
    }

    /// Layout the pipeline must be compiled against.
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Issues the indexed draw over the uploaded index buffer.
    ///
    /// Must come after every bind of the frame. No-op without geometry.
    pub fn draw<E>(&self, encoder: &mut E)
    where
        E: FrameEncoder<D> + ?Sized,
    {
        if self.vertex_buffer.is_some() && self.index_buffer.is_some() && self.index_count > 0 {
            encoder.draw_indexed(self.index_count);
        }
    }
}

impl<D: Device> EncodeStage<D> for VertexHandler<D> {
    fn encode<E>(&mut self, _device: &D, scene: &Scene, encoder: &mut E)
    where
        E: FrameEncoder<D> + ?Sized,
    {
        let (Some(vbo), Some(ibo)) = (self.vertex_buffer.as_ref(), self.index_buffer.as_ref())
        else {
            return;
        };

        if !self.warned_geometry_drift
            && (scene.vertices.len() != self.vertex_count
                || scene.indices.len() != self.index_count as usize)
        {
            log::warn!("scene geometry changed after setup; drawing the geometry uploaded at setup");
            self.warned_geometry_drift = true;
        }

        encoder.set_vertex_buffer(VERTEX_BUFFER_SLOT, vbo);
        encoder.set_index_buffer(ibo);
    }
}

/// Checks that `indices` forms whole triangles over `vertex_count` vertices.
pub(crate) fn validate_indices(indices: &[u32], vertex_count: usize) -> Result<(), SetupError> {
    if indices.len() % 3 != 0 {
        return Err(SetupError::IndexCountNotTriangles(indices.len()));
    }
    if let Some((position, &index)) = indices
        .iter()
        .enumerate()
        .find(|&(_, &i)| i as usize >= vertex_count)
    {
        return Err(SetupError::IndexOutOfBounds {
            position,
            index,
            vertex_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Command, RecordingDevice, RecordingEncoder};
    use crate::source::{ShaderProgram, Vertex};

    fn scene(vertex_count: usize, indices: &[u32]) -> Scene {
        let mut s = Scene::new(ShaderProgram::wgsl("// test"));
        s.vertices = vec![Vertex::default(); vertex_count];
        s.indices = indices.to_vec();
        s
    }

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn rejects_partial_triangle() {
        let err = validate_indices(&[0, 1, 2, 0], 3).unwrap_err();
        assert!(matches!(err, SetupError::IndexCountNotTriangles(4)));
    }

    #[test]
    fn rejects_index_equal_to_vertex_count() {
        let err = validate_indices(&[0, 1, 3], 3).unwrap_err();
        assert!(matches!(
            err,
            SetupError::IndexOutOfBounds { position: 2, index: 3, vertex_count: 3 }
        ));
    }

    #[test]
    fn accepts_empty_and_in_bounds() {
        assert!(validate_indices(&[], 0).is_ok());
        assert!(validate_indices(&[0, 1, 2, 2, 1, 0], 3).is_ok());
    }

    // ── buffers ───────────────────────────────────────────────────────────

    #[test]
    fn uploads_records_and_indices_verbatim() {
        let device = RecordingDevice::new();
        let mut s = scene(3, &[0, 1, 2]);
        s.vertices[1].position = [1.0, 2.0, 3.0];

        let handler = VertexHandler::new(&device, &s).unwrap();
        assert_eq!(handler.index_count(), 3);

        let vbo = device.buffer_contents(0);
        assert_eq!(vbo, bytemuck::cast_slice::<Vertex, u8>(&s.vertices));
        let ibo = device.buffer_contents(1);
        assert_eq!(ibo, bytemuck::cast_slice::<u32, u8>(&[0, 1, 2]));
    }

    #[test]
    fn binds_vertex_then_index_buffer() {
        let device = RecordingDevice::new();
        let s = scene(3, &[0, 1, 2]);
        let mut handler = VertexHandler::new(&device, &s).unwrap();
        let mut enc = RecordingEncoder::new();

        handler.encode(&device, &s, &mut enc);
        handler.draw(&mut enc);

        assert_eq!(
            enc.commands(),
            &[
                Command::SetVertexBuffer { slot: VERTEX_BUFFER_SLOT, buffer: 0 },
                Command::SetIndexBuffer { buffer: 1 },
                Command::DrawIndexed { index_count: 3 },
            ]
        );
    }

    #[test]
    fn empty_geometry_is_a_no_op() {
        let device = RecordingDevice::new();
        let s = scene(0, &[]);
        let mut handler = VertexHandler::new(&device, &s).unwrap();
        let mut enc = RecordingEncoder::new();

        handler.encode(&device, &s, &mut enc);
        handler.draw(&mut enc);

        assert!(enc.commands().is_empty());
    }
}
