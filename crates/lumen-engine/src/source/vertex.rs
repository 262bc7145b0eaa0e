use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

/// Number of texture-coordinate pairs carried by every vertex.
///
/// This is also the upper bound on texture slots: slot `i` is sampled with
/// `tex_coords[i]`.
pub const TEX_COORD_SETS: usize = 4;

/// Shader location of `Vertex::position`.
pub const POSITION_LOCATION: u32 = 0;
/// Shader location of `Vertex::color`.
pub const COLOR_LOCATION: u32 = 1;
/// Shader location of `Vertex::tex_coords[0]`; set `i` lives at `+ i`.
pub const TEX_COORD_BASE_LOCATION: u32 = 2;

/// Vertex record uploaded verbatim to the vertex buffer.
///
/// The shader decodes buffer memory by offset, so the record is `repr(C)` and
/// the layout in [`VertexLayout::of_vertex`] is computed from it with
/// `offset_of!` rather than maintained by hand.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coords: [[f32; 2]; TEX_COORD_SETS],
}

impl Vertex {
    #[inline]
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            color,
            tex_coords: [[0.0; 2]; TEX_COORD_SETS],
        }
    }

    /// Sets the same texture coordinate for every slot.
    #[inline]
    pub const fn with_uv(mut self, uv: [f32; 2]) -> Self {
        self.tex_coords = [uv; TEX_COORD_SETS];
        self
    }
}

/// Primitive attribute formats understood by the vertex stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub const fn size(self) -> u64 {
        match self {
            Self::Float32 => 4,
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

impl From<VertexFormat> for wgpu::VertexFormat {
    fn from(f: VertexFormat) -> Self {
        match f {
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        }
    }
}

/// One attribute of the vertex layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u64,
    pub format: VertexFormat,
}

/// Byte layout of one vertex record as seen by the vertex stage.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Layout of [`Vertex`]: position, color, then one `Float32x2` per
    /// texture-coordinate set.
    pub fn of_vertex() -> Self {
        let tex_base = offset_of!(Vertex, tex_coords) as u64;
        let pair = size_of::<[f32; 2]>() as u64;

        let mut attributes = vec![
            VertexAttribute {
                location: POSITION_LOCATION,
                offset: offset_of!(Vertex, position) as u64,
                format: VertexFormat::Float32x3,
            },
            VertexAttribute {
                location: COLOR_LOCATION,
                offset: offset_of!(Vertex, color) as u64,
                format: VertexFormat::Float32x3,
            },
        ];
        attributes.extend((0..TEX_COORD_SETS as u32).map(|i| VertexAttribute {
            location: TEX_COORD_BASE_LOCATION + i,
            offset: tex_base + i as u64 * pair,
            format: VertexFormat::Float32x2,
        }));

        Self {
            stride: size_of::<Vertex>() as u64,
            attributes,
        }
    }

    pub fn attribute(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_matches_record_size() {
        let layout = VertexLayout::of_vertex();
        assert_eq!(layout.stride, 56);
        assert_eq!(layout.stride, size_of::<Vertex>() as u64);
    }

    #[test]
    fn attributes_tile_the_record_without_gaps() {
        let layout = VertexLayout::of_vertex();
        let mut end = 0;
        for attr in &layout.attributes {
            assert_eq!(attr.offset, end, "gap before location {}", attr.location);
            end = attr.offset + attr.format.size();
        }
        assert_eq!(end, layout.stride);
    }

    #[test]
    fn tex_coord_offsets_follow_color() {
        let layout = VertexLayout::of_vertex();
        assert_eq!(layout.attribute(COLOR_LOCATION).unwrap().offset, 12);
        assert_eq!(layout.attribute(TEX_COORD_BASE_LOCATION).unwrap().offset, 24);
        assert_eq!(layout.attribute(TEX_COORD_BASE_LOCATION + 3).unwrap().offset, 48);
        assert!(layout.attribute(TEX_COORD_BASE_LOCATION + 4).is_none());
    }

    #[test]
    fn attribute_offsets_address_record_bytes() {
        let v = Vertex::new([1.0, 2.0, 3.0], [0.5, 0.25, 0.125]).with_uv([0.75, 1.0]);
        let bytes = bytemuck::bytes_of(&v);
        let read = |off: u64| f32::from_ne_bytes(bytes[off as usize..off as usize + 4].try_into().unwrap());

        let layout = VertexLayout::of_vertex();
        assert_eq!(read(layout.attribute(POSITION_LOCATION).unwrap().offset + 8), 3.0);
        assert_eq!(read(layout.attribute(COLOR_LOCATION).unwrap().offset + 4), 0.25);
        assert_eq!(read(layout.attribute(TEX_COORD_BASE_LOCATION + 2).unwrap().offset), 0.75);
    }
}
