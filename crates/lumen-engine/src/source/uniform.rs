/// Byte width of every uniform slot. Both variants occupy 4 bytes.
pub const UNIFORM_SLOT_SIZE: usize = 4;

/// Type tag of a uniform value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformType {
    Int,
    Float,
}

/// A typed scalar uniform value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
}

impl UniformValue {
    #[inline]
    pub const fn ty(self) -> UniformType {
        match self {
            Self::Int(_) => UniformType::Int,
            Self::Float(_) => UniformType::Float,
        }
    }

    /// Native-endian bytes, matching how the GPU reads `i32`/`f32` members.
    #[inline]
    pub fn to_ne_bytes(self) -> [u8; UNIFORM_SLOT_SIZE] {
        match self {
            Self::Int(v) => v.to_ne_bytes(),
            Self::Float(v) => v.to_ne_bytes(),
        }
    }
}

/// A named uniform.
///
/// The name is descriptive (diagnostics only). Shaders see uniforms by position
/// in the scene's uniform list, never by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    pub name: String,
    pub value: UniformValue,
}

impl Uniform {
    pub fn int(name: impl Into<String>, value: i32) -> Self {
        Self { name: name.into(), value: UniformValue::Int(value) }
    }

    pub fn float(name: impl Into<String>, value: f32) -> Self {
        Self { name: name.into(), value: UniformValue::Float(value) }
    }

    #[inline]
    pub fn ty(&self) -> UniformType {
        self.value.ty()
    }
}
