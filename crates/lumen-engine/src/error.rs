//! Error types for renderer setup and texture loading.
//!
//! Only setup can fail. Frame encoding never returns an error: degenerate input
//! produces a degenerate frame and is reported through `log`.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::{UniformType, VertexFormat};

/// Failure to turn a texture path into a GPU texture.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The asset reader could not produce bytes for the path.
    #[error("failed to read texture {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a decodable image.
    #[error("failed to decode texture {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Fatal error raised while constructing a `Renderer` or one of its handlers.
#[derive(Error, Debug)]
pub enum SetupError {
    /// Shader source could not be read, parsed or validated.
    #[error("shader error: {0}")]
    Shader(String),

    /// The vertex stage declares an input the vertex layout does not provide.
    #[error("vertex shader input @location({location}) has no matching vertex attribute")]
    MissingVertexAttribute { location: u32 },

    /// The vertex stage input and the vertex attribute disagree on format.
    #[error(
        "vertex attribute @location({location}) is {provided:?} but the shader expects {expected:?}"
    )]
    IncompatibleVertexAttribute {
        location: u32,
        expected: VertexFormat,
        provided: VertexFormat,
    },

    /// The shader's uniform block does not match the scene's uniform sequence.
    #[error("uniform layout mismatch: shader declares {expected:?}, scene provides {provided:?}")]
    UniformLayoutMismatch {
        expected: Vec<UniformType>,
        provided: Vec<UniformType>,
    },

    /// More texture paths than the device exposes texture slots.
    #[error("scene uses {count} textures but only {max} texture slots are available")]
    TooManyTextures { count: usize, max: usize },

    /// The shader declares a texture slot the scene leaves empty.
    #[error("shader declares texture slot {slot} but the scene provides {texture_count} textures")]
    UnboundTexture { slot: u32, texture_count: usize },

    /// The shader declares a sampler but the scene has no textures.
    #[error("shader declares a sampler but the scene provides no textures")]
    UnboundSampler,

    /// Index list does not describe whole triangles.
    #[error("index count {0} is not a multiple of 3")]
    IndexCountNotTriangles(usize),

    /// Index refers past the end of the vertex list.
    #[error("index {index} at position {position} is out of bounds for {vertex_count} vertices")]
    IndexOutOfBounds {
        position: usize,
        index: u32,
        vertex_count: usize,
    },

    /// Pipeline object could not be created by the device.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Texture(#[from] LoadError),
}
