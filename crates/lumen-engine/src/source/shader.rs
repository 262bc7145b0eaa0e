use std::borrow::Cow;
use std::path::PathBuf;

/// Where the WGSL text of a shader program comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderSource {
    /// WGSL text held in memory (typically `include_str!`).
    Wgsl(Cow<'static, str>),
    /// Path to a WGSL file, read when the pipeline is built.
    Path(PathBuf),
}

/// Shader program referenced by a scene: source plus stage entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgram {
    pub source: ShaderSource,
    pub vertex_entry: String,
    pub fragment_entry: String,
}

impl ShaderProgram {
    pub const DEFAULT_VERTEX_ENTRY: &'static str = "vs_main";
    pub const DEFAULT_FRAGMENT_ENTRY: &'static str = "fs_main";

    pub fn wgsl(code: impl Into<Cow<'static, str>>) -> Self {
        Self::with_default_entries(ShaderSource::Wgsl(code.into()))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::with_default_entries(ShaderSource::Path(path.into()))
    }

    fn with_default_entries(source: ShaderSource) -> Self {
        Self {
            source,
            vertex_entry: Self::DEFAULT_VERTEX_ENTRY.to_string(),
            fragment_entry: Self::DEFAULT_FRAGMENT_ENTRY.to_string(),
        }
    }

    /// Short human-readable name for labels and logs.
    pub fn label(&self) -> Cow<'_, str> {
        match &self.source {
            ShaderSource::Wgsl(_) => Cow::Borrowed("inline wgsl"),
            ShaderSource::Path(p) => p.to_string_lossy(),
        }
    }
}
