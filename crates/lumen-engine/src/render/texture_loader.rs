use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{Device, TextureImage};
use crate::error::LoadError;

use super::assets::AssetReader;

/// Shared handle to a cached texture.
pub type TextureHandle<T> = Arc<T>;

/// Loads textures by path and keeps them resident.
///
/// Textures are cached for the loader's lifetime (no eviction); the scene is
/// assumed to reference a small, fixed set of images.
pub struct TextureLoader<D: Device> {
    assets: Box<dyn AssetReader>,
    cache: HashMap<PathBuf, TextureHandle<D::Texture>>,
}

impl<D: Device> TextureLoader<D> {
    pub fn new(assets: Box<dyn AssetReader>) -> Self {
        Self {
            assets,
            cache: HashMap::new(),
        }
    }

    /// Returns the texture for `path`, loading and uploading it on first use.
    ///
    /// Repeated calls with the same path return the same handle without touching
    /// the asset reader.
    pub fn get_texture(
        &mut self,
        device: &D,
        path: &Path,
    ) -> Result<TextureHandle<D::Texture>, LoadError> {
        if let Some(texture) = self.cache.get(path) {
            return Ok(Arc::clone(texture));
        }

        let bytes = self.assets.read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let pixels = image::load_from_memory(&bytes)
            .map_err(|source| LoadError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let (width, height) = pixels.dimensions();

        let label = format!("lumen texture {}", path.display());
        let texture = Arc::new(device.create_texture(
            &label,
            &TextureImage {
                width,
                height,
                rgba: pixels.as_raw(),
            },
        ));

        log::debug!("loaded texture {} ({width}x{height})", path.display());
        self.cache.insert(path.to_path_buf(), Arc::clone(&texture));
        Ok(texture)
    }

    /// Returns the cached texture for `path` without loading.
    pub fn cached(&self, path: &Path) -> Option<TextureHandle<D::Texture>> {
        self.cache.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
