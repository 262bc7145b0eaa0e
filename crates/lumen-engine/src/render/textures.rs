use std::path::PathBuf;

use crate::backend::{Device, FrameEncoder};
use crate::error::SetupError;
use crate::source::Scene;

use super::texture_loader::{TextureHandle, TextureLoader};
use super::EncodeStage;

/// Binds the scene's textures, slot `i` = `texture_paths[i]`.
///
/// All paths are resolved at setup; a load failure fails construction. Slots
/// past the last path stay unbound.
pub struct TextureHandler<D: Device> {
    loader: TextureLoader<D>,
    paths: Vec<PathBuf>,
    bound: Vec<TextureHandle<D::Texture>>,
    slot_count: usize,
    warned_unresolved: bool,
}

impl<D: Device> TextureHandler<D> {
    pub fn new(
        device: &D,
        scene: &Scene,
        mut loader: TextureLoader<D>,
        slot_count: usize,
    ) -> Result<Self, SetupError> {
        let count = scene.texture_paths.len();
        if count > slot_count {
            return Err(SetupError::TooManyTextures { count, max: slot_count });
        }

        let bound = scene
            .texture_paths
            .iter()
            .map(|path| loader.get_texture(device, path))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("texture handler: {count} of {slot_count} slots in use");

        Ok(Self {
            loader,
            paths: scene.texture_paths.clone(),
            bound,
            slot_count,
            warned_unresolved: false,
        })
    }

    /// Number of slots bound every frame.
    pub fn texture_count(&self) -> usize {
        self.bound.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn loader(&self) -> &TextureLoader<D> {
        &self.loader
    }

    /// Re-resolves slots whose path changed since the last frame.
    ///
    /// A path that fails to load keeps the previous texture for its slot and is
    /// not retried until the path changes again.
    fn refresh(&mut self, device: &D, scene: &Scene) {
        for (slot, path) in scene.texture_paths.iter().take(self.bound.len()).enumerate() {
            if self.paths[slot] == *path {
                continue;
            }
            self.paths[slot] = path.clone();
            match self.loader.get_texture(device, path) {
                Ok(texture) => self.bound[slot] = texture,
                Err(err) => {
                    if !self.warned_unresolved {
                        log::warn!("texture slot {slot}: {err}; keeping previous texture");
                        self.warned_unresolved = true;
                    }
                }
            }
        }
    }
}

impl<D: Device> EncodeStage<D> for TextureHandler<D> {
    fn encode<E>(&mut self, device: &D, scene: &Scene, encoder: &mut E)
    where
        E: FrameEncoder<D> + ?Sized,
    {
        if self.bound.is_empty() {
            return;
        }
        if scene.texture_paths.iter().take(self.paths.len()).ne(self.paths.iter()) {
            self.refresh(device, scene);
        }
        for (slot, texture) in self.bound.iter().enumerate() {
            encoder.set_texture(slot as u32, texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Command, RecordingDevice, RecordingEncoder};
    use crate::render::texture_loader::tests::MemoryAssets;
    use crate::source::ShaderProgram;

    fn scene_with(paths: &[&str]) -> Scene {
        let mut s = Scene::new(ShaderProgram::wgsl("// test"));
        s.texture_paths = paths.iter().map(PathBuf::from).collect();
        s
    }

    fn loader(assets: &MemoryAssets) -> TextureLoader<RecordingDevice> {
        TextureLoader::new(Box::new(assets.clone()))
    }

    #[test]
    fn binds_each_path_to_its_position() {
        let device = RecordingDevice::new();
        let assets = MemoryAssets::default()
            .with_png("a.png", 1, 1)
            .with_png("b.png", 1, 1);
        let s = scene_with(&["a.png", "b.png"]);
        let mut handler = TextureHandler::new(&device, &s, loader(&assets), 4).unwrap();
        let mut enc = RecordingEncoder::new();

        handler.encode(&device, &s, &mut enc);

        let slots: Vec<u32> = enc
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::SetTexture { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(slots, vec![0, 1]);
    }

    #[test]
    fn same_path_in_two_slots_loads_once() {
        let device = RecordingDevice::new();
        let assets = MemoryAssets::default().with_png("a.png", 1, 1);
        let s = scene_with(&["a.png", "a.png"]);
        let handler = TextureHandler::new(&device, &s, loader(&assets), 4).unwrap();

        assert_eq!(handler.texture_count(), 2);
        assert_eq!(assets.reads("a.png"), 1);
        assert_eq!(device.textures_created(), 1);
    }

    #[test]
    fn more_paths_than_slots_fails_setup() {
        let device = RecordingDevice::new();
        let assets = MemoryAssets::default().with_png("a.png", 1, 1);
        let s = scene_with(&["a.png", "a.png", "a.png"]);

        let err = TextureHandler::new(&device, &s, loader(&assets), 2).err().unwrap();
        assert!(matches!(err, SetupError::TooManyTextures { count: 3, max: 2 }));
        assert_eq!(assets.reads("a.png"), 0);
    }

    #[test]
    fn unloadable_path_fails_setup() {
        let device = RecordingDevice::new();
        let s = scene_with(&["missing.png"]);

        let err = TextureHandler::new(&device, &s, loader(&MemoryAssets::default()), 4)
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::Texture(_)));
    }

    #[test]
    fn no_paths_bind_nothing() {
        let device = RecordingDevice::new();
        let s = scene_with(&[]);
        let mut handler = TextureHandler::new(&device, &s, loader(&MemoryAssets::default()), 4).unwrap();
        let mut enc = RecordingEncoder::new();

        handler.encode(&device, &s, &mut enc);
        assert!(enc.commands().is_empty());
    }

    #[test]
    fn changed_path_is_rebound_and_bad_path_keeps_previous() {
        let device = RecordingDevice::new();
        let assets = MemoryAssets::default()
            .with_png("a.png", 1, 1)
            .with_png("b.png", 2, 2);
        let mut s = scene_with(&["a.png"]);
        let mut handler = TextureHandler::new(&device, &s, loader(&assets), 4).unwrap();
        let mut enc = RecordingEncoder::new();

        handler.encode(&device, &s, &mut enc);
        let first = enc.take();

        s.texture_paths[0] = PathBuf::from("b.png");
        handler.encode(&device, &s, &mut enc);
        let second = enc.take();
        assert_ne!(first, second);

        s.texture_paths[0] = PathBuf::from("gone.png");
        handler.encode(&device, &s, &mut enc);
        assert_eq!(enc.take(), second);
    }
}
