use std::io;
use std::path::Path;

/// Supplies raw asset bytes by path.
pub trait AssetReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads assets from the filesystem; relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAssets;

impl FsAssets {
    pub fn new() -> Self {
        Self
    }
}

impl AssetReader for FsAssets {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
