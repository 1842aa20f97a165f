use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use crate::{Result, StoreError, Volume, VolumeFile};

/// Volume backend rooted at a host directory.
///
/// The guest addresses files with absolute paths (`/Altair/tapes/...`); those
/// map onto `root` with the leading separator stripped. Paths that would
/// escape the root are rejected.
pub struct DirVolume {
    root: PathBuf,
}

impl DirVolume {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn host_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn open_error(path: &str, err: io::Error) -> StoreError {
    match err.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
        _ => StoreError::Io(err.to_string()),
    }
}

impl Volume for DirVolume {
    fn open(&self, path: &str) -> Result<Box<dyn VolumeFile>> {
        let file = File::open(self.host_path(path)?).map_err(|err| open_error(path, err))?;
        Ok(Box::new(DirFile { file }))
    }

    fn create(&self, path: &str) -> Result<Box<dyn VolumeFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.host_path(path)?)
            .map_err(|err| open_error(path, err))?;
        Ok(Box::new(DirFile { file }))
    }

    fn remove(&self, path: &str) -> Result<()> {
        std::fs::remove_file(self.host_path(path)?).map_err(|err| open_error(path, err))
    }
}

struct DirFile {
    file: File,
}

impl VolumeFile for DirFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file
            .read(buf)
            .map_err(|err| StoreError::ReadFailed(err.to_string()))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.file
            .write(buf)
            .map_err(|err| StoreError::WriteFailed(err.to_string()))
    }

    fn size(&self) -> u64 {
        self.file.metadata().map(|meta| meta.len()).unwrap_or(0)
    }
}
