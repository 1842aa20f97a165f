use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{Result, StoreError, Volume, VolumeFile};

/// In-memory volume backend.
///
/// Cloning yields another handle onto the same file map, so a test can seed
/// and inspect files while devices hold their own handle.
#[derive(Clone, Default)]
pub struct MemVolume {
    files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemVolume {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a file with the given contents.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), bytes.into());
    }

    /// Returns a copy of a file's current contents, if it exists.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }
}

struct MemFile {
    files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    path: String,
    pos: usize,
}

impl Volume for MemVolume {
    fn open(&self, path: &str) -> Result<Box<dyn VolumeFile>> {
        if !self.files.borrow().contains_key(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(Box::new(MemFile {
            files: self.files.clone(),
            path: path.to_string(),
            pos: 0,
        }))
    }

    fn create(&self, path: &str) -> Result<Box<dyn VolumeFile>> {
        self.files
            .borrow_mut()
            .insert(path.to_string(), Vec::new());
        Ok(Box::new(MemFile {
            files: self.files.clone(),
            path: path.to_string(),
            pos: 0,
        }))
    }

    fn remove(&self, path: &str) -> Result<()> {
        match self.files.borrow_mut().remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }
}

impl VolumeFile for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let files = self.files.borrow();
        let data = files
            .get(&self.path)
            .ok_or_else(|| StoreError::NotFound(self.path.clone()))?;
        let remaining = data.len().saturating_sub(self.pos);
        let n = buf.len().min(remaining);
        buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut files = self.files.borrow_mut();
        let data = files
            .get_mut(&self.path)
            .ok_or_else(|| StoreError::NotFound(self.path.clone()))?;
        let end = self.pos + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.files
            .borrow()
            .get(&self.path)
            .map(|data| data.len() as u64)
            .unwrap_or(0)
    }
}
