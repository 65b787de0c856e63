use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use log::debug;
use once_cell::unsync::OnceCell;

use crate::error::{Error, Result};
use crate::store::StoreClient;

struct FileBinding {
    path: String,
    store: Rc<dyn StoreClient>,
}

/// Handle to a single object in the store.
///
/// A `FileNode` built with [`FileNode::new`] is unbound: it names no key yet and can
/// only be assigned into a [`DirectoryNode`](crate::DirectoryNode), which creates the
/// object and binds the handle. Clones share the binding.
#[derive(Clone, Default)]
pub struct FileNode {
    binding: Rc<OnceCell<FileBinding>>,
}

impl FileNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bound(path: String, store: Rc<dyn StoreClient>) -> Self {
        let node = Self::new();
        // A fresh cell cannot already be set
        let _ = node.binding.set(FileBinding { path, store });
        node
    }

    pub(crate) fn bind(&self, path: String, store: Rc<dyn StoreClient>) -> Result<()> {
        self.binding
            .set(FileBinding { path, store })
            .map_err(|b| Error::TypeMismatch(format!("file already bound to {}", b.path)))
    }

    fn binding(&self) -> Result<&FileBinding> {
        self.binding
            .get()
            .ok_or_else(|| Error::TypeMismatch("file is not bound to a key".to_string()))
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Full store key of this file.
    pub fn path(&self) -> Result<&str> {
        Ok(&self.binding()?.path)
    }

    /// Last segment of the key.
    pub fn name(&self) -> Result<&str> {
        let path = self.path()?;
        Ok(path.rsplit('/').next().unwrap_or(path))
    }

    pub fn size(&self) -> Result<u64> {
        let binding = self.binding()?;
        Ok(binding.store.info(&binding.path)?.size)
    }

    pub fn modified(&self) -> Result<DateTime<Utc>> {
        let binding = self.binding()?;
        Ok(binding.store.info(&binding.path)?.modified)
    }

    /// Open a seekable reader over the object content.
    pub fn open(&self) -> Result<ObjectReader> {
        let binding = self.binding()?;
        Ok(ObjectReader::new(
            Rc::clone(&binding.store),
            binding.path.clone(),
        ))
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        let binding = self.binding()?;
        let size = binding.store.info(&binding.path)?.size;
        binding.store.open_range(&binding.path, 0, size)
    }

    /// Replace the object content.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let binding = self.binding()?;
        debug!("put {:?} ({} bytes)", binding.path, data.len());
        binding.store.put(&binding.path, data)
    }
}

impl fmt::Debug for FileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.binding.get() {
            Some(b) => write!(f, "FileNode({:?})", b.path),
            None => write!(f, "FileNode(<unbound>)"),
        }
    }
}

/// Reader over an object, fetching each `read` as a byte-range request.
pub struct ObjectReader {
    store: Rc<dyn StoreClient>,
    key: String,
    position: u64,
    size: Option<u64>,
}

impl ObjectReader {
    fn new(store: Rc<dyn StoreClient>, key: String) -> Self {
        Self {
            store,
            key,
            position: 0,
            size: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn size(&mut self) -> Result<u64> {
        match self.size {
            Some(size) => Ok(size),
            None => {
                let size = self.store.info(&self.key)?.size;
                self.size = Some(size);
                Ok(size)
            }
        }
    }
}

impl Read for ObjectReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let data = self
            .store
            .open_range(&self.key, self.position, buf.len() as u64)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for ObjectReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => self.size()?.checked_add_signed(delta),
        };
        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
