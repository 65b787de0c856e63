#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use dictfs::error::{Error, Result};
use dictfs::{DirectoryNode, ListEntry, MemoryStore, ObjectInfo, StoreClient};

pub const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01";
pub const JPEG_HEADER: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01\x01";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn open_bucket(objects: &[(&str, &str)]) -> (Rc<MemoryStore>, DirectoryNode) {
    init_logging();
    let store = Rc::new(MemoryStore::with_objects(objects.iter().copied()));
    let root = DirectoryNode::open("bucket", store.clone()).expect("bucket exists");
    (store, root)
}

pub fn dir(root: &DirectoryNode, name: &str) -> DirectoryNode {
    root.get(name)
        .expect("lookup")
        .into_directory()
        .expect("directory entry")
}

/// Store wrapper whose mutating calls can be made to fail.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_writes: Cell<bool>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_writes: Cell::new(false),
        }
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.get() {
            Err(Error::BackingStore("access denied".to_string()))
        } else {
            Ok(())
        }
    }
}

impl StoreClient for FlakyStore {
    fn is_directory(&self, key: &str) -> Result<bool> {
        self.inner.is_directory(key)
    }

    fn is_file(&self, key: &str) -> Result<bool> {
        self.inner.is_file(key)
    }

    fn list(&self, prefix: &str) -> Result<Vec<ListEntry>> {
        self.inner.list(prefix)
    }

    fn open_range(&self, key: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.inner.open_range(key, offset, length)
    }

    fn create(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.create(key)
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.check()?;
        self.inner.put(key, data)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.remove(key)
    }

    fn info(&self, key: &str) -> Result<ObjectInfo> {
        self.inner.info(key)
    }

    fn invalidate_cache(&self) {
        self.inner.invalidate_cache()
    }
}
