//! Content type resolution
//!
//! A [`ContentResolver`] pairs a [`Sniffer`] with a registry from MIME type to a typed
//! wrapper constructor. Directory nodes consult it whenever a file is looked up: the
//! first bytes of the object are classified once, and the classification picks the
//! wrapper the caller receives.
//!
//! The default resolver is built on first use and shared for the life of the process;
//! it is never mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;

use crate::entry::Entry;
use crate::error::Result;
use crate::file::FileNode;
use crate::image::{ImageFile, ImageFormat, TypedFileNode};
use crate::sniff::{MagicSniffer, Sniffer};
use crate::store::StoreClient;

/// Number of leading bytes read to classify an object.
pub const DEFAULT_SNIFF_LENGTH: u64 = 100;

/// Builds a typed wrapper around a bound file of a registered MIME type.
pub type Constructor = fn(FileNode, &str) -> TypedFileNode;

static SHARED: Lazy<Arc<ContentResolver>> = Lazy::new(|| Arc::new(ContentResolver::new()));

pub struct ContentResolver {
    sniffer: Box<dyn Sniffer>,
    registry: HashMap<String, Constructor>,
    sniff_length: u64,
}

impl fmt::Debug for ContentResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut mimes: Vec<&String> = self.registry.keys().collect();
        mimes.sort();
        f.debug_struct("ContentResolver")
            .field("registry", &mimes)
            .field("sniff_length", &self.sniff_length)
            .finish()
    }
}

impl Default for ContentResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn image_constructor(file: FileNode, mime: &str) -> TypedFileNode {
    match ImageFormat::from_mime(mime) {
        Some(format) => TypedFileNode::Image(ImageFile::new(file, format)),
        None => unreachable!("image constructor registered for non-image mime {mime}"),
    }
}

impl ContentResolver {
    /// Resolver with the magic number sniffer and every image format registered.
    pub fn new() -> Self {
        let mut resolver = Self::empty(Box::new(MagicSniffer::new()));
        for format in ImageFormat::ALL {
            resolver.register(format.mime(), image_constructor);
        }
        resolver
    }

    /// Resolver with no registrations; every file resolves to a plain [`FileNode`].
    pub fn empty(sniffer: Box<dyn Sniffer>) -> Self {
        Self {
            sniffer,
            registry: HashMap::new(),
            sniff_length: DEFAULT_SNIFF_LENGTH,
        }
    }

    /// The process-wide default resolver.
    pub fn shared() -> Arc<ContentResolver> {
        Arc::clone(&SHARED)
    }

    pub fn with_sniff_length(mut self, sniff_length: u64) -> Self {
        self.sniff_length = sniff_length;
        self
    }

    pub fn register<S: Into<String>>(&mut self, mime: S, constructor: Constructor) {
        self.registry.insert(mime.into(), constructor);
    }

    pub fn lookup(&self, mime: &str) -> Option<Constructor> {
        self.registry.get(mime).copied()
    }

    pub fn sniff_length(&self) -> u64 {
        self.sniff_length
    }

    pub fn classify(&self, prefix: &[u8]) -> String {
        self.sniffer.classify(prefix)
    }

    /// Read the leading bytes of `key` and classify them.
    pub fn sniff(&self, store: &dyn StoreClient, key: &str) -> Result<String> {
        let prefix = store.open_range(key, 0, self.sniff_length)?;
        let mime = self.classify(&prefix);
        debug!("classified {:?} as {}", key, mime);
        Ok(mime)
    }

    /// Wrap a bound file according to its MIME type.
    pub fn dispatch(&self, file: FileNode, mime: &str) -> Entry {
        match self.lookup(mime) {
            Some(constructor) => Entry::Typed(constructor(file, mime)),
            None => Entry::File(file),
        }
    }
}
