//! dictfs
//! ------
//!
//! Mapping-style, mutable directory view over prefix-keyed object stores.
//!
//! Object stores such as S3 only know keys. This crate layers directories on top of
//! them: a [`DirectoryNode`] lists the immediate children of a key prefix, hands out
//! nested directory nodes and file handles, and accepts new children. Directories that
//! exist only in memory (because nothing has been stored beneath them yet) are tracked
//! as *virtual* and are materialized or virtualized as files come and go.
//!
//! Files are classified by sniffing their first bytes; recognized kinds, such as
//! images, are returned wrapped in a [`TypedFileNode`].
//!
//! ```rust
//! use std::rc::Rc;
//! use dictfs::{DirectoryNode, Entry, FileNode, MemoryStore};
//!
//! fn main() -> dictfs::error::Result<()> {
//!     let store = Rc::new(MemoryStore::with_objects([("bucket/readme.txt", "hi")]));
//!     let root = DirectoryNode::open("bucket", store.clone())?;
//!
//!     let photos = DirectoryNode::new();
//!     root.set("photos", photos.clone())?;
//!     assert!(root.is_virtual("photos")?);
//!
//!     photos.set("cat.png", FileNode::new())?;
//!     assert!(!root.is_virtual("photos")?);
//!     assert!(store.contains_key("bucket/photos/cat.png"));
//!
//!     match root.get("readme.txt")? {
//!         Entry::File(file) => assert_eq!(file.read_all()?, b"hi"),
//!         other => panic!("unexpected {other:?}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Nodes are single-threaded (`!Send`) and perform blocking calls on the store
//! client. Caches are per node and are only dropped by [`DirectoryNode::refresh`].

#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod dir;
pub mod entry;
pub mod error;
pub mod file;
pub mod image;
pub mod memory;
pub mod resolver;
pub mod sniff;
pub mod store;

pub use config::Config;
pub use dir::DirectoryNode;
pub use entry::Entry;
pub use error::{Error, Result};
pub use file::{FileNode, ObjectReader};
pub use image::{ImageFile, ImageFormat, TypedFileNode};
pub use memory::{MemoryStore, StoreStats};
pub use resolver::ContentResolver;
pub use sniff::{MagicSniffer, Sniffer};
pub use store::{ListEntry, ObjectInfo, StoreClient};
