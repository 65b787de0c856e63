//! Store client contract
//!
//! A store client is the key-value object store a [`crate::DirectoryNode`] is layered
//! over. Keys are slash-delimited strings without leading or trailing slashes; the
//! store has no native notion of a directory, so a "directory" is any prefix that at
//! least one key lives under.
//!
//! Every method blocks until the backend answers. Failures are reported with the
//! crate's own [`Error`](crate::error::Error) type so that directory operations can
//! pass them through unchanged.
//!
//! Backends may be eventually consistent: a key that was just created might not show
//! up in the next `list` call. Nothing in this crate retries; such lag is observed as
//! a stale listing.

use chrono::{DateTime, Utc};

use crate::error::Result;

/// One immediate child of a listed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Last path segment, never containing `/`
    pub name: String,
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
}

impl ListEntry {
    pub fn file<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
        }
    }

    pub fn directory<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
        }
    }
}

/// Metadata of a single stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub size: u64,
    #[serde(rename = "lastModified")]
    pub modified: DateTime<Utc>,
}

/// Object store operations consumed by the directory and file nodes.
pub trait StoreClient {
    /// True if at least one key lives under `key/`.
    ///
    /// The empty key is the store root and is always a directory.
    fn is_directory(&self, key: &str) -> Result<bool>;

    /// True if an object is stored under exactly `key`.
    fn is_file(&self, key: &str) -> Result<bool>;

    /// Immediate children of `prefix`.
    ///
    /// A prefix with no keys beneath it yields an empty list rather than an error.
    fn list(&self, prefix: &str) -> Result<Vec<ListEntry>>;

    /// Read up to `length` bytes starting at `offset`. Reads past the end are
    /// truncated; the backend must not cache the range.
    fn open_range(&self, key: &str, offset: u64, length: u64) -> Result<Vec<u8>>;

    /// Create an empty object under `key` ("touch").
    fn create(&self, key: &str) -> Result<()>;

    /// Replace the object under `key` with `data`, creating it if needed.
    fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Delete the object under `key`.
    fn remove(&self, key: &str) -> Result<()>;

    fn info(&self, key: &str) -> Result<ObjectInfo>;

    /// Drop any listing or metadata cache the client keeps.
    fn invalidate_cache(&self);
}

/// Join a parent prefix and a child name into a store key.
pub fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Normalize a user supplied root prefix: surrounding slashes are dropped.
pub fn normalize_key(key: &str) -> String {
    key.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("", "a"), "a");
        assert_eq!(join_key("bucket", "a"), "bucket/a");
        assert_eq!(join_key("bucket/x", "a"), "bucket/x/a");
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("/bucket/data/"), "bucket/data");
        assert_eq!(normalize_key("bucket"), "bucket");
        assert_eq!(normalize_key("/"), "");
    }

    #[test]
    fn test_list_entry_constructors() {
        let file = ListEntry::file("a.txt");
        assert_eq!(file.name, "a.txt");
        assert!(!file.is_directory);

        let dir = ListEntry::directory("photos");
        assert!(dir.is_directory);
    }
}
