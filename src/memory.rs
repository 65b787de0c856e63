//! In-process object store
//!
//! `MemoryStore` keeps objects in an ordered map and answers every [`StoreClient`]
//! call from it. It behaves like a strongly consistent bucket: listings always reflect
//! the latest writes, and `invalidate_cache` has nothing to drop.
//!
//! Every call is counted in [`StoreStats`], which makes it possible to check how much
//! backend traffic a directory operation produced.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::trace;

use crate::error::{Error, Result};
use crate::store::{ListEntry, ObjectInfo, StoreClient};

#[derive(Debug, Clone)]
struct Object {
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

/// Counters of store calls, by operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub lists: u32,
    pub range_reads: u32,
    pub creates: u32,
    pub puts: u32,
    pub removes: u32,
    pub invalidations: u32,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RefCell<BTreeMap<String, Object>>,
    stats: Cell<StoreStats>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the given objects.
    pub fn with_objects<I, K, V>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let now = Utc::now();
        let objects = objects
            .into_iter()
            .map(|(key, data)| {
                (
                    key.into(),
                    Object {
                        data: data.into(),
                        modified: now,
                    },
                )
            })
            .collect();
        Self {
            objects: RefCell::new(objects),
            stats: Cell::new(StoreStats::default()),
        }
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.get()
    }

    pub fn reset_stats(&self) {
        self.stats.set(StoreStats::default());
    }

    /// All stored keys, in order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.objects.borrow().contains_key(key)
    }

    fn record<F: FnOnce(&mut StoreStats)>(&self, update: F) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    fn dir_prefix(key: &str) -> String {
        if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        }
    }
}

impl StoreClient for MemoryStore {
    fn is_directory(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(true);
        }
        let prefix = Self::dir_prefix(key);
        let objects = self.objects.borrow();
        let found = objects
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix));
        Ok(found)
    }

    fn is_file(&self, key: &str) -> Result<bool> {
        Ok(self.objects.borrow().contains_key(key))
    }

    fn list(&self, prefix: &str) -> Result<Vec<ListEntry>> {
        self.record(|s| s.lists += 1);
        let start = Self::dir_prefix(prefix);
        let objects = self.objects.borrow();

        let mut entries: Vec<ListEntry> = Vec::new();
        for key in objects.keys() {
            let Some(rest) = key.strip_prefix(&start) else {
                if key.as_str() > start.as_str() {
                    break;
                }
                continue;
            };
            let (name, is_directory) = match rest.split_once('/') {
                Some((head, _)) => (head, true),
                None => (rest, false),
            };
            if name.is_empty() {
                continue;
            }
            // A name that is both an object and a prefix is reported once, as a directory.
            match entries.iter_mut().find(|e| e.name == name) {
                Some(existing) => existing.is_directory |= is_directory,
                None => entries.push(ListEntry {
                    name: name.to_string(),
                    is_directory,
                }),
            }
        }
        trace!("list {:?}: {} entries", prefix, entries.len());
        Ok(entries)
    }

    fn open_range(&self, key: &str, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.record(|s| s.range_reads += 1);
        let objects = self.objects.borrow();
        let object = objects
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        let len = object.data.len() as u64;
        let start = offset.min(len);
        let end = offset.saturating_add(length).min(len);
        Ok(object.data[start as usize..end as usize].to_vec())
    }

    fn create(&self, key: &str) -> Result<()> {
        self.record(|s| s.creates += 1);
        self.objects.borrow_mut().insert(
            key.to_string(),
            Object {
                data: Vec::new(),
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.record(|s| s.puts += 1);
        self.objects.borrow_mut().insert(
            key.to_string(),
            Object {
                data: data.to_vec(),
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.record(|s| s.removes += 1);
        match self.objects.borrow_mut().remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    fn info(&self, key: &str) -> Result<ObjectInfo> {
        let objects = self.objects.borrow();
        let object = objects
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(ObjectInfo {
            size: object.data.len() as u64,
            modified: object.modified,
        })
    }

    fn invalidate_cache(&self) {
        self.record(|s| s.invalidations += 1);
    }
}
