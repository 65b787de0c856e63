//! Directory nodes
//!
//! A [`DirectoryNode`] presents one key prefix of an object store as a mutable mapping
//! from child name to [`Entry`]. The store itself has no directories, so a node keeps
//! two pieces of bookkeeping per snapshot:
//!
//! - `children`: every immediate child name, flagged as directory or file;
//! - `virtual_children`: the directory children that no stored key lives under.
//!
//! A directory assigned through [`DirectoryNode::set`] starts out virtual. It becomes
//! real (is *materialized*) once a file is created anywhere beneath it, and turns
//! virtual again when the last real descendant is deleted. Both transitions walk the
//! chain of parent links upward and stop at the first ancestor whose state does not
//! change, so creating and then deleting one file leaves every ancestor exactly as it
//! was.
//!
//! Snapshots are loaded lazily on first access and only dropped by
//! [`DirectoryNode::refresh`]. Nodes never see each other's caches, and changes made
//! through another node or another process are not observed until a refresh. On an
//! eventually consistent store, a listing fetched right after a write may still be
//! stale; nothing here retries.
//!
//! Parent links are weak. Propagation ends at the first ancestor handle that has been
//! dropped or whose snapshot has been refreshed away.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use log::{debug, trace};
use once_cell::unsync::OnceCell;

use crate::config::Config;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::file::FileNode;
use crate::resolver::ContentResolver;
use crate::store::{join_key, normalize_key, StoreClient};

struct DirBinding {
    path: String,
    /// Name of this node as seen from its parent
    name: String,
    parent: Option<Weak<DirInner>>,
    store: Rc<dyn StoreClient>,
    resolver: Arc<ContentResolver>,
}

#[derive(Debug, Default)]
struct Snapshot {
    /// Listing order, then insertion order
    order: Vec<String>,
    children: HashMap<String, bool>,
    virtual_children: HashSet<String>,
    /// Sniffed MIME type per file name
    mime: HashMap<String, String>,
}

impl Snapshot {
    fn insert(&mut self, name: &str, is_directory: bool) {
        if self.children.insert(name.to_string(), is_directory).is_none() {
            self.order.push(name.to_string());
        }
    }

    fn remove(&mut self, name: &str) {
        if self.children.remove(name).is_some() {
            self.order.retain(|n| n != name);
        }
        self.virtual_children.remove(name);
        self.mime.remove(name);
    }

    /// No child is backed by a stored key.
    fn is_hollow(&self) -> bool {
        self.children
            .iter()
            .all(|(name, is_dir)| *is_dir && self.virtual_children.contains(name))
    }

    fn check_virtual(&self, name: &str) -> Result<()> {
        if self.virtual_children.contains(name) && self.children.get(name) != Some(&true) {
            return Err(Error::Inconsistent(format!(
                "{name:?} is marked virtual but is not a directory child"
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct DirInner {
    binding: OnceCell<DirBinding>,
    snapshot: RefCell<Option<Snapshot>>,
}

/// Mapping view over one key prefix of an object store.
///
/// Cloning a `DirectoryNode` yields another handle to the same node and cache.
#[derive(Clone, Default)]
pub struct DirectoryNode {
    inner: Rc<DirInner>,
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

impl DirectoryNode {
    /// An unbound directory, to be assigned into a parent with [`DirectoryNode::set`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `root` as a root node using the shared content resolver.
    ///
    /// Surrounding slashes are ignored. The empty key opens the whole store.
    pub fn open(root: &str, store: Rc<dyn StoreClient>) -> Result<Self> {
        Self::open_with_resolver(root, store, ContentResolver::shared())
    }

    pub fn open_with_resolver(
        root: &str,
        store: Rc<dyn StoreClient>,
        resolver: Arc<ContentResolver>,
    ) -> Result<Self> {
        let path = normalize_key(root);
        if !store.is_directory(&path)? {
            return Err(Error::NotFound(path));
        }
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        let node = Self::new();
        node.bind(DirBinding {
            path,
            name,
            parent: None,
            store,
            resolver,
        })?;
        debug!("opened root {:?}", node.path()?);
        Ok(node)
    }

    pub fn from_config(config: &Config, store: Rc<dyn StoreClient>) -> Result<Self> {
        Self::open_with_resolver(&config.root, store, config.resolver())
    }

    fn bind(&self, binding: DirBinding) -> Result<()> {
        self.inner
            .binding
            .set(binding)
            .map_err(|b| Error::TypeMismatch(format!("directory already bound to {}", b.path)))
    }

    fn binding(&self) -> Result<&DirBinding> {
        self.inner
            .binding
            .get()
            .ok_or_else(|| Error::TypeMismatch("directory is not bound to a key".to_string()))
    }

    /// Child node bound under this one. A virtual child starts with an empty snapshot,
    /// since there is nothing in the store to list.
    fn child(&self, name: &str, is_virtual: bool) -> Result<DirectoryNode> {
        let binding = self.binding()?;
        let child = DirectoryNode::new();
        child.bind(DirBinding {
            path: join_key(&binding.path, name),
            name: name.to_string(),
            parent: Some(Rc::downgrade(&self.inner)),
            store: Rc::clone(&binding.store),
            resolver: Arc::clone(&binding.resolver),
        })?;
        if is_virtual {
            *child.inner.snapshot.borrow_mut() = Some(Snapshot::default());
        }
        Ok(child)
    }

    pub fn is_bound(&self) -> bool {
        self.inner.binding.get().is_some()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.inner.binding.get(), Some(b) if b.parent.is_none())
    }

    pub fn path(&self) -> Result<&str> {
        Ok(&self.binding()?.path)
    }

    pub fn name(&self) -> Result<&str> {
        Ok(&self.binding()?.name)
    }

    /// The parent node, if this is not a root and the parent handle is still alive.
    pub fn parent(&self) -> Option<DirectoryNode> {
        let binding = self.inner.binding.get()?;
        let inner = binding.parent.as_ref()?.upgrade()?;
        Some(DirectoryNode { inner })
    }

    pub fn store(&self) -> Result<Rc<dyn StoreClient>> {
        Ok(Rc::clone(&self.binding()?.store))
    }

    pub fn resolver(&self) -> Result<Arc<ContentResolver>> {
        Ok(Arc::clone(&self.binding()?.resolver))
    }

    fn load(&self) -> Result<()> {
        let binding = self.binding()?;
        if self.inner.snapshot.borrow().is_some() {
            return Ok(());
        }
        let entries = binding.store.list(&binding.path)?;
        let mut snapshot = Snapshot::default();
        for entry in entries.into_iter().filter(|e| !e.name.is_empty()) {
            let is_directory = entry.is_directory || snapshot.children.get(&entry.name) == Some(&true);
            snapshot.insert(&entry.name, is_directory);
        }
        debug!(
            "loaded {:?}: {} children",
            binding.path,
            snapshot.children.len()
        );
        *self.inner.snapshot.borrow_mut() = Some(snapshot);
        Ok(())
    }

    fn read<R, F: FnOnce(&Snapshot) -> R>(&self, f: F) -> Result<R> {
        self.load()?;
        match self.inner.snapshot.borrow().as_ref() {
            Some(snapshot) => Ok(f(snapshot)),
            None => Err(Error::Inconsistent("snapshot vanished after load".to_string())),
        }
    }

    fn update<R, F: FnOnce(&mut Snapshot) -> R>(&self, f: F) -> Result<R> {
        self.load()?;
        match self.inner.snapshot.borrow_mut().as_mut() {
            Some(snapshot) => Ok(f(snapshot)),
            None => Err(Error::Inconsistent("snapshot vanished after load".to_string())),
        }
    }

    /// Child names, in store listing order followed by names added through `set`.
    pub fn names(&self) -> Result<Vec<String>> {
        self.read(|s| s.order.clone())
    }

    pub fn len(&self) -> Result<usize> {
        self.read(|s| s.children.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.read(|s| s.children.is_empty())
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        self.read(|s| s.children.contains_key(name))
    }

    /// Whether `name` is a directory child with no backing key.
    pub fn is_virtual(&self, name: &str) -> Result<bool> {
        self.read(|s| s.virtual_children.contains(name))
    }

    pub fn virtual_names(&self) -> Result<Vec<String>> {
        self.read(|s| {
            s.order
                .iter()
                .filter(|n| s.virtual_children.contains(*n))
                .cloned()
                .collect()
        })
    }

    /// Look up a child.
    ///
    /// Directories come back as new [`DirectoryNode`]s bound below this one. Files are
    /// classified by the content resolver (once per name, until the next refresh) and
    /// come back either as a typed wrapper or as a plain [`FileNode`].
    pub fn get(&self, name: &str) -> Result<Entry> {
        let binding = self.binding()?;
        let (kind, is_virtual, cached) = self.read(|s| {
            (
                s.children.get(name).copied(),
                s.virtual_children.contains(name),
                s.mime.get(name).cloned(),
            )
        })?;
        let path = join_key(&binding.path, name);
        let is_directory = kind.ok_or_else(|| Error::NotFound(path.clone()))?;

        if is_directory {
            return Ok(Entry::Directory(self.child(name, is_virtual)?));
        }

        let mime = match cached {
            Some(mime) => mime,
            None => {
                let mime = binding.resolver.sniff(binding.store.as_ref(), &path)?;
                if let Some(snapshot) = self.inner.snapshot.borrow_mut().as_mut() {
                    snapshot.mime.insert(name.to_string(), mime.clone());
                }
                mime
            }
        };
        let file = FileNode::bound(path, Rc::clone(&binding.store));
        Ok(binding.resolver.dispatch(file, &mime))
    }

    /// Follow a relative slash-delimited path through nested lookups.
    pub fn resolve(&self, relative: &str) -> Result<Entry> {
        let mut current = Entry::Directory(self.clone());
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            let dir = match current {
                Entry::Directory(dir) => dir,
                other => {
                    let path = other.as_file().and_then(|f| f.path().ok()).unwrap_or_default();
                    return Err(Error::NotFound(join_key(path, segment)));
                }
            };
            current = dir.get(segment)?;
        }
        Ok(current)
    }

    /// All children with their resolved entries.
    pub fn entries(&self) -> Result<Vec<(String, Entry)>> {
        self.names()?
            .into_iter()
            .map(|name| {
                let entry = self.get(&name)?;
                Ok((name, entry))
            })
            .collect()
    }

    /// Assign a new child.
    ///
    /// `value` must be an unbound [`DirectoryNode`] or [`FileNode`]. A directory is
    /// recorded as a virtual child without touching the store. A file is created in the
    /// store first and then recorded, materializing every virtual ancestor. On success
    /// `value` is bound below this node.
    pub fn set<E: Into<Entry>>(&self, name: &str, value: E) -> Result<()> {
        validate_name(name)?;
        let binding = self.binding()?;
        let value = value.into();
        let path = join_key(&binding.path, name);

        if self.contains(name)? {
            return Err(Error::AlreadyExists(path));
        }
        if value.is_bound() {
            return Err(Error::TypeMismatch(format!(
                "unbound directory or file expected, got a bound {}",
                value.kind()
            )));
        }

        match value {
            Entry::Directory(dir) => {
                dir.bind(DirBinding {
                    path,
                    name: name.to_string(),
                    parent: Some(Rc::downgrade(&self.inner)),
                    store: Rc::clone(&binding.store),
                    resolver: Arc::clone(&binding.resolver),
                })?;
                *dir.inner.snapshot.borrow_mut() = Some(Snapshot::default());
                self.update(|s| {
                    s.insert(name, true);
                    s.virtual_children.insert(name.to_string());
                })?;
                trace!("added virtual directory {:?}", dir.path()?);
                Ok(())
            }
            Entry::File(file) => {
                debug!("create {:?}", path);
                binding.store.create(&path)?;
                self.update(|s| s.insert(name, false))?;
                self.materialize()?;
                file.bind(path, Rc::clone(&binding.store))
            }
            Entry::Typed(_) => Err(Error::TypeMismatch(
                "typed files are resolved views and cannot be assigned".to_string(),
            )),
        }
    }

    /// Remove a child.
    ///
    /// Virtual directories are dropped from the bookkeeping only. Real directories are
    /// refused with [`Error::NotEmpty`]. Files are removed from the store, after which
    /// ancestors left without real content turn virtual.
    pub fn delete(&self, name: &str) -> Result<()> {
        let binding = self.binding()?;
        let (kind, is_virtual) = self.read(|s| {
            (
                s.children.get(name).copied(),
                s.virtual_children.contains(name),
            )
        })?;
        let path = join_key(&binding.path, name);
        let is_directory = kind.ok_or_else(|| Error::NotFound(path.clone()))?;

        if is_directory {
            if !is_virtual {
                return Err(Error::NotEmpty(path));
            }
            self.update(|s| s.remove(name))?;
            trace!("dropped virtual directory {:?}", path);
            return Ok(());
        }

        debug!("remove {:?}", path);
        binding.store.remove(&path)?;
        self.update(|s| s.remove(name))?;
        self.virtualize()
    }

    /// Forget the cached snapshot and ask the store client to drop its caches.
    pub fn refresh(&self) -> Result<()> {
        let binding = self.binding()?;
        self.inner.snapshot.borrow_mut().take();
        binding.store.invalidate_cache();
        debug!("refreshed {:?}", binding.path);
        Ok(())
    }

    /// Clear the virtual mark of every ancestor up to the first real one.
    fn materialize(&self) -> Result<()> {
        let mut current = Rc::clone(&self.inner);
        loop {
            let Some((parent, name)) = upward(&current) else {
                break;
            };
            let changed = {
                let mut guard = parent.snapshot.borrow_mut();
                let Some(snapshot) = guard.as_mut() else {
                    break;
                };
                snapshot.check_virtual(&name)?;
                snapshot.virtual_children.remove(&name)
            };
            if !changed {
                break;
            }
            trace!("materialized {:?}", child_path(&parent, &name));
            current = parent;
        }
        Ok(())
    }

    /// Mark ancestors virtual for as long as each one holds nothing real.
    fn virtualize(&self) -> Result<()> {
        let mut current = Rc::clone(&self.inner);
        loop {
            let Some((parent, name)) = upward(&current) else {
                break;
            };
            let hollow = current
                .snapshot
                .borrow()
                .as_ref()
                .is_some_and(Snapshot::is_hollow);
            if !hollow {
                break;
            }
            let changed = {
                let mut guard = parent.snapshot.borrow_mut();
                let Some(snapshot) = guard.as_mut() else {
                    break;
                };
                snapshot.check_virtual(&name)?;
                // A parent reloaded since this node was obtained may no longer list it
                if snapshot.virtual_children.contains(&name)
                    || snapshot.children.get(&name) != Some(&true)
                {
                    false
                } else {
                    snapshot.virtual_children.insert(name.clone())
                }
            };
            if !changed {
                break;
            }
            trace!("virtualized {:?}", child_path(&parent, &name));
            current = parent;
        }
        Ok(())
    }
}

/// Live parent of `node` and the name `node` has in it.
fn upward(node: &Rc<DirInner>) -> Option<(Rc<DirInner>, String)> {
    let binding = node.binding.get()?;
    let parent = binding.parent.as_ref()?.upgrade()?;
    Some((parent, binding.name.clone()))
}

fn child_path(parent: &DirInner, name: &str) -> String {
    match parent.binding.get() {
        Some(b) => join_key(&b.path, name),
        None => name.to_string(),
    }
}

impl fmt::Debug for DirectoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.binding.get() {
            Some(b) => write!(f, "DirectoryNode({:?})", b.path),
            None => write!(f, "DirectoryNode(<unbound>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn root_with(objects: &[(&str, &str)]) -> (Rc<MemoryStore>, DirectoryNode) {
        let store = Rc::new(MemoryStore::with_objects(objects.iter().copied()));
        let root = DirectoryNode::open("bucket", store.clone()).unwrap();
        (store, root)
    }

    #[test]
    fn test_snapshot_hollow() {
        let mut s = Snapshot::default();
        assert!(s.is_hollow());
        s.insert("a", true);
        s.virtual_children.insert("a".to_string());
        assert!(s.is_hollow());
        s.insert("f", false);
        assert!(!s.is_hollow());
        s.remove("f");
        assert!(s.is_hollow());
        s.insert("b", true);
        assert!(!s.is_hollow());
    }

    #[test]
    fn test_snapshot_order_survives_removal() {
        let mut s = Snapshot::default();
        s.insert("x", false);
        s.insert("y", true);
        s.insert("z", false);
        s.remove("y");
        s.insert("x", false);
        assert_eq!(s.order, vec!["x".to_string(), "z".to_string()]);
    }

    #[test]
    fn test_check_virtual_flags_broken_state() {
        let mut s = Snapshot::default();
        s.virtual_children.insert("ghost".to_string());
        assert!(matches!(s.check_virtual("ghost"), Err(Error::Inconsistent(_))));

        s.insert("ghost", false);
        assert!(matches!(s.check_virtual("ghost"), Err(Error::Inconsistent(_))));
        assert!(s.check_virtual("other").is_ok());
    }

    #[test]
    fn test_inconsistent_parent_fails_fast() {
        let (_store, root) = root_with(&[("bucket/a/f", "")]);
        let a = root.get("a").unwrap().into_directory().unwrap();

        // Corrupt the parent: "a" virtual while listed as a file
        root.update(|s| {
            s.children.insert("a".to_string(), false);
            s.virtual_children.insert("a".to_string());
        })
        .unwrap();

        assert!(matches!(
            a.set("g", FileNode::new()),
            Err(Error::Inconsistent(_))
        ));
    }

    #[test]
    fn test_unbound_directory_rejects_access() {
        let dir = DirectoryNode::new();
        assert!(!dir.is_bound());
        assert!(!dir.is_root());
        assert!(matches!(dir.names(), Err(Error::TypeMismatch(_))));
        assert!(matches!(dir.get("x"), Err(Error::TypeMismatch(_))));
        assert!(matches!(dir.refresh(), Err(Error::TypeMismatch(_))));
        assert!(matches!(
            dir.set("x", FileNode::new()),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_open_requires_existing_prefix() {
        let store = Rc::new(MemoryStore::with_objects([("bucket/a", "")]));
        assert!(DirectoryNode::open("/bucket/", store.clone()).is_ok());
        assert!(matches!(
            DirectoryNode::open("nothing", store.clone()),
            Err(Error::NotFound(_))
        ));
        let whole = DirectoryNode::open("", store).unwrap();
        assert!(whole.is_root());
        assert_eq!(whole.names().unwrap(), vec!["bucket".to_string()]);
    }

    #[test]
    fn test_listing_is_lazy() {
        let (store, root) = root_with(&[("bucket/a", "")]);
        assert_eq!(store.stats().lists, 0);
        assert_eq!(root.len().unwrap(), 1);
        assert_eq!(root.len().unwrap(), 1);
        assert_eq!(store.stats().lists, 1);
    }

    #[test]
    fn test_dropped_parent_stops_propagation() {
        let (store, root) = root_with(&[("bucket/keep", "")]);
        root.set("a", DirectoryNode::new()).unwrap();
        let a = root.get("a").unwrap().into_directory().unwrap();
        drop(root);

        assert!(a.parent().is_none());
        a.set("f", FileNode::new()).unwrap();
        assert!(store.contains_key("bucket/a/f"));
    }

    #[test]
    fn test_refreshed_parent_stops_propagation() {
        let (_store, root) = root_with(&[("bucket/keep", "")]);
        let a = DirectoryNode::new();
        root.set("a", a.clone()).unwrap();
        root.refresh().unwrap();

        a.set("f", FileNode::new()).unwrap();
        // The reload sees the object the store now holds under "a"
        assert_eq!(root.names().unwrap(), vec!["a".to_string(), "keep".to_string()]);
        assert!(!root.is_virtual("a").unwrap());
    }
}
