use std::fmt;

use crate::dir::DirectoryNode;
use crate::file::FileNode;
use crate::image::TypedFileNode;

/// Represents an entry in a directory: a directory, a plain file, or a file recognized
/// by the content resolver.
#[derive(Clone)]
pub enum Entry {
    Directory(DirectoryNode),
    File(FileNode),
    Typed(TypedFileNode),
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    /// True for both plain and typed files.
    pub fn is_file(&self) -> bool {
        !self.is_directory()
    }

    pub fn is_bound(&self) -> bool {
        match self {
            Entry::Directory(dir) => dir.is_bound(),
            Entry::File(file) => file.is_bound(),
            Entry::Typed(typed) => typed.file().is_bound(),
        }
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Entry::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    /// The underlying file handle of a plain or typed file.
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Typed(typed) => Some(typed.file()),
            Entry::Directory(_) => None,
        }
    }

    pub fn as_typed(&self) -> Option<&TypedFileNode> {
        match self {
            Entry::Typed(typed) => Some(typed),
            _ => None,
        }
    }

    pub fn into_directory(self) -> Option<DirectoryNode> {
        match self {
            Entry::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn into_file(self) -> Option<FileNode> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Typed(typed) => Some(typed.into_file()),
            Entry::Directory(_) => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Entry::Directory(_) => "directory",
            Entry::File(_) => "file",
            Entry::Typed(_) => "typed file",
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Directory(dir) => fmt::Debug::fmt(dir, f),
            Entry::File(file) => fmt::Debug::fmt(file, f),
            Entry::Typed(typed) => fmt::Debug::fmt(typed, f),
        }
    }
}

impl From<DirectoryNode> for Entry {
    fn from(dir: DirectoryNode) -> Self {
        Entry::Directory(dir)
    }
}

impl From<FileNode> for Entry {
    fn from(file: FileNode) -> Self {
        Entry::File(file)
    }
}

impl From<TypedFileNode> for Entry {
    fn from(typed: TypedFileNode) -> Self {
        Entry::Typed(typed)
    }
}
