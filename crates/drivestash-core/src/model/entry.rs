/// A single file or directory produced by a listing.
///
/// Entries are immutable once built. Directories never carry a size; file
/// sizes are filled in lazily via [`FileEntry::with_size`] because statting
/// every entry of a listing up front is wasted work.
use compact_str::CompactString;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    name: CompactString,
    path: PathBuf,
    is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

impl FileEntry {
    /// Create a file entry, optionally with a known size.
    pub fn file(name: impl Into<CompactString>, path: PathBuf, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            path,
            is_directory: false,
            size,
        }
    }

    /// Create a directory entry. Directories never carry a size.
    pub fn directory(name: impl Into<CompactString>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
            is_directory: true,
            size: None,
        }
    }

    /// Build an entry for `path`, deriving the name from its last component.
    pub fn from_path(path: PathBuf, is_directory: bool) -> Self {
        let name = display_name(&path);
        if is_directory {
            Self::directory(name, path)
        } else {
            Self::file(name, path, None)
        }
    }

    /// Return a copy with the size set. A no-op for directories.
    pub fn with_size(self, size: u64) -> Self {
        if self.is_directory {
            return self;
        }
        Self {
            size: Some(size),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Size in bytes, if it has been resolved. Always `None` for directories.
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Last path component as a display string.
///
/// Roots have no file name: for drives like "C:\" this yields "C:", for
/// "/" it yields "/".
pub fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => {
            let s = path.to_string_lossy();
            let trimmed = s.trim_end_matches(['\\', '/']);
            if trimmed.is_empty() {
                s.into_owned()
            } else {
                trimmed.to_string()
            }
        }
    }
}
