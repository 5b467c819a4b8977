/// Directory walker: shallow listings, deep flattening and size probes.
///
/// Provides two listing depths:
/// - **Shallow** ([`list_children`]): one `read_dir` level, used to browse.
/// - **Deep** ([`list_all_files`]): `jwalk`-based traversal that flattens a
///   subtree into its files, used when exporting.
///
/// Both apply the same hidden/system filter (see [`filter`]). Listings are
/// returned in whatever order the OS yields; callers sort for display.
/// File content digests live in [`digest`].
pub mod deep;
pub mod digest;
pub mod filter;

pub use deep::{list_all_files, list_all_files_with, WalkOptions, WalkOutcome, WalkWarning};
pub use digest::{file_digest, file_digests};

use crate::error::FsError;
use crate::model::FileEntry;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List the immediate, visible children of the directory at `path`.
///
/// Relative paths are resolved against the current directory so every
/// returned entry carries an absolute path. Sizes are left unset.
///
/// # Errors
///
/// - [`FsError::NotFound`] if `path` does not exist.
/// - [`FsError::PermissionDenied`] if it cannot be read.
/// - [`FsError::NotADirectory`] if it is not a directory.
pub fn list_children(path: &Path) -> Result<Vec<FileEntry>, FsError> {
    let dir = absolute(path)?;

    let meta = fs::metadata(&dir).map_err(|e| FsError::from_io(&dir, e))?;
    if !meta.is_dir() {
        return Err(FsError::NotADirectory(dir));
    }

    let read_dir = fs::read_dir(&dir).map_err(|e| FsError::from_io(&dir, e))?;
    let mut entries = Vec::new();

    for item in read_dir {
        let item = match item {
            Ok(i) => i,
            Err(err) => {
                debug!("skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };

        let name = item.file_name();
        let child = item.path();
        if filter::is_excluded(&child, &name) {
            continue;
        }

        let is_dir = match item.file_type() {
            // Symlinks are classified by their target; a dangling link is a file.
            Ok(ft) if ft.is_symlink() => fs::metadata(&child).map(|m| m.is_dir()).unwrap_or(false),
            Ok(ft) => ft.is_dir(),
            Err(err) => {
                debug!("skipping {}: {err}", child.display());
                continue;
            }
        };

        entries.push(FileEntry::from_path(child, is_dir));
    }

    Ok(entries)
}

/// `true` if `path` currently resolves to a directory.
///
/// Never fails: a stat error (vanished path, denied access) yields `false`,
/// which is what drag-and-drop callers want for paths that may be gone.
pub fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Size in bytes of the item at `path`.
///
/// # Errors
///
/// [`FsError::NotFound`] if the path no longer exists; other stat failures
/// are classified via [`FsError::from_io`].
pub fn stat_size(path: &Path) -> Result<u64, FsError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| FsError::from_io(path, e))
}

/// Stat many paths concurrently. Results are in input order.
///
/// Each probe touches a disjoint path, so they run on the rayon pool.
pub fn stat_sizes(paths: &[PathBuf]) -> Vec<Result<u64, FsError>> {
    paths.par_iter().map(|p| stat_size(p)).collect()
}

/// Build a [`FileEntry`] for an arbitrary path (file picker, drag-and-drop).
///
/// Returns `None` if the path cannot be stat'ed, e.g. it vanished between
/// the gesture and this call.
pub fn entry_for_path(path: &Path) -> Option<FileEntry> {
    let abs = absolute(path).ok()?;
    match fs::metadata(&abs) {
        Ok(meta) => Some(FileEntry::from_path(abs, meta.is_dir())),
        Err(err) => {
            debug!("dropping {}: {err}", abs.display());
            None
        }
    }
}

/// Resolve `path` against the current directory without touching the
/// filesystem beyond that.
pub(crate) fn absolute(path: &Path) -> Result<PathBuf, FsError> {
    std::path::absolute(path).map_err(|e| FsError::from_io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        let mut f = File::create(path).unwrap();
        f.write_all(&vec![7u8; n]).unwrap();
    }

    #[test]
    fn list_children_reports_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let err = list_children(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[test]
    fn list_children_rejects_files() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        write_bytes(&file, 3);
        assert!(matches!(
            list_children(&file).unwrap_err(),
            FsError::NotADirectory(_)
        ));
    }

    #[test]
    fn list_children_leaves_sizes_unset() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("a.bin"), 10);
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let entries = list_children(tmp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.size().is_none()));
        assert!(entries.iter().all(|e| e.path().is_absolute()));
        let sub = entries.iter().find(|e| e.name() == "sub").unwrap();
        assert!(sub.is_directory());
    }

    #[test]
    fn is_directory_is_false_for_missing_paths() {
        let tmp = TempDir::new().unwrap();
        assert!(is_directory(tmp.path()));
        assert!(!is_directory(&tmp.path().join("vanished")));
    }

    #[test]
    fn stat_size_reads_length_and_reports_missing() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("x.bin");
        write_bytes(&file, 1234);
        assert_eq!(stat_size(&file).unwrap(), 1234);
        assert!(matches!(
            stat_size(&tmp.path().join("gone")).unwrap_err(),
            FsError::NotFound(_)
        ));
    }

    #[test]
    fn stat_sizes_keeps_input_order() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        write_bytes(&a, 5);
        write_bytes(&b, 50);
        let results = stat_sizes(&[b.clone(), tmp.path().join("missing"), a.clone()]);
        assert_eq!(results[0].as_ref().unwrap(), &50);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &5);
    }

    #[test]
    fn entry_for_path_skips_vanished() {
        let tmp = TempDir::new().unwrap();
        assert!(entry_for_path(&tmp.path().join("ghost")).is_none());
        let e = entry_for_path(tmp.path()).unwrap();
        assert!(e.is_directory());
    }
}
