/// Deep walker: flattens a directory into the files it recursively contains.
///
/// Built on `jwalk`, which keeps its own work queue instead of recursing, so
/// pathological directory depth cannot blow the stack. Hidden entries are
/// pruned in `process_read_dir`, which also stops the walk from descending
/// into hidden directories.
///
/// Unreadable sub-directories do not abort the walk: they are skipped and
/// reported as [`WalkWarning`]s so the caller can log or surface them.
use super::filter;
use crate::error::FsError;
use crate::model::FileEntry;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tuning knobs for the deep walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalkOptions {
    /// Worker threads for the walk. `0` means one per logical CPU.
    pub threads: usize,
}

impl WalkOptions {
    fn parallelism(&self) -> jwalk::Parallelism {
        let threads = if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        };
        if threads <= 1 {
            jwalk::Parallelism::Serial
        } else {
            jwalk::Parallelism::RayonNewPool(threads)
        }
    }
}

/// A non-fatal problem met during a walk (typically access denied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Result of a deep walk: every visible file with its size, plus warnings
/// for the parts of the tree that had to be skipped.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub files: Vec<FileEntry>,
    pub warnings: Vec<WalkWarning>,
}

impl WalkOutcome {
    /// Sum of all file sizes found.
    pub fn total_size(&self) -> u64 {
        self.files.iter().filter_map(FileEntry::size).sum()
    }

    fn skip(&mut self, reported: &mut HashSet<PathBuf>, path: PathBuf, message: String) {
        if !reported.insert(path.clone()) {
            return;
        }
        warn!("skipping {}: {message}", path.display());
        self.warnings.push(WalkWarning { path, message });
    }
}

/// Recursively list every visible file under `path` with default options.
pub fn list_all_files(path: &Path) -> Result<WalkOutcome, FsError> {
    list_all_files_with(path, &WalkOptions::default())
}

/// Recursively list every visible file under `path`.
///
/// Only non-directory entries are returned, each with its size resolved.
/// Symlinks to files are followed for their size; symlinks to directories
/// are not descended. If `path` is itself a file, it flattens to itself.
///
/// # Errors
///
/// Only failures on `path` itself are errors; anything below it that cannot
/// be read becomes a warning in the outcome.
pub fn list_all_files_with(path: &Path, options: &WalkOptions) -> Result<WalkOutcome, FsError> {
    let root = super::absolute(path)?;
    let root_meta = fs::metadata(&root).map_err(|e| FsError::from_io(&root, e))?;

    if !root_meta.is_dir() {
        return Ok(WalkOutcome {
            files: vec![FileEntry::from_path(root, false).with_size(root_meta.len())],
            warnings: Vec::new(),
        });
    }

    let walker = jwalk::WalkDir::new(&root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(options.parallelism())
        .process_read_dir(|depth, _dir, _state, children| {
            // The root arrives here alone with no depth; only its contents
            // are filtered, so a dot-named root is still walked.
            if depth.is_none() {
                return;
            }
            children.retain(|child| match child {
                Ok(entry) => !filter::is_excluded(&entry.path(), entry.file_name()),
                // Keep errors so they surface as warnings.
                Err(_) => true,
            });
        });

    let mut outcome = WalkOutcome::default();
    let mut reported: HashSet<PathBuf> = HashSet::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let err_path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.clone());
                outcome.skip(&mut reported, err_path, err.to_string());
                continue;
            }
        };

        if let Some(err) = &entry.read_children_error {
            outcome.skip(&mut reported, entry.path(), err.to_string());
        }

        // The root itself is not part of the result.
        if entry.depth == 0 {
            continue;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let entry_path = entry.path();
        let meta = if file_type.is_symlink() {
            fs::metadata(&entry_path)
        } else {
            fs::symlink_metadata(&entry_path)
        };

        match meta {
            Ok(m) if m.is_dir() => {
                debug!("not following directory link {}", entry_path.display());
            }
            Ok(m) => {
                let size = m.len();
                outcome
                    .files
                    .push(FileEntry::from_path(entry_path, false).with_size(size));
            }
            Err(err) => {
                outcome.skip(&mut reported, entry_path, err.to_string());
            }
        }
    }

    debug!(
        "walked {}: {} files, {} warnings",
        root.display(),
        outcome.files.len(),
        outcome.warnings.len()
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        let mut f = File::create(path).unwrap();
        f.write_all(&vec![1u8; n]).unwrap();
    }

    fn names(outcome: &WalkOutcome) -> Vec<String> {
        let mut v: Vec<String> = outcome.files.iter().map(|f| f.name().to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn flattens_nested_tree_with_sizes() {
        let tmp = TempDir::new().unwrap();
        let deep = tmp.path().join("a").join("b").join("c");
        fs::create_dir_all(&deep).unwrap();
        write_bytes(&tmp.path().join("top.txt"), 10);
        write_bytes(&deep.join("leaf.bin"), 20);

        let outcome = list_all_files(tmp.path()).unwrap();
        assert_eq!(names(&outcome), vec!["leaf.bin", "top.txt"]);
        assert_eq!(outcome.total_size(), 30);
        assert!(outcome.files.iter().all(|f| !f.is_directory()));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn prunes_hidden_directories() {
        let tmp = TempDir::new().unwrap();
        let hidden = tmp.path().join(".cache");
        fs::create_dir(&hidden).unwrap();
        write_bytes(&hidden.join("inside.txt"), 5);
        write_bytes(&tmp.path().join(".dotfile"), 5);
        write_bytes(&tmp.path().join("shown.txt"), 5);

        let outcome = list_all_files(tmp.path()).unwrap();
        assert_eq!(names(&outcome), vec!["shown.txt"]);
    }

    #[test]
    fn dot_named_root_is_still_walked() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join(".config");
        fs::create_dir_all(root.join("app")).unwrap();
        write_bytes(&root.join("app").join("settings.json"), 7);
        write_bytes(&root.join("top.toml"), 3);
        write_bytes(&root.join(".lock"), 1);

        for threads in [1, 4] {
            let outcome = list_all_files_with(&root, &WalkOptions { threads }).unwrap();
            assert_eq!(names(&outcome), vec!["settings.json", "top.toml"]);
            assert_eq!(outcome.total_size(), 10);
        }
    }

    #[test]
    fn single_file_flattens_to_itself() {
        let tmp = TempDir::new().unwrap();
        let f = tmp.path().join("solo.dat");
        write_bytes(&f, 42);
        let outcome = list_all_files(&f).unwrap();
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].size(), Some(42));
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            list_all_files(&tmp.path().join("missing")).unwrap_err(),
            FsError::NotFound(_)
        ));
    }

    #[test]
    fn serial_and_parallel_find_same_files() {
        let tmp = TempDir::new().unwrap();
        for d in 0..4 {
            let dir = tmp.path().join(format!("d{d}"));
            fs::create_dir(&dir).unwrap();
            for f in 0..5 {
                write_bytes(&dir.join(format!("f{f}.txt")), f + 1);
            }
        }
        let serial = list_all_files_with(tmp.path(), &WalkOptions { threads: 1 }).unwrap();
        let parallel = list_all_files_with(tmp.path(), &WalkOptions { threads: 4 }).unwrap();
        assert_eq!(serial.files.len(), 20);
        assert_eq!(serial.total_size(), parallel.total_size());
    }
}
