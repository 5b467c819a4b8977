/// The pending set: entries the user has picked for the next archive.
///
/// Keyed by absolute path with insertion order preserved for display.
/// Adding is cheap no matter how large a directory is: directories are only
/// flattened by [`PendingSelection::expand_for_archiving`], once, at export
/// time.
///
/// Single-owner, single-threaded: one browsing session owns one selection.
use crate::model::FileEntry;
use crate::walker::{self, WalkOptions, WalkOutcome, WalkWarning};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of an external file/directory chooser dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChooserOutcome {
    /// The user confirmed zero or more absolute paths.
    Selected(Vec<PathBuf>),
    /// The user dismissed the dialog.
    Cancelled,
}

#[derive(Debug, Default, Clone)]
pub struct PendingSelection {
    entries: Vec<FileEntry>,
    index: HashSet<PathBuf>,
}

impl PendingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `entries` into the set. Returns how many were actually added.
    ///
    /// The first entry for a path wins: later duplicates are dropped without
    /// replacing it. Entries with relative paths are rejected.
    pub fn add<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = FileEntry>,
    {
        let mut added = 0;
        for entry in entries {
            if !entry.path().is_absolute() {
                warn!(
                    "ignoring selection entry with relative path {}",
                    entry.path().display()
                );
                continue;
            }
            if self.index.insert(entry.path().to_path_buf()) {
                self.entries.push(entry);
                added += 1;
            }
        }
        debug!("selection: +{added}, now {}", self.entries.len());
        added
    }

    /// Add raw paths, e.g. from drag-and-drop. Paths that no longer exist
    /// are skipped.
    pub fn add_paths<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let entries: Vec<FileEntry> = paths
            .into_iter()
            .filter_map(|p| walker::entry_for_path(p.as_ref()))
            .collect();
        self.add(entries)
    }

    /// Add the result of a chooser dialog. Cancellation adds nothing.
    pub fn add_chosen(&mut self, outcome: ChooserOutcome) -> usize {
        match outcome {
            ChooserOutcome::Selected(paths) => self.add_paths(paths),
            ChooserOutcome::Cancelled => 0,
        }
    }

    /// Remove the entry for `path`. Returns `false` (and does nothing) if
    /// it was not in the set.
    pub fn remove(&mut self, path: &Path) -> bool {
        if !self.index.remove(path) {
            return false;
        }
        self.entries.retain(|e| e.path() != path);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains(path)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Paths in insertion order, as handed to the archive builder.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.path().to_path_buf()).collect()
    }

    /// Sum of all sizes resolved so far.
    pub fn known_size(&self) -> u64 {
        self.entries.iter().filter_map(FileEntry::size).sum()
    }

    /// Stat every file entry that has no size yet, in parallel, and replace
    /// it with a sized copy. Entries whose stat fails keep `None`.
    ///
    /// Returns how many sizes were filled in.
    pub fn resolve_sizes(&mut self) -> usize {
        let pending: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_directory() && e.size().is_none())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return 0;
        }

        let paths: Vec<PathBuf> = pending
            .iter()
            .map(|&i| self.entries[i].path().to_path_buf())
            .collect();
        let sizes = walker::stat_sizes(&paths);

        let mut resolved = 0;
        for (i, result) in pending.into_iter().zip(sizes) {
            match result {
                Ok(size) => {
                    self.entries[i] = self.entries[i].clone().with_size(size);
                    resolved += 1;
                }
                Err(err) => debug!("size unavailable: {err}"),
            }
        }
        resolved
    }

    /// Flatten the selection into concrete files, in selection order.
    pub fn expand_for_archiving(&self) -> WalkOutcome {
        self.expand_for_archiving_with(&WalkOptions::default())
    }

    /// Flatten the selection: files are yielded as-is, directories are
    /// replaced by the files they recursively contain.
    ///
    /// An entry that can no longer be read is skipped with a warning rather
    /// than failing the whole expansion.
    pub fn expand_for_archiving_with(&self, options: &WalkOptions) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        for entry in &self.entries {
            if !entry.is_directory() {
                outcome.files.push(entry.clone());
                continue;
            }
            match walker::list_all_files_with(entry.path(), options) {
                Ok(mut sub) => {
                    outcome.files.append(&mut sub.files);
                    outcome.warnings.append(&mut sub.warnings);
                }
                Err(err) => {
                    warn!("cannot expand {}: {err}", entry.path().display());
                    outcome.warnings.push(WalkWarning {
                        path: entry.path().to_path_buf(),
                        message: err.to_string(),
                    });
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs(name: &str) -> PathBuf {
        std::env::temp_dir().join("drivestash-selection").join(name)
    }

    fn file(name: &str) -> FileEntry {
        FileEntry::from_path(abs(name), false)
    }

    #[test]
    fn duplicates_keep_first_entry() {
        let mut sel = PendingSelection::new();
        assert_eq!(sel.add([file("x.txt").with_size(1)]), 1);
        assert_eq!(sel.add([file("x.txt").with_size(999), file("y.txt")]), 1);
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.entries()[0].size(), Some(1));
    }

    #[test]
    fn duplicates_within_one_batch_are_dropped() {
        let mut sel = PendingSelection::new();
        assert_eq!(sel.add([file("a"), file("a"), file("b")]), 2);
        assert_eq!(sel.paths(), vec![abs("a"), abs("b")]);
    }

    #[test]
    fn relative_paths_are_rejected() {
        let mut sel = PendingSelection::new();
        let relative = FileEntry::from_path(PathBuf::from("relative/x.txt"), false);
        assert_eq!(sel.add([relative]), 0);
        assert!(sel.is_empty());
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut sel = PendingSelection::new();
        sel.add([file("a")]);
        assert!(!sel.remove(&abs("zzz")));
        assert_eq!(sel.len(), 1);
        assert!(sel.remove(&abs("a")));
        assert!(sel.is_empty());
        assert!(!sel.contains(&abs("a")));
    }

    #[test]
    fn re_add_after_remove_goes_to_the_end() {
        let mut sel = PendingSelection::new();
        sel.add([file("a"), file("b")]);
        sel.remove(&abs("a"));
        sel.add([file("a")]);
        assert_eq!(sel.paths(), vec![abs("b"), abs("a")]);
    }

    #[test]
    fn cancelled_chooser_adds_nothing() {
        let mut sel = PendingSelection::new();
        assert_eq!(sel.add_chosen(ChooserOutcome::Cancelled), 0);
        assert!(sel.is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut sel = PendingSelection::new();
        sel.add([file("a"), file("b")]);
        sel.clear();
        assert!(sel.is_empty());
        assert_eq!(sel.add([file("a")]), 1);
    }

    #[test]
    fn known_size_ignores_unresolved() {
        let mut sel = PendingSelection::new();
        sel.add([file("a").with_size(10), file("b"), file("c").with_size(5)]);
        assert_eq!(sel.known_size(), 15);
    }
}
