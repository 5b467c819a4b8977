/// Expansion of a selection into the flat list of zip entries to write.
///
/// Every selected item becomes one top-level name in the container. A file
/// is stored under its base name; a directory contributes its visible files
/// under `<base name>/<relative path>`, or a single directory entry when it
/// has none. Clashing base names are disambiguated with numeric suffixes.
use super::naming::{root_entry_name, unique_entry_name};
use crate::error::{ArchiveError, FsError};
use crate::walker::{self, WalkOptions, WalkWarning};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One entry of the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlannedEntry {
    File {
        source: PathBuf,
        name: String,
        size: u64,
    },
    /// An empty selected directory, stored as `<name>/`.
    Directory { name: String },
}

impl PlannedEntry {
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Directory { name } => name,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ArchivePlan {
    pub entries: Vec<PlannedEntry>,
    pub warnings: Vec<WalkWarning>,
}

impl ArchivePlan {
    pub(crate) fn file_count(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| matches!(e, PlannedEntry::File { .. }))
            .count() as u64
    }

    /// Bytes expected to be read, from the sizes seen while planning.
    pub(crate) fn total_bytes(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| match e {
                PlannedEntry::File { size, .. } => *size,
                PlannedEntry::Directory { .. } => 0,
            })
            .sum()
    }
}

/// Expand `inputs` into an [`ArchivePlan`].
///
/// # Errors
///
/// - [`ArchiveError::Input`] if a selected item is gone or its directory
///   cannot be read at all.
/// - [`ArchiveError::Cancelled`] if `cancel` is raised between inputs.
/// - [`ArchiveError::EmptySelection`] if nothing remains to write.
pub(crate) fn build_plan(
    inputs: &[PathBuf],
    walk: &WalkOptions,
    cancel: &AtomicBool,
) -> Result<ArchivePlan, ArchiveError> {
    let mut plan = ArchivePlan::default();
    let mut used: HashSet<String> = HashSet::new();

    for input in inputs {
        if cancel.load(Ordering::Relaxed) {
            return Err(ArchiveError::Cancelled);
        }

        let input = walker::absolute(input).map_err(ArchiveError::Input)?;
        let meta = fs::metadata(&input).map_err(|e| ArchiveError::Input(FsError::from_io(&input, e)))?;
        let root = unique_entry_name(&root_entry_name(&input), meta.is_dir(), &mut used);

        if !meta.is_dir() {
            plan.entries.push(PlannedEntry::File {
                source: input,
                name: root,
                size: meta.len(),
            });
            continue;
        }

        let outcome = walker::list_all_files_with(&input, walk).map_err(ArchiveError::Input)?;
        plan.warnings.extend(outcome.warnings);

        if outcome.files.is_empty() {
            debug!("{} has no visible files, storing it empty", input.display());
            plan.entries.push(PlannedEntry::Directory {
                name: format!("{root}/"),
            });
            continue;
        }

        for file in outcome.files {
            let Some(relative) = entry_suffix(&input, file.path()) else {
                debug!("{} is outside {}, skipped", file.path().display(), input.display());
                continue;
            };
            plan.entries.push(PlannedEntry::File {
                name: format!("{root}/{relative}"),
                size: file.size().unwrap_or(0),
                source: file.path().to_path_buf(),
            });
        }
    }

    if plan.entries.is_empty() {
        return Err(ArchiveError::EmptySelection);
    }
    Ok(plan)
}

/// `path` relative to `base`, joined with `/` as zip names require.
fn entry_suffix(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Option<_>>()?;
    (!parts.is_empty()).then(|| parts.join("/"))
}
