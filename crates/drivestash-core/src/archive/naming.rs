/// Names on both sides of the archive: the container file in the
/// destination directory, and the top-level entry names inside it.
use crate::error::{ArchiveError, FsError};
use crate::model::display_name;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Timestamp embedded in archive file names.
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Attempts before giving up on finding a free file name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Fallback entry name for inputs with no usable base name (`/`, `C:\`).
const ROOT_ENTRY_NAME: &str = "root";

/// `<prefix>-<YYYYmmdd-HHMMSS>.zip`, with `-<attempt>` appended before the
/// extension from the second attempt on.
pub fn archive_file_name(prefix: &str, stamp: &DateTime<Local>, attempt: u32) -> String {
    let base = format!("{prefix}-{}", stamp.format(STAMP_FORMAT));
    if attempt <= 1 {
        format!("{base}.zip")
    } else {
        format!("{base}-{attempt}.zip")
    }
}

/// Create a fresh archive file inside `dir`.
///
/// The file is opened with `create_new`, so an existing file is never
/// truncated: on a name clash the next suffix is tried instead.
///
/// # Errors
///
/// [`ArchiveError::Destination`] if `dir` is missing, not a directory, or
/// not writable.
pub fn create_destination(
    dir: &Path,
    prefix: &str,
    stamp: &DateTime<Local>,
) -> Result<(PathBuf, File), ArchiveError> {
    let dir = crate::walker::absolute(dir).map_err(ArchiveError::Destination)?;
    let meta = fs::metadata(&dir).map_err(|e| ArchiveError::Destination(FsError::from_io(&dir, e)))?;
    if !meta.is_dir() {
        return Err(ArchiveError::Destination(FsError::NotADirectory(dir)));
    }

    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let path = dir.join(archive_file_name(prefix, stamp, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ArchiveError::Destination(FsError::from_io(&path, e))),
        }
    }

    Err(ArchiveError::Io {
        path: dir,
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free archive file name"),
    })
}

/// Entry name for a selected input: its base name with path separators and
/// drive colons removed.
pub fn root_entry_name(input: &Path) -> String {
    let cleaned: String = display_name(input)
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':'))
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => ROOT_ENTRY_NAME.to_string(),
        name => name.to_string(),
    }
}

/// Claim `wanted` in `used`, or the first free `-2`, `-3`, ... variant.
///
/// File names keep their extension last (`report-2.txt`); directory names
/// take the suffix at the end (`docs-2`).
pub fn unique_entry_name(wanted: &str, is_directory: bool, used: &mut HashSet<String>) -> String {
    if used.insert(wanted.to_string()) {
        return wanted.to_string();
    }

    let (stem, ext) = match wanted.rsplit_once('.') {
        Some((stem, ext)) if !is_directory && !stem.is_empty() => (stem, Some(ext)),
        _ => (wanted, None),
    };

    let mut n = 2u32;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
