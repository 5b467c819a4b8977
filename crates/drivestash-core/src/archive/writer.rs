/// Streams an [`ArchivePlan`] into a deflate-compressed zip container.
///
/// Inputs are copied in fixed-size chunks rather than with `io::copy` so
/// that progress can be reported, and cancellation observed, between
/// chunks of a large file.
use super::plan::{ArchivePlan, PlannedEntry};
use crate::error::{ArchiveError, FsError};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Read buffer size, and the granularity of progress callbacks.
const CHUNK_SIZE: usize = 256 * 1024;

/// Entries at or above this size need zip64 headers.
const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

/// Counters for a finished container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WriteStats {
    pub files: u64,
    pub bytes: u64,
}

/// Write every planned entry into `file`, then finalise the container.
///
/// `on_bytes` is called with the size of each chunk after it has been
/// handed to the compressor.
///
/// # Errors
///
/// - [`ArchiveError::Input`] if a source file cannot be opened or read.
/// - [`ArchiveError::Io`] / [`ArchiveError::Zip`] on write failures.
/// - [`ArchiveError::Cancelled`] once `cancel` is observed.
pub(crate) fn write_zip(
    file: File,
    destination: &Path,
    plan: &ArchivePlan,
    compression_level: i64,
    cancel: &AtomicBool,
    mut on_bytes: impl FnMut(u64),
) -> Result<WriteStats, ArchiveError> {
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = entry_options(compression_level);

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut stats = WriteStats::default();
    let write_error = |source: io::Error| ArchiveError::Io {
        path: destination.to_path_buf(),
        source,
    };

    for entry in &plan.entries {
        check_cancel(cancel)?;

        let (source_path, name, size) = match entry {
            PlannedEntry::Directory { name } => {
                writer.add_directory(name.as_str(), options)?;
                continue;
            }
            PlannedEntry::File { source, name, size } => (source, name, *size),
        };

        let mut source = File::open(source_path)
            .map_err(|e| ArchiveError::Input(FsError::from_io(source_path, e)))?;
        let entry_options = match unix_mode(&source) {
            Some(mode) => options.unix_permissions(mode),
            None => options,
        }
        .large_file(size >= LARGE_FILE_THRESHOLD);

        writer.start_file(name.as_str(), entry_options)?;
        trace!("adding {name}");

        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ArchiveError::Input(FsError::from_io(source_path, e))),
            };
            writer.write_all(&buf[..n]).map_err(write_error)?;
            stats.bytes += n as u64;
            on_bytes(n as u64);
            check_cancel(cancel)?;
        }
        stats.files += 1;
    }

    let mut inner = writer.finish()?;
    inner.flush().map_err(write_error)?;
    inner.get_ref().sync_all().map_err(write_error)?;
    Ok(stats)
}

/// Deflate at `level`, or plain storage for level 0, which deflate rejects.
fn entry_options(level: i64) -> SimpleFileOptions {
    if level <= 0 {
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
    } else {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(level))
    }
}

fn check_cancel(cancel: &AtomicBool) -> Result<(), ArchiveError> {
    if cancel.load(Ordering::Relaxed) {
        Err(ArchiveError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(unix)]
fn unix_mode(file: &File) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    file.metadata().ok().map(|m| m.permissions().mode())
}

#[cfg(not(unix))]
fn unix_mode(_file: &File) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entry(source: &Path, name: &str) -> PlannedEntry {
        PlannedEntry::File {
            source: source.to_path_buf(),
            name: name.to_string(),
            size: fs::metadata(source).unwrap().len(),
        }
    }

    #[test]
    fn writes_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"hello zip").unwrap();
        let out = tmp.path().join("out.zip");

        let plan = ArchivePlan {
            entries: vec![
                entry(&src, "a.txt"),
                PlannedEntry::Directory {
                    name: "empty/".into(),
                },
            ],
            warnings: Vec::new(),
        };

        let mut seen = 0;
        let stats = write_zip(
            File::create(&out).unwrap(),
            &out,
            &plan,
            6,
            &AtomicBool::new(false),
            |n| seen += n,
        )
        .unwrap();
        assert_eq!(stats, WriteStats { files: 1, bytes: 9 });
        assert_eq!(seen, 9);

        let mut zip = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        let mut content = String::new();
        zip.by_name("a.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello zip");
        assert!(zip.by_name("empty/").unwrap().is_dir());
    }

    #[test]
    fn cancel_before_start_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"x").unwrap();
        let out = tmp.path().join("out.zip");
        let plan = ArchivePlan {
            entries: vec![entry(&src, "a.txt")],
            warnings: Vec::new(),
        };

        let err = write_zip(
            File::create(&out).unwrap(),
            &out,
            &plan,
            6,
            &AtomicBool::new(true),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::Cancelled));
    }

    #[test]
    fn vanished_source_is_input_error() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.zip");
        let plan = ArchivePlan {
            entries: vec![PlannedEntry::File {
                source: tmp.path().join("gone.txt"),
                name: "gone.txt".into(),
                size: 3,
            }],
            warnings: Vec::new(),
        };

        let err = write_zip(
            File::create(&out).unwrap(),
            &out,
            &plan,
            6,
            &AtomicBool::new(false),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::Input(FsError::NotFound(_))));
    }
}
