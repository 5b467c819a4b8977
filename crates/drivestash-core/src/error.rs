//! Error types for `drivestash-core`.
//!
//! Each concern gets its own enum so callers can match on exactly the
//! failures an operation can produce. `Display` carries the raw cause for
//! diagnostic logs; [`user_message`](FsError::user_message) gives the short
//! text that is safe to show to an end user.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Filesystem failures raised by the walker and size probes.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The path vanished between being referenced and being accessed.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// The process lacks permission to access the path.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A directory was expected but the path points to something else.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error that doesn't fit a more specific variant.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an `io::Error` raised while accessing `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// The path the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::NotADirectory(p) => p,
            Self::Io { path, .. } => path,
        }
    }

    /// Short message for the presentation layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "The item no longer exists.",
            Self::PermissionDenied(_) => "Access to this item was denied.",
            Self::NotADirectory(_) => "This item is not a folder.",
            Self::Io { .. } => "The item could not be read.",
        }
    }
}

/// Failures of the external device/drive enumeration commands.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The OS family has no enumeration command. No process was started.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The command could not be started at all.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command ran but exited unsuccessfully.
    #[error("`{command}` exited with {}: {stderr}", describe_exit(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The command did not exit within the configured timeout and was killed.
    #[error("`{command}` did not finish within {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

impl ProbeError {
    /// Short message for the presentation layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform(_) => "Device listing is not supported on this system.",
            Self::Spawn { .. } | Self::Failed { .. } | Self::TimedOut { .. } => {
                "The device list is unavailable."
            }
        }
    }
}

/// Failures of an archive job. Any of these abandons the job.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Another archive job from the same builder is still running.
    #[error("an archive job is already running")]
    Busy,

    /// Nothing was selected, or every input expanded to zero entries.
    #[error("no files selected for the archive")]
    EmptySelection,

    /// The destination directory is missing or unusable.
    #[error("invalid destination: {0}")]
    Destination(#[source] FsError),

    /// A selected input vanished or could not be read.
    #[error("cannot read input: {0}")]
    Input(#[source] FsError),

    /// Writing the container file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The zip writer rejected an entry or failed to finalise.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The job was cancelled; the partial container was discarded.
    #[error("archive cancelled")]
    Cancelled,

    /// The worker thread could not be started.
    #[error("failed to spawn archive worker: {0}")]
    Spawn(#[source] io::Error),

    /// The worker thread panicked before reporting a result.
    #[error("archive worker panicked")]
    WorkerPanicked,
}

impl ArchiveError {
    /// Short message for the presentation layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Busy => "An export is already in progress.",
            Self::EmptySelection => "Select at least one file to export.",
            Self::Destination(_) => "The export folder cannot be used.",
            Self::Input(_) => "A selected item could not be read.",
            Self::Io { .. } | Self::Zip(_) | Self::Spawn(_) | Self::WorkerPanicked => {
                "The zip file could not be created."
            }
            Self::Cancelled => "The export was cancelled.",
        }
    }
}

/// Failures while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Short message for the presentation layer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Read { .. } => "The settings file could not be read.",
            Self::Parse { .. } | Self::Invalid(_) => "The settings file is not valid.",
        }
    }
}
