/// Command handlers: each one runs a core operation and prints the result
/// as plain text or, with `json`, as a single JSON document on `out`.
///
/// Failures are reported with their short user-facing message; the raw
/// cause goes to the log.
use crate::format::{format_duration, format_size, progress_bar};
use crate::state::{SessionPhase, SessionState};
use anyhow::{bail, Result};
use drivestash_core::archive::{ArchiveBuilder, ArchiveOptions};
use drivestash_core::config::Config;
use drivestash_core::model::{DeviceDescriptor, FileEntry};
use drivestash_core::platform::{DeviceProbe, PlatformProbe};
use drivestash_core::walker;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::warn;

/// How often a running export is polled for progress.
const ARCHIVE_TICK: Duration = Duration::from_millis(50);

/// Which devices a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Fixed roots only (`roots`).
    Fixed,
    /// Fixed roots and removable devices (`devices`).
    All,
}

#[derive(Serialize)]
struct DeviceReport<'a> {
    devices: &'a [DeviceDescriptor],
    failures: &'a [&'static str],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalkReport<'a> {
    files: &'a [FileEntry],
    warnings: Vec<WarningReport>,
    total_bytes: u64,
}

#[derive(Serialize)]
struct WarningReport {
    path: String,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SizeReport {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveReport<'a> {
    path: &'a Path,
    files: u64,
    bytes: u64,
    duration_ms: u128,
    warnings: Vec<WarningReport>,
}

/// `roots` / `devices` against the running OS.
pub fn devices(
    config: &Config,
    filter: DeviceFilter,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let probe = match PlatformProbe::system(config.probe.timeout()) {
        Ok(p) => p,
        Err(err) => {
            warn!("{err}");
            bail!(err.user_message());
        }
    };
    print_devices(&probe, filter, json, out)
}

/// Enumerate through `probe` and print the result. Probe failures are
/// listed after the devices; they do not fail the command.
///
/// `Fixed` only runs the fixed-root probe.
pub fn print_devices(
    probe: &dyn DeviceProbe,
    filter: DeviceFilter,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let (devices, failures) = match filter {
        DeviceFilter::Fixed => match probe.list_fixed_roots() {
            Ok(roots) => (
                roots.into_iter().map(DeviceDescriptor::fixed).collect(),
                Vec::new(),
            ),
            Err(err) => {
                warn!("fixed root probe failed: {err}");
                (Vec::new(), vec![err.user_message()])
            }
        },
        DeviceFilter::All => {
            let mut state = SessionState::default();
            state.load_roots(probe);
            (state.roots, state.probe_failures)
        }
    };

    if json {
        let report = DeviceReport {
            devices: &devices,
            failures: &failures,
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    for device in &devices {
        match filter {
            DeviceFilter::Fixed => writeln!(out, "{}", device.identifier)?,
            DeviceFilter::All => writeln!(out, "{:<10} {}", device.kind.label(), device.identifier)?,
        }
    }
    for failure in &failures {
        writeln!(out, "! {failure}")?;
    }
    Ok(())
}

/// `ls`: one directory level, directories first, optionally filtered by name.
pub fn ls(dir: &Path, filter: Option<&str>, json: bool, out: &mut impl Write) -> Result<()> {
    let mut state = SessionState::default();
    if let Err(err) = state.open(dir) {
        warn!("{err}");
        bail!(err.user_message());
    }
    let entries = state.filtered_entries(filter.unwrap_or_default());

    if json {
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }
    for entry in entries {
        if entry.is_directory() {
            writeln!(out, "{}/", entry.name())?;
        } else {
            writeln!(out, "{}", entry.name())?;
        }
    }
    Ok(())
}

/// `files`: every visible file below `dir`, with sizes and a total.
pub fn files(config: &Config, dir: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let outcome = match walker::list_all_files_with(dir, &config.walk.options()) {
        Ok(o) => o,
        Err(err) => {
            warn!("{err}");
            bail!(err.user_message());
        }
    };
    let warnings: Vec<WarningReport> = outcome
        .warnings
        .iter()
        .map(|w| WarningReport {
            path: w.path.display().to_string(),
            message: w.message.clone(),
        })
        .collect();

    if json {
        let report = WalkReport {
            files: &outcome.files,
            warnings,
            total_bytes: outcome.total_size(),
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    for file in &outcome.files {
        writeln!(
            out,
            "{:>10}  {}",
            format_size(file.size().unwrap_or(0)),
            file.path().display()
        )?;
    }
    writeln!(
        out,
        "{} files, {}",
        outcome.files.len(),
        format_size(outcome.total_size())
    )?;
    if !warnings.is_empty() {
        writeln!(out, "{} location(s) skipped", warnings.len())?;
    }
    Ok(())
}

/// `size`: stat each path. A path that cannot be read is reported inline.
pub fn size(paths: &[PathBuf], json: bool, out: &mut impl Write) -> Result<()> {
    let reports: Vec<SizeReport> = paths
        .iter()
        .zip(walker::stat_sizes(paths))
        .map(|(path, result)| match result {
            Ok(size) => SizeReport {
                path: path.clone(),
                size: Some(size),
                error: None,
            },
            Err(err) => {
                warn!("{err}");
                SizeReport {
                    path: path.clone(),
                    size: None,
                    error: Some(err.user_message()),
                }
            }
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &reports)?;
        writeln!(out)?;
        return Ok(());
    }
    for report in &reports {
        match (report.size, report.error) {
            (Some(size), _) => writeln!(out, "{:>10}  {}", format_size(size), report.path.display())?,
            (None, Some(message)) => {
                writeln!(out, "{:>10}  {}  ({message})", "!", report.path.display())?
            }
            (None, None) => {}
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DigestReport {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha512: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

/// `hash`: SHA-512 of each file, in the `sha512sum` layout.
pub fn hash(paths: &[PathBuf], json: bool, out: &mut impl Write) -> Result<()> {
    let reports: Vec<DigestReport> = paths
        .iter()
        .zip(walker::file_digests(paths))
        .map(|(path, result)| match result {
            Ok(digest) => DigestReport {
                path: path.clone(),
                sha512: Some(digest),
                error: None,
            },
            Err(err) => {
                warn!("{err}");
                DigestReport {
                    path: path.clone(),
                    sha512: None,
                    error: Some(err.user_message()),
                }
            }
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &reports)?;
        writeln!(out)?;
        return Ok(());
    }
    for report in &reports {
        match (&report.sha512, report.error) {
            (Some(digest), _) => writeln!(out, "{digest}  {}", report.path.display())?,
            (None, Some(message)) => writeln!(out, "!  {}  ({message})", report.path.display())?,
            (None, None) => {}
        }
    }
    Ok(())
}

/// `archive`: export `inputs` into a new container in `dest`.
///
/// Progress goes to `progress` (a terminal, usually stderr); the result goes
/// to `out`.
pub fn archive(
    config: &Config,
    dest: &Path,
    inputs: &[PathBuf],
    json: bool,
    out: &mut impl Write,
    progress: &mut impl Write,
) -> Result<()> {
    let mut state = SessionState::new(ArchiveBuilder::new(ArchiveOptions::from(config)));
    let added = state.add_dropped(inputs);
    if added < inputs.len() {
        writeln!(
            progress,
            "{} of {} path(s) were missing or repeated and were skipped",
            inputs.len() - added,
            inputs.len()
        )?;
    }

    let destination = match state.start_archive(dest) {
        Ok(p) => p,
        Err(err) => {
            warn!("{err}");
            bail!(err.user_message());
        }
    };
    if !json {
        writeln!(progress, "Writing {}", destination.display())?;
    }

    let mut shown: Option<u8> = None;
    let mut warnings_shown = 0;
    while state.phase == SessionPhase::Archiving {
        if !state.process_archive_messages() {
            thread::sleep(ARCHIVE_TICK);
            continue;
        }
        for (path, message) in &state.archive_warnings[warnings_shown..] {
            writeln!(progress, "warning: skipped {path}: {message}")?;
        }
        warnings_shown = state.archive_warnings.len();
        if !json && shown != Some(state.archive_percent) {
            shown = Some(state.archive_percent);
            write!(progress, "\r{}", progress_bar(state.archive_percent))?;
            progress.flush()?;
        }
    }
    if shown.is_some() {
        writeln!(progress)?;
    }

    let Some(path) = state.last_archive.as_deref() else {
        bail!(state.last_error.unwrap_or("The zip file could not be created."));
    };
    let duration = state.archive_duration.unwrap_or_default();

    if json {
        let report = ArchiveReport {
            path,
            files: state.archive_files,
            bytes: state.archive_bytes,
            duration_ms: duration.as_millis(),
            warnings: state
                .archive_warnings
                .iter()
                .map(|(path, message)| WarningReport {
                    path: path.clone(),
                    message: message.clone(),
                })
                .collect(),
        };
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(
        out,
        "{} ({} files, {} in {})",
        path.display(),
        state.archive_files,
        format_size(state.archive_bytes),
        format_duration(duration)
    )?;
    Ok(())
}
