/// Archive module: writes a selection into one zip container in the background.
///
/// A job runs on its own thread in three steps:
/// 1. **Plan:** expand the selection into zip entries (`plan.rs`).
/// 2. **Write:** stream the entries through deflate (`writer.rs`).
/// 3. **Report:** one terminal message, `Complete` or `Failed`.
///
/// Callers watch a job through an [`ArchiveHandle`]: a bounded progress
/// channel, a shared [`ArchiveJob`] snapshot, and a cancel flag. An
/// [`ArchiveBuilder`] runs at most one job at a time.
pub mod naming;
mod plan;
pub mod progress;
mod writer;

pub use progress::{ArchiveProgress, ProgressTracker};

use crate::config::Config;
use crate::error::ArchiveError;
use crate::walker::WalkOptions;
use chrono::Local;
use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use progress::ProgressSink;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// Lifecycle of an archive job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Running,
    Completed,
    Failed,
}

/// Snapshot of a running or finished job, readable while it runs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveJob {
    /// The container being written.
    pub destination: PathBuf,
    pub inputs: Vec<PathBuf>,
    /// Estimated from the planned entries; `None` until planning is done.
    pub total_bytes: Option<u64>,
    pub processed_bytes: u64,
    pub state: JobState,
}

impl ArchiveJob {
    fn new(destination: PathBuf, inputs: Vec<PathBuf>) -> Self {
        Self {
            destination,
            inputs,
            total_bytes: None,
            processed_bytes: 0,
            state: JobState::Running,
        }
    }

    /// Set the processed count, never past the planned total. Files that
    /// grew after planning write more bytes than were counted.
    fn record_processed(&mut self, bytes: u64) {
        self.processed_bytes = match self.total_bytes {
            Some(total) => bytes.min(total),
            None => bytes,
        };
    }
}

/// A job snapshot shared between the worker (writer) and callers (readers).
pub type SharedJob = Arc<RwLock<ArchiveJob>>;

/// Settings that shape every job started by a builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub compression_level: i64,
    pub file_prefix: String,
    pub progress_capacity: usize,
    pub remove_partial_on_failure: bool,
    pub walk: WalkOptions,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ArchiveOptions {
    fn from(config: &Config) -> Self {
        Self {
            compression_level: config.archive.compression_level,
            file_prefix: config.archive.file_prefix.clone(),
            progress_capacity: config.archive.progress_capacity.max(1),
            remove_partial_on_failure: config.archive.remove_partial_on_failure,
            walk: config.walk.options(),
        }
    }
}

/// Handle to a running or completed archive job.
#[derive(Debug)]
pub struct ArchiveHandle {
    /// Progress updates from the worker, ending with one terminal message.
    pub progress_rx: Receiver<ArchiveProgress>,
    /// Live job snapshot.
    pub job: SharedJob,
    destination: PathBuf,
    cancel_flag: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<PathBuf, ArchiveError>>>,
}

impl ArchiveHandle {
    /// Path of the container this job writes.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Request the job to stop. The partial container is deleted.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, thread::JoinHandle::is_finished)
    }

    /// Block until the job ends and return the container path.
    ///
    /// Consumes the handle. Undrained progress messages are discarded.
    ///
    /// # Errors
    ///
    /// Whatever ended the job, or [`ArchiveError::WorkerPanicked`].
    pub fn wait(self) -> Result<PathBuf, ArchiveError> {
        let Self {
            progress_rx,
            thread,
            destination,
            ..
        } = self;
        // Unblocks a worker stuck delivering its terminal message.
        drop(progress_rx);
        match thread {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(ArchiveError::WorkerPanicked)),
            None => Ok(destination),
        }
    }
}

/// Starts archive jobs, one at a time.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    options: ArchiveOptions,
    active: Arc<AtomicBool>,
}

impl ArchiveBuilder {
    pub fn new(options: ArchiveOptions) -> Self {
        Self {
            options,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// `true` while a job started by this builder (or a clone) is running.
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Archive `inputs` into a new container inside `destination_dir`.
    ///
    /// The container file is created before this returns, so its name is
    /// known up front; everything else happens on a worker thread.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::EmptySelection`] if `inputs` is empty.
    /// - [`ArchiveError::Busy`] if a job is already running.
    /// - [`ArchiveError::Destination`] if the directory cannot be used.
    /// - [`ArchiveError::Spawn`] if the worker cannot be started.
    pub fn start(
        &self,
        destination_dir: &Path,
        inputs: Vec<PathBuf>,
    ) -> Result<ArchiveHandle, ArchiveError> {
        if inputs.is_empty() {
            return Err(ArchiveError::EmptySelection);
        }
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ArchiveError::Busy);
        }
        let guard = ActiveGuard(self.active.clone());

        let (destination, file) =
            naming::create_destination(destination_dir, &self.options.file_prefix, &Local::now())?;

        let (progress_tx, progress_rx) =
            crossbeam_channel::bounded::<ArchiveProgress>(self.options.progress_capacity);
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let job: SharedJob = Arc::new(RwLock::new(ArchiveJob::new(
            destination.clone(),
            inputs.clone(),
        )));

        let worker = Worker {
            file,
            destination: destination.clone(),
            inputs,
            options: self.options.clone(),
            sink: ProgressSink::new(progress_tx),
            cancel: cancel_flag.clone(),
            job: job.clone(),
        };

        let spawned = thread::Builder::new()
            .name("drivestash-archiver".into())
            .spawn(move || {
                let _guard = guard;
                worker.run()
            });

        match spawned {
            Ok(thread) => Ok(ArchiveHandle {
                progress_rx,
                job,
                destination,
                cancel_flag,
                thread: Some(thread),
            }),
            Err(e) => {
                // The closure, the open file and the guard were dropped with it.
                let _ = fs::remove_file(&destination);
                Err(ArchiveError::Spawn(e))
            }
        }
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new(ArchiveOptions::default())
    }
}

/// Clears the builder's busy flag when the worker exits, even on panic.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Everything one job owns on its worker thread.
struct Worker {
    file: File,
    destination: PathBuf,
    inputs: Vec<PathBuf>,
    options: ArchiveOptions,
    sink: ProgressSink,
    cancel: Arc<AtomicBool>,
    job: SharedJob,
}

impl Worker {
    fn run(self) -> Result<PathBuf, ArchiveError> {
        info!(
            "Archiving {} item(s) into {}",
            self.inputs.len(),
            self.destination.display()
        );
        let started = Instant::now();
        let Self {
            file,
            destination,
            inputs,
            options,
            sink,
            cancel,
            job,
        } = self;

        let result = plan::build_plan(&inputs, &options.walk, &cancel).and_then(|plan| {
            let mut tracker = ProgressTracker::new(plan.total_bytes());
            job.write().total_bytes = Some(tracker.total());
            sink.deliver(ArchiveProgress::Started {
                destination: destination.clone(),
                total_files: plan.file_count(),
                total_bytes: tracker.total(),
            });
            for warning in &plan.warnings {
                sink.update(ArchiveProgress::Warning {
                    path: warning.path.display().to_string(),
                    message: warning.message.clone(),
                });
            }
            if let Some(p) = tracker.start() {
                sink.update(ArchiveProgress::Percent(p));
            }

            let stats = writer::write_zip(
                file,
                &destination,
                &plan,
                options.compression_level,
                &cancel,
                |bytes| {
                    if let Some(p) = tracker.advance(bytes) {
                        sink.update(ArchiveProgress::Percent(p));
                    }
                    job.write().record_processed(tracker.processed());
                },
            )?;

            if let Some(p) = tracker.finish() {
                sink.deliver(ArchiveProgress::Percent(p));
            }
            Ok(stats)
        });

        match result {
            Ok(stats) => {
                let duration = started.elapsed();
                {
                    let mut job = job.write();
                    job.record_processed(stats.bytes);
                    job.state = JobState::Completed;
                }
                info!(
                    "Archive complete: {} files, {} bytes in {:.2?} -> {}",
                    stats.files,
                    stats.bytes,
                    duration,
                    destination.display()
                );
                sink.deliver(ArchiveProgress::Complete {
                    path: destination.clone(),
                    files: stats.files,
                    bytes: stats.bytes,
                    duration,
                });
                Ok(destination)
            }
            Err(err) => {
                job.write().state = JobState::Failed;
                let cancelled = matches!(err, ArchiveError::Cancelled);
                if cancelled {
                    info!("Archive of {} cancelled", destination.display());
                } else {
                    warn!("Archive of {} failed: {err}", destination.display());
                }
                if cancelled || options.remove_partial_on_failure {
                    remove_partial(&destination);
                }
                sink.deliver(ArchiveProgress::Failed {
                    message: err.user_message(),
                    detail: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove partial archive {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ArchiveJob {
        ArchiveJob::new(PathBuf::from("/tmp/out.zip"), vec![PathBuf::from("/tmp/a")])
    }

    #[test]
    fn processed_never_exceeds_planned_total() {
        let mut job = job();
        job.total_bytes = Some(100);
        job.record_processed(40);
        assert_eq!(job.processed_bytes, 40);
        // The source grew after planning.
        job.record_processed(130);
        assert_eq!(job.processed_bytes, 100);
    }

    #[test]
    fn processed_is_unbounded_before_planning() {
        let mut job = job();
        job.record_processed(500);
        assert_eq!(job.processed_bytes, 500);
    }

    #[test]
    fn options_follow_config() {
        let mut config = Config::default();
        config.archive.compression_level = 0;
        config.archive.file_prefix = "backup".into();
        let options = ArchiveOptions::from(&config);
        assert_eq!(options.compression_level, 0);
        assert_eq!(options.file_prefix, "backup");
    }
}
