/// Session state management.
///
/// Centralises the mutable state a frontend reads and writes while a user
/// browses, builds up a selection, and exports it. The archive thread
/// communicates via its progress channel; state updates happen in
/// `process_archive_messages()`, which the frontend calls once per tick.
use crossbeam_channel::{Receiver, TryRecvError};
use drivestash_core::archive::{ArchiveBuilder, ArchiveHandle, ArchiveJob, ArchiveProgress};
use drivestash_core::error::{ArchiveError, FsError};
use drivestash_core::model::{DeviceDescriptor, FileEntry};
use drivestash_core::platform::{enumerate_devices, DeviceProbe};
use drivestash_core::selection::{ChooserOutcome, PendingSelection};
use drivestash_core::walker;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// The current phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Browsing and selecting; no export running.
    Browsing,
    /// An export is running.
    Archiving,
    /// The last export finished (successfully or not).
    Done,
}

/// Maximum progress messages drained per tick.
///
/// Keeps one tick short even if the frontend fell behind.
const MAX_MESSAGES_PER_TICK: usize = 256;

/// Maximum archive warnings kept for display.
const MAX_WARNINGS: usize = 1000;

/// All session state.
pub struct SessionState {
    // ── Devices ────────────────────────────────────────
    pub roots: Vec<DeviceDescriptor>,
    /// User-facing messages for device probes that failed.
    pub probe_failures: Vec<&'static str>,

    // ── Browsing ───────────────────────────────────────
    pub current_dir: Option<PathBuf>,
    /// Current listing, directories first, then by name.
    pub listing: Vec<FileEntry>,
    /// Paths of the current listing ticked for adding.
    pub checked: HashSet<PathBuf>,

    // ── Selection ──────────────────────────────────────
    pub selection: PendingSelection,

    // ── Export ─────────────────────────────────────────
    pub phase: SessionPhase,
    builder: ArchiveBuilder,
    archive_handle: Option<ArchiveHandle>,
    pub archive_percent: u8,
    pub archive_total_bytes: u64,
    pub archive_files: u64,
    pub archive_bytes: u64,
    pub archive_warnings: Vec<(String, String)>,
    pub archive_duration: Option<Duration>,
    /// Container written by the last successful export.
    pub last_archive: Option<PathBuf>,

    /// Last user-facing error, cleared by the next successful action.
    pub last_error: Option<&'static str>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(ArchiveBuilder::default())
    }
}

impl SessionState {
    pub fn new(builder: ArchiveBuilder) -> Self {
        Self {
            roots: Vec::new(),
            probe_failures: Vec::new(),
            current_dir: None,
            listing: Vec::new(),
            checked: HashSet::new(),
            selection: PendingSelection::new(),
            phase: SessionPhase::Browsing,
            builder,
            archive_handle: None,
            archive_percent: 0,
            archive_total_bytes: 0,
            archive_files: 0,
            archive_bytes: 0,
            archive_warnings: Vec::new(),
            archive_duration: None,
            last_archive: None,
            last_error: None,
        }
    }

    /// Refresh the device list. Failed probes shorten the list and are
    /// recorded in `probe_failures`.
    pub fn load_roots(&mut self, probe: &dyn DeviceProbe) {
        let inventory = enumerate_devices(probe);
        self.roots = inventory.devices;
        self.probe_failures = inventory
            .failures
            .iter()
            .map(|e| e.user_message())
            .collect();
    }

    /// List `dir` and make it the current directory.
    ///
    /// On failure the previous listing is kept and `last_error` is set.
    pub fn open(&mut self, dir: &Path) -> Result<(), FsError> {
        match walker::list_children(dir) {
            Ok(mut entries) => {
                sort_for_display(&mut entries);
                self.current_dir = std::path::absolute(dir).ok();
                self.listing = entries;
                self.checked.clear();
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Start browsing at a probed root.
    pub fn open_device(&mut self, device: &DeviceDescriptor) -> Result<(), FsError> {
        self.open(&device.browse_path())
    }

    /// Open the parent of the current directory. `Ok(false)` at a root.
    pub fn go_up(&mut self) -> Result<bool, FsError> {
        let Some(parent) = self
            .current_dir
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
        else {
            return Ok(false);
        };
        self.open(&parent)?;
        Ok(true)
    }

    /// Tick or untick an entry of the current listing. Returns whether it is
    /// now checked; paths outside the listing are ignored.
    pub fn toggle_check(&mut self, path: &Path) -> bool {
        if !self.listing.iter().any(|e| e.path() == path) {
            return false;
        }
        if self.checked.remove(path) {
            false
        } else {
            self.checked.insert(path.to_path_buf());
            true
        }
    }

    /// Move the checked entries of the current listing into the selection
    /// and resolve their sizes. Returns how many were new.
    pub fn add_checked(&mut self) -> usize {
        let picked: Vec<FileEntry> = self
            .listing
            .iter()
            .filter(|e| self.checked.contains(e.path()))
            .cloned()
            .collect();
        self.checked.clear();
        let added = self.selection.add(picked);
        self.selection.resolve_sizes();
        added
    }

    /// Add paths dropped onto the session.
    pub fn add_dropped<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let added = self.selection.add_paths(paths);
        self.selection.resolve_sizes();
        added
    }

    /// Add what a file chooser returned.
    pub fn add_chosen(&mut self, outcome: ChooserOutcome) -> usize {
        let added = self.selection.add_chosen(outcome);
        self.selection.resolve_sizes();
        added
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.selection.remove(path)
    }

    /// Entries of the current listing whose name contains `text`, ignoring
    /// case. An empty filter matches everything.
    pub fn filtered_entries(&self, text: &str) -> Vec<&FileEntry> {
        let needle = text.trim().to_lowercase();
        self.listing
            .iter()
            .filter(|e| needle.is_empty() || e.name().to_lowercase().contains(&needle))
            .collect()
    }

    /// Export the selection into `destination_dir`. Returns the container
    /// path that will be written.
    pub fn start_archive(&mut self, destination_dir: &Path) -> Result<PathBuf, ArchiveError> {
        let handle = match self.builder.start(destination_dir, self.selection.paths()) {
            Ok(h) => h,
            Err(err) => {
                self.last_error = Some(err.user_message());
                return Err(err);
            }
        };

        self.phase = SessionPhase::Archiving;
        self.archive_percent = 0;
        self.archive_total_bytes = 0;
        self.archive_files = 0;
        self.archive_bytes = 0;
        self.archive_warnings.clear();
        self.archive_duration = None;
        self.last_error = None;

        let destination = handle.destination().to_path_buf();
        self.archive_handle = Some(handle);
        Ok(destination)
    }

    /// Cancel any running export.
    pub fn cancel_archive(&self) {
        if let Some(ref handle) = self.archive_handle {
            handle.cancel();
        }
    }

    /// Snapshot of the running export, if any.
    pub fn archive_job(&self) -> Option<ArchiveJob> {
        self.archive_handle.as_ref().map(|h| h.job.read().clone())
    }

    /// Process pending export progress. Called once per tick.
    ///
    /// Returns `true` if anything changed.
    pub fn process_archive_messages(&mut self) -> bool {
        let rx = match &self.archive_handle {
            Some(h) => h.progress_rx.clone(),
            None => return false,
        };
        self.drain_progress(&rx)
    }

    fn drain_progress(&mut self, rx: &Receiver<ArchiveProgress>) -> bool {
        let mut changed = false;
        let mut drained = 0usize;
        while drained < MAX_MESSAGES_PER_TICK {
            let msg = match rx.try_recv() {
                Ok(m) => m,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("export worker exited without reporting a result");
                    self.last_error = Some(ArchiveError::WorkerPanicked.user_message());
                    self.phase = SessionPhase::Done;
                    self.archive_handle = None;
                    return true;
                }
            };
            drained += 1;
            changed = true;
            match msg {
                ArchiveProgress::Started { total_bytes, .. } => {
                    self.archive_total_bytes = total_bytes;
                }
                ArchiveProgress::Percent(p) => {
                    self.archive_percent = self.archive_percent.max(p);
                }
                ArchiveProgress::Warning { path, message } => {
                    if self.archive_warnings.len() < MAX_WARNINGS {
                        self.archive_warnings.push((path, message));
                    }
                }
                ArchiveProgress::Complete {
                    path,
                    files,
                    bytes,
                    duration,
                } => {
                    debug!("export finished: {}", path.display());
                    self.archive_percent = 100;
                    self.archive_files = files;
                    self.archive_bytes = bytes;
                    self.archive_duration = Some(duration);
                    self.last_archive = Some(path);
                    self.selection.clear();
                    self.phase = SessionPhase::Done;
                    self.archive_handle = None;
                    return true;
                }
                ArchiveProgress::Failed { message, detail } => {
                    debug!("export failed: {detail}");
                    self.last_error = Some(message);
                    self.phase = SessionPhase::Done;
                    self.archive_handle = None;
                    return true;
                }
            }
        }
        changed
    }
}

/// Directories first, then case-insensitive by name.
fn sort_for_display(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        b.is_directory()
            .cmp(&a.is_directory())
            .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn browse(tmp: &TempDir) -> SessionState {
        fs::create_dir(tmp.path().join("Zeta")).unwrap();
        fs::write(tmp.path().join("alpha.txt"), b"aa").unwrap();
        fs::write(tmp.path().join("Beta.log"), b"bbbb").unwrap();
        let mut state = SessionState::default();
        state.open(tmp.path()).unwrap();
        state
    }

    #[test]
    fn listing_is_directories_first_then_by_name() {
        let tmp = TempDir::new().unwrap();
        let state = browse(&tmp);
        let names: Vec<&str> = state.listing.iter().map(FileEntry::name).collect();
        assert_eq!(names, vec!["Zeta", "alpha.txt", "Beta.log"]);
    }

    #[test]
    fn filter_ignores_case() {
        let tmp = TempDir::new().unwrap();
        let state = browse(&tmp);
        let hits: Vec<&str> = state
            .filtered_entries("BETA")
            .into_iter()
            .map(FileEntry::name)
            .collect();
        assert_eq!(hits, vec!["Beta.log"]);
        assert_eq!(state.filtered_entries("  ").len(), 3);
        assert!(state.filtered_entries("nothing").is_empty());
    }

    #[test]
    fn toggle_only_applies_to_listed_paths() {
        let tmp = TempDir::new().unwrap();
        let mut state = browse(&tmp);
        let alpha = tmp.path().join("alpha.txt");
        assert!(state.toggle_check(&alpha));
        assert!(!state.toggle_check(&alpha));
        assert!(!state.toggle_check(&tmp.path().join("elsewhere")));
        assert!(state.checked.is_empty());
    }

    #[test]
    fn add_checked_moves_entries_with_sizes() {
        let tmp = TempDir::new().unwrap();
        let mut state = browse(&tmp);
        state.toggle_check(&tmp.path().join("alpha.txt"));
        state.toggle_check(&tmp.path().join("Beta.log"));
        assert_eq!(state.add_checked(), 2);
        assert!(state.checked.is_empty());
        assert_eq!(state.selection.known_size(), 6);
        // Already present: nothing new.
        state.toggle_check(&tmp.path().join("alpha.txt"));
        assert_eq!(state.add_checked(), 0);
    }

    #[test]
    fn failed_open_keeps_previous_listing() {
        let tmp = TempDir::new().unwrap();
        let mut state = browse(&tmp);
        let err = state.open(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
        assert_eq!(state.listing.len(), 3);
        assert_eq!(state.last_error, Some(err.user_message()));
    }

    #[test]
    fn go_up_opens_parent() {
        let tmp = TempDir::new().unwrap();
        let mut state = browse(&tmp);
        state.open(&tmp.path().join("Zeta")).unwrap();
        assert!(state.listing.is_empty());
        assert!(state.go_up().unwrap());
        assert_eq!(state.current_dir.as_deref(), Some(tmp.path()));
    }

    #[test]
    fn go_up_without_directory_is_false() {
        let mut state = SessionState::default();
        assert!(!state.go_up().unwrap());
    }

    #[test]
    fn silent_worker_exit_ends_the_export() {
        let mut state = SessionState::default();
        state.phase = SessionPhase::Archiving;
        let (tx, rx) = crossbeam_channel::bounded(4);
        tx.send(ArchiveProgress::Percent(40)).unwrap();
        drop(tx);

        assert!(state.drain_progress(&rx));
        assert_eq!(state.phase, SessionPhase::Done);
        assert_eq!(state.archive_percent, 40);
        assert_eq!(state.last_error, Some("The zip file could not be created."));
        assert_eq!(state.last_archive, None);
    }

    #[test]
    fn open_device_starts_at_its_root() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        let device = DeviceDescriptor::fixed(tmp.path().to_string_lossy());
        let mut state = SessionState::default();
        state.open_device(&device).unwrap();
        assert_eq!(state.current_dir.as_deref(), Some(tmp.path()));
        assert_eq!(state.listing.len(), 1);
    }

    #[test]
    fn empty_selection_cannot_export() {
        let tmp = TempDir::new().unwrap();
        let mut state = SessionState::default();
        assert!(matches!(
            state.start_archive(tmp.path()).unwrap_err(),
            ArchiveError::EmptySelection
        ));
        assert_eq!(state.phase, SessionPhase::Browsing);
        assert!(state.last_error.is_some());
    }
}
