/// Archive progress reporting: lightweight messages sent from the archive
/// thread to the caller via a bounded crossbeam channel.
///
/// Progress is advisory. Intermediate messages are sent with `try_send` and
/// dropped when the channel is full, so a slow consumer never stalls the
/// writer. `Started`, the final `Percent(100)` and the terminal message are always
/// delivered while a receiver exists.
use crossbeam_channel::{Sender, TrySendError};
use std::path::PathBuf;
use std::time::Duration;

/// Progress updates sent from the archive thread to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveProgress {
    /// The selection has been expanded and writing begins.
    Started {
        destination: PathBuf,
        total_files: u64,
        total_bytes: u64,
    },
    /// Whole-percent completion, non-decreasing across a job.
    Percent(u8),
    /// A part of a selected directory could not be read and was left out.
    Warning { path: String, message: String },
    /// The container was written and closed.
    Complete {
        path: PathBuf,
        files: u64,
        bytes: u64,
        duration: Duration,
    },
    /// The job was abandoned. `message` is safe to show to users; `detail`
    /// carries the raw cause for logs.
    Failed { message: &'static str, detail: String },
}

impl ArchiveProgress {
    /// `true` for the last message a job sends.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Failed { .. })
    }
}

/// Converts a running byte count into monotonically increasing percentages.
///
/// `processed` is clamped to `total`, so a file that grows while being
/// read cannot push the figure past 100. With an unknown or zero total the
/// percentage stays at 0 until [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    processed: u64,
    last_emitted: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            processed: 0,
            last_emitted: None,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Current percentage: `processed * 100 / total`, rounded, at most 100.
    pub fn percent(&self) -> u8 {
        percent_of(self.processed, self.total)
    }

    /// The opening value, emitted once before any bytes are written.
    pub fn start(&mut self) -> Option<u8> {
        self.emit(self.percent())
    }

    /// Record `bytes` more processed. Returns a percentage only when it
    /// moved past the last emitted one.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.processed = self.processed.saturating_add(bytes).min(self.total);
        self.emit(self.percent())
    }

    /// The closing value on success: 100, unless 100 was already emitted.
    pub fn finish(&mut self) -> Option<u8> {
        self.processed = self.total;
        self.emit(100)
    }

    fn emit(&mut self, percent: u8) -> Option<u8> {
        match self.last_emitted {
            Some(last) if percent <= last => None,
            _ => {
                self.last_emitted = Some(percent);
                Some(percent)
            }
        }
    }
}

fn percent_of(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (u128::from(processed) * 100 + u128::from(total) / 2) / u128::from(total);
    scaled.min(100) as u8
}

/// Sending side of the progress channel.
#[derive(Debug, Clone)]
pub(crate) struct ProgressSink {
    tx: Sender<ArchiveProgress>,
}

impl ProgressSink {
    pub(crate) fn new(tx: Sender<ArchiveProgress>) -> Self {
        Self { tx }
    }

    /// Best-effort update: dropped if the consumer is behind.
    pub(crate) fn update(&self, msg: ArchiveProgress) {
        if let Err(TrySendError::Full(dropped)) = self.tx.try_send(msg) {
            tracing::trace!("progress channel full, dropped {dropped:?}");
        }
    }

    /// Guaranteed delivery while the receiver is alive.
    pub(crate) fn deliver(&self, msg: ArchiveProgress) {
        let _ = self.tx.send(msg);
    }
}
