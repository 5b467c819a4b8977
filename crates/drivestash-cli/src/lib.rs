/// DriveStash CLI: terminal frontend over `drivestash-core`.
///
/// This crate contains all presentation code. Business logic lives in
/// `drivestash-core`.
pub mod commands;
pub mod format;
pub mod state;

pub use commands::DeviceFilter;
pub use state::{SessionPhase, SessionState};
