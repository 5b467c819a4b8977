/// DriveStash Core: walking, selection, archiving and device probes.
///
/// No presentation code lives here: frontends drive these modules and
/// render what they return.
///
/// # Modules
///
/// - [`model`]: `FileEntry` and `DeviceDescriptor` value types.
/// - [`walker`]: Shallow listing and deep flattening of directories with
///   hidden/system filtering.
/// - [`selection`]: The cross-directory pending set of entries to archive.
/// - [`archive`]: Background zip writer with a progress channel.
/// - [`platform`]: Per-OS drive and removable-device probes.
/// - [`config`]: JSON configuration with per-section defaults.
/// - [`error`]: Error taxonomy shared by all modules.
pub mod archive;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod selection;
pub mod walker;
