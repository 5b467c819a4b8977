/// Data model shared by the walker, selection, archive, and probes.
///
/// All types are plain values: listings and device lists are rebuilt
/// wholesale rather than mutated in place.
pub mod device;
pub mod entry;

pub use device::{DeviceDescriptor, DeviceKind};
pub use entry::{display_name, FileEntry};
