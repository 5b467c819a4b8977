/// Device descriptors produced by the platform probes.
///
/// A fresh list is built on every enumeration request; removable media can
/// appear or disappear between calls, so nothing here is cached.
use serde::Serialize;
use std::path::PathBuf;

/// Classification of a probed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Fixed,
    Removable,
}

impl DeviceKind {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Fixed => "Fixed",
            Self::Removable => "Removable",
        }
    }
}

/// A single fixed root or removable device.
///
/// `identifier` is the literal line reported by the OS tool. It is treated
/// as an opaque display string, never parsed into fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    pub fn fixed(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: None,
            kind: DeviceKind::Fixed,
        }
    }

    pub fn removable(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            label: None,
            kind: DeviceKind::Removable,
        }
    }

    /// Directory to open when browsing this root.
    ///
    /// A bare drive letter such as `C:` is drive-relative (it means the
    /// current directory on C), so it gets a trailing separator. Other
    /// identifiers are used as they are.
    pub fn browse_path(&self) -> PathBuf {
        PathBuf::from(drive_root(&self.identifier))
    }
}

fn drive_root(identifier: &str) -> String {
    let trimmed = identifier.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        format!("{trimmed}\\")
    } else {
        trimmed.to_string()
    }
}
