/// Per-platform enumeration commands and their output parsers.
///
/// Output lines are kept as opaque display strings: the only consumer is a
/// device list, and not parsing individual columns keeps the probes working
/// when a tool's output layout drifts between versions.
use super::command::ProbeCommand;
use super::Platform;

/// Fixed drives on Windows: one drive letter per line under a `Name` header.
pub const WINDOWS_FIXED_ROOTS: ProbeCommand = ProbeCommand {
    program: "wmic",
    args: &["logicaldisk", "get", "name"],
};

/// Removable drives on Windows (`drivetype=2`).
pub const WINDOWS_REMOVABLE: ProbeCommand = ProbeCommand {
    program: "wmic",
    args: &[
        "logicaldisk",
        "where",
        "drivetype=2",
        "get",
        "deviceid,volumename,description",
    ],
};

/// Block devices on Linux with their transport column.
pub const LINUX_REMOVABLE: ProbeCommand = ProbeCommand {
    program: "lsblk",
    args: &["-o", "NAME,MOUNTPOINT,SIZE,TRAN"],
};

/// Disk inventory on macOS.
pub const MACOS_REMOVABLE: ProbeCommand = ProbeCommand {
    program: "diskutil",
    args: &["list"],
};

/// The single root offered on single-rooted filesystems.
pub const POSIX_ROOT: &str = "/";

/// How a platform's removable-device output is reduced to display lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovableProbe {
    pub command: ProbeCommand,
    /// Keep only lines containing this marker; `None` keeps every line.
    pub line_marker: Option<&'static str>,
}

impl Platform {
    /// The command listing fixed roots, or `None` when the root list is a
    /// constant for this platform.
    pub fn fixed_roots_command(self) -> Option<ProbeCommand> {
        match self {
            Self::Windows => Some(WINDOWS_FIXED_ROOTS),
            Self::Linux | Self::MacOs => None,
        }
    }

    /// The removable-device probe for this platform.
    pub fn removable_probe(self) -> RemovableProbe {
        match self {
            Self::Windows => RemovableProbe {
                command: WINDOWS_REMOVABLE,
                line_marker: None,
            },
            Self::Linux => RemovableProbe {
                command: LINUX_REMOVABLE,
                line_marker: Some("usb"),
            },
            Self::MacOs => RemovableProbe {
                command: MACOS_REMOVABLE,
                line_marker: Some("external, physical"),
            },
        }
    }
}

/// Parse the tabular fixed-roots listing: skip the header row, trim every
/// line, and drop blanks.
pub fn parse_fixed_roots(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduce raw removable-device output to trimmed, non-empty lines,
/// optionally keeping only those containing `marker`.
pub fn parse_device_lines(output: &str, marker: Option<&str>) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| marker.map_or(true, |m| line.contains(m)))
        .map(str::to_string)
        .collect()
}
