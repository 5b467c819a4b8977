/// Platform-specific functionality: fixed-root and removable-device probes.
///
/// The three supported OS families are a closed set ([`Platform`]) chosen
/// once, up front. All per-platform branching lives behind the
/// [`DeviceProbe`] capability so the rest of the crate never checks the OS.
///
/// Probes are read-only and idempotent. Nothing is cached: removable media
/// can be inserted or ejected between calls.
pub mod command;
pub mod devices;

pub use command::{CommandRunner, ProbeCommand, SystemCommandRunner};

use crate::error::ProbeError;
use crate::model::DeviceDescriptor;
use devices::{parse_device_lines, parse_fixed_roots, POSIX_ROOT};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Supported OS families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    /// The platform this binary is running on.
    ///
    /// # Errors
    ///
    /// [`ProbeError::UnsupportedPlatform`] outside the three supported families.
    pub fn current() -> Result<Self, ProbeError> {
        std::env::consts::OS.parse()
    }
}

impl FromStr for Platform {
    type Err = ProbeError;

    /// Accepts both Rust (`windows`, `macos`) and Node-style (`win32`,
    /// `darwin`) identifiers.
    fn from_str(os: &str) -> Result<Self, Self::Err> {
        match os.trim().to_ascii_lowercase().as_str() {
            "windows" | "win32" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::MacOs),
            _ => Err(ProbeError::UnsupportedPlatform(os.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        })
    }
}

/// Root and device enumeration capability.
pub trait DeviceProbe {
    /// Roots offered for browsing (drive letters, or `/`).
    fn list_fixed_roots(&self) -> Result<Vec<String>, ProbeError>;

    /// Removable devices as opaque display lines.
    fn list_removable_devices(&self) -> Result<Vec<String>, ProbeError>;
}

/// [`DeviceProbe`] for one platform, running commands through `R`.
#[derive(Debug, Clone)]
pub struct PlatformProbe<R> {
    platform: Platform,
    runner: R,
}

impl<R: CommandRunner> PlatformProbe<R> {
    pub fn new(platform: Platform, runner: R) -> Self {
        Self { platform, runner }
    }

    /// Probe for the OS named `os`. Fails before any process is spawned if
    /// the OS family is not supported.
    pub fn for_os(os: &str, runner: R) -> Result<Self, ProbeError> {
        Ok(Self::new(os.parse()?, runner))
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}

impl PlatformProbe<SystemCommandRunner> {
    /// Probe for the running OS with real processes.
    pub fn system(timeout: Option<std::time::Duration>) -> Result<Self, ProbeError> {
        Ok(Self::new(
            Platform::current()?,
            SystemCommandRunner::new(timeout),
        ))
    }
}

impl<R: CommandRunner> DeviceProbe for PlatformProbe<R> {
    fn list_fixed_roots(&self) -> Result<Vec<String>, ProbeError> {
        match self.platform.fixed_roots_command() {
            Some(command) => {
                let output = self.runner.run(&command)?;
                let roots = parse_fixed_roots(&output);
                debug!("{} fixed roots on {}", roots.len(), self.platform);
                Ok(roots)
            }
            None => Ok(vec![POSIX_ROOT.to_string()]),
        }
    }

    fn list_removable_devices(&self) -> Result<Vec<String>, ProbeError> {
        let probe = self.platform.removable_probe();
        let output = self.runner.run(&probe.command)?;
        let devices = parse_device_lines(&output, probe.line_marker);
        debug!("{} removable devices on {}", devices.len(), self.platform);
        Ok(devices)
    }
}

/// Both probe results folded into one list.
#[derive(Debug, Default)]
pub struct DeviceInventory {
    /// Fixed roots first, then removable devices, each in probe order.
    pub devices: Vec<DeviceDescriptor>,
    /// Probes that failed. Not fatal: the list is just shorter.
    pub failures: Vec<ProbeError>,
}

/// Run both probes and merge their output into [`DeviceDescriptor`]s.
///
/// A failing probe contributes nothing to the list and is recorded in
/// [`DeviceInventory::failures`]; it never aborts the other probe.
pub fn enumerate_devices(probe: &dyn DeviceProbe) -> DeviceInventory {
    let mut inventory = DeviceInventory::default();

    match probe.list_fixed_roots() {
        Ok(roots) => inventory
            .devices
            .extend(roots.into_iter().map(DeviceDescriptor::fixed)),
        Err(err) => {
            warn!("fixed root probe failed: {err}");
            inventory.failures.push(err);
        }
    }

    match probe.list_removable_devices() {
        Ok(lines) => inventory
            .devices
            .extend(lines.into_iter().map(DeviceDescriptor::removable)),
        Err(err) => {
            warn!("removable device probe failed: {err}");
            inventory.failures.push(err);
        }
    }

    inventory
}
