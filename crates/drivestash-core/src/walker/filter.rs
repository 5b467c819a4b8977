/// Hidden/system entry filtering.
///
/// Two rules, applied per entry:
/// - names starting with `.` are hidden on every platform;
/// - on Windows the entry is also hidden when its HIDDEN or SYSTEM attribute
///   bit is set. If the attribute lookup itself fails (typically access
///   denied) the entry is excluded rather than shown half-resolved.
use std::ffi::OsStr;
use std::path::Path;

// File attribute constants from the Windows API.
pub const FILE_ATTRIBUTE_HIDDEN_VAL: u32 = 0x2;
pub const FILE_ATTRIBUTE_SYSTEM_VAL: u32 = 0x4;

/// `true` if `name` follows the dot-file hiding convention.
pub fn is_hidden_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

/// `true` if the attribute word has the HIDDEN or SYSTEM bit set.
pub fn attributes_hide(attributes: u32) -> bool {
    attributes & (FILE_ATTRIBUTE_HIDDEN_VAL | FILE_ATTRIBUTE_SYSTEM_VAL) != 0
}

/// Decide whether the entry at `path` (named `name`) is left out of listings.
pub fn is_excluded(path: &Path, name: &OsStr) -> bool {
    is_hidden_name(name) || excluded_by_attributes(path)
}

#[cfg(windows)]
fn excluded_by_attributes(path: &Path) -> bool {
    use std::os::windows::ffi::OsStrExt;
    use windows::Win32::Storage::FileSystem::{GetFileAttributesW, INVALID_FILE_ATTRIBUTES};

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let attributes = unsafe { GetFileAttributesW(windows::core::PCWSTR(wide.as_ptr())) };

    if attributes == INVALID_FILE_ATTRIBUTES {
        tracing::debug!(
            "attribute lookup failed for {}, excluding entry",
            path.display()
        );
        return true;
    }
    attributes_hide(attributes)
}

#[cfg(not(windows))]
fn excluded_by_attributes(_path: &Path) -> bool {
    false
}
