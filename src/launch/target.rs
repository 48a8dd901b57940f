//! `.__target__` files and launcher error rendering
//!
//! An alias executable `foo.exe` is paired with `foo.exe.__target__`, a UTF-8
//! file holding the absolute path of the runtime it stands for.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::error::LaunchError;

pub const TARGET_SUFFIX: &str = ".__target__";

/// `<exe>.__target__`
pub fn target_file_for(exe: &Path) -> PathBuf {
    let mut name = OsString::from(exe.as_os_str());
    name.push(TARGET_SUFFIX);
    PathBuf::from(name)
}

/// Read the runtime path out of a target file.
pub fn read_target_file(path: &Path) -> Result<PathBuf, LaunchError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|e| LaunchError::TargetFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let target = text.trim_start_matches('\u{feff}').trim_end_matches(['\0', '\r', '\n', ' ', '\t']);
    if target.is_empty() {
        return Err(LaunchError::TargetFile {
            path: path.to_path_buf(),
            reason: "file is empty".into(),
        });
    }
    Ok(PathBuf::from(target))
}

/// Render a user-facing error line the way both launchers print them.
pub fn format_error(code: u32, message: &str) -> String {
    if code == 0 {
        format!("[WARN] Error was reported but no error code was set.\n[ERROR] {message}")
    } else {
        format!("[ERROR] {message} (0x{code:08X})")
    }
}

/// Print an error and hand back the exit code to use.
pub fn print_error(code: u32, message: &str) -> u32 {
    eprintln!("{}", format_error(code, message));
    code
}
