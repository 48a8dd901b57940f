//! Error types and HRESULT-shaped exit codes
//!
//! Every failure the launcher can surface ends up as a process exit code. OS
//! errors are carried as `HRESULT_FROM_WIN32` values; launcher-specific
//! conditions use the customer bit range `0xA000_00xx` so they never collide
//! with a real runtime's exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Target path has no directory component.
pub const ERROR_RELATIVE_PATH: u32 = 0xA000_0001;
/// `python3.dll` is missing `Py_Version` or reports an unsupported version.
pub const ERROR_NO_PYTHON3: u32 = 0xA000_0002;
/// The in-process fast path was compiled out.
pub const ERROR_DLL_LOAD_DISABLED: u32 = 0xA000_0003;
/// Runtimes are installed but none match the tag or script.
pub const ERROR_NO_MATCHING_INSTALL: u32 = 0xA000_0004;
/// No runtimes are installed at all.
pub const ERROR_NO_INSTALLS: u32 = 0xA000_0005;
/// A matching runtime would need an automatic install, which is disabled.
pub const ERROR_AUTO_INSTALL_DISABLED: u32 = 0xA000_0006;

/// Win32 `ERROR_EXE_MACHINE_TYPE_MISMATCH`.
pub const ERROR_EXE_MACHINE_TYPE_MISMATCH: u32 = 216;
/// Win32 `WAIT_TIMEOUT`.
pub const WAIT_TIMEOUT_CODE: u32 = 258;

/// Bug report location printed with internal errors.
pub const BUG_REPORT_URL: &str = "https://github.com/python/pymanager";

/// Convert a Win32 error code to an HRESULT, leaving existing HRESULTs alone.
pub fn hresult_from_win32(code: u32) -> u32 {
    if code == 0 || code & 0x8000_0000 != 0 {
        code
    } else {
        (code & 0x0000_FFFF) | (7 << 16) | 0x8000_0000
    }
}

/// Whether `code` carries the severity bit, i.e. it is worth showing to users.
pub fn is_severe(code: u32) -> bool {
    code & 0x8000_0000 != 0
}

/// Failures of the launch primitive and the management bridge.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Target executable path is not absolute
    #[error("target path '{}' is not absolute", .0.display())]
    RelativePath(PathBuf),

    /// An OS call failed; the code is HRESULT-shaped
    #[error("{context} failed (0x{code:08X})")]
    Os { context: &'static str, code: u32 },

    /// The `.__target__` file could not be used
    #[error("invalid target file {}: {reason}", path.display())]
    TargetFile { path: PathBuf, reason: String },

    /// I/O error while talking to the selection engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    /// Exit code to return from the launcher for this error.
    pub fn exit_code(&self) -> u32 {
        match self {
            LaunchError::RelativePath(_) => ERROR_RELATIVE_PATH,
            LaunchError::Os { code, .. } => *code,
            LaunchError::TargetFile { .. } => hresult_from_win32(2),
            LaunchError::Io(e) => io_error_code(e),
        }
    }

    #[cfg(windows)]
    pub(crate) fn from_win(context: &'static str, err: windows::core::Error) -> Self {
        LaunchError::Os { context, code: err.code().0 as u32 }
    }

    /// The child could not start because it targets another CPU architecture.
    pub fn is_machine_type_mismatch(&self) -> bool {
        let code = self.exit_code();
        code == ERROR_EXE_MACHINE_TYPE_MISMATCH
            || code == hresult_from_win32(ERROR_EXE_MACHINE_TYPE_MISMATCH)
    }
}

/// HRESULT for an `io::Error`, falling back to `E_FAIL` when it has no OS code.
pub fn io_error_code(err: &std::io::Error) -> u32 {
    match err.raw_os_error() {
        Some(code) if code > 0 => hresult_from_win32(code as u32),
        _ => 0x8000_4005,
    }
}

/// Typed outcome of asking the selection engine for a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("no runtimes are installed")]
    NoInstalls,

    #[error("no installed runtime matches the request")]
    NoInstallFound,

    #[error("automatic installation is disabled")]
    AutoInstallDisabled,

    /// Anything the engine could not classify; the code is shown to the user
    #[error("internal error 0x{0:08X}")]
    Internal(u32),
}

impl LocateError {
    /// Stable exit code for this failure.
    pub fn exit_code(&self) -> u32 {
        match self {
            LocateError::NoInstalls => ERROR_NO_INSTALLS,
            LocateError::NoInstallFound => ERROR_NO_MATCHING_INSTALL,
            LocateError::AutoInstallDisabled => ERROR_AUTO_INSTALL_DISABLED,
            LocateError::Internal(code) => *code,
        }
    }

    /// Map an engine exit code back to a typed failure.
    pub fn from_exit_code(code: u32) -> Self {
        match code {
            ERROR_NO_INSTALLS => LocateError::NoInstalls,
            ERROR_NO_MATCHING_INSTALL => LocateError::NoInstallFound,
            ERROR_AUTO_INSTALL_DISABLED => LocateError::AutoInstallDisabled,
            other => LocateError::Internal(other),
        }
    }

    /// Failures that an automatic install can fix.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LocateError::NoInstalls | LocateError::NoInstallFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hresult_from_win32() {
        assert_eq!(hresult_from_win32(0), 0);
        assert_eq!(hresult_from_win32(2), 0x8007_0002);
        assert_eq!(hresult_from_win32(216), 0x8007_00D8);
        // Already an HRESULT
        assert_eq!(hresult_from_win32(0x8007_0005), 0x8007_0005);
    }

    #[test]
    fn test_locate_error_codes_round_trip() {
        for err in [
            LocateError::NoInstalls,
            LocateError::NoInstallFound,
            LocateError::AutoInstallDisabled,
            LocateError::Internal(1),
        ] {
            assert_eq!(LocateError::from_exit_code(err.exit_code()), err);
        }
        assert!(LocateError::NoInstalls.is_not_found());
        assert!(!LocateError::AutoInstallDisabled.is_not_found());
    }

    #[test]
    fn test_machine_type_mismatch() {
        let err = LaunchError::Os { context: "CreateProcessW", code: hresult_from_win32(216) };
        assert!(err.is_machine_type_mismatch());
        let err = LaunchError::Os { context: "CreateProcessW", code: hresult_from_win32(2) };
        assert!(!err.is_machine_type_mismatch());
    }

    #[test]
    fn test_severity() {
        assert!(is_severe(0x8007_007E));
        assert!(is_severe(ERROR_NO_PYTHON3));
        assert!(!is_severe(126));
    }
}
