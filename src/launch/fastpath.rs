//! In-process launch through the runtime's stable-ABI library
//!
//! When the target directory carries a compatible `python3.dll` we call its
//! `Py_Main` directly instead of starting a second process. Every failure
//! here is recoverable: the caller falls back to a subprocess launch.

use std::path::Path;

use thiserror::Error;

use crate::core::config::FastPathConfig;
use crate::core::error::{
    is_severe, ERROR_DLL_LOAD_DISABLED, ERROR_NO_PYTHON3, ERROR_RELATIVE_PATH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FastPathError {
    /// Library missing `Py_Version`, or the version is out of range
    #[error("runtime library is not a supported Python 3")]
    NoPython3,

    #[error("target path has no directory component")]
    RelativePath,

    #[error("in-process launch is disabled")]
    DllLoadDisabled,

    #[error("loader error 0x{0:08X}")]
    Os(u32),
}

impl FastPathError {
    pub fn code(&self) -> u32 {
        match self {
            FastPathError::NoPython3 => ERROR_NO_PYTHON3,
            FastPathError::RelativePath => ERROR_RELATIVE_PATH,
            FastPathError::DllLoadDisabled => ERROR_DLL_LOAD_DISABLED,
            FastPathError::Os(code) => *code,
        }
    }

    /// Plain Win32 codes (e.g. library not found) are expected; only
    /// HRESULT-shaped failures mean we should have succeeded.
    pub fn should_report(&self) -> bool {
        matches!(self, FastPathError::Os(code) if is_severe(*code))
    }
}

pub fn version_supported(version: u32, config: &FastPathConfig) -> bool {
    version >= config.min_version && version < config.max_version
}

/// Arguments for `Py_Main`: the target executable replaces our own argv0.
pub fn fast_path_argv(executable: &Path, argv: &[String]) -> Vec<String> {
    std::iter::once(executable.to_string_lossy().into_owned())
        .chain(argv.iter().skip(1).cloned())
        .collect()
}

#[cfg(windows)]
type PyMainFn = unsafe extern "C" fn(i32, *mut *mut u16) -> i32;

/// A loaded runtime ready to run in this process.
pub struct EntryPoint {
    #[cfg(windows)]
    _library: crate::windows::dll::Library,
    #[cfg(windows)]
    main: PyMainFn,
    #[cfg(not(windows))]
    never: std::convert::Infallible,
}

impl EntryPoint {
    /// Run the runtime with `argv` and return its exit code.
    #[cfg(windows)]
    pub fn run(self, argv: &[String]) -> u32 {
        use std::ffi::OsStr;

        let mut owned: Vec<Vec<u16>> = argv
            .iter()
            .map(|a| crate::windows::to_wide(OsStr::new(a)))
            .collect();
        let mut pointers: Vec<*mut u16> = owned.iter_mut().map(|a| a.as_mut_ptr()).collect();
        pointers.push(std::ptr::null_mut());

        // SAFETY: `Py_Main` reads argc NUL-terminated strings that outlive the call
        let code = unsafe { (self.main)(argv.len() as i32, pointers.as_mut_ptr()) };
        code as u32
    }

    #[cfg(not(windows))]
    pub fn run(self, _argv: &[String]) -> u32 {
        match self.never {}
    }
}

/// Load the runtime library next to `executable`.
pub fn load(executable: &Path, config: &FastPathConfig) -> Result<EntryPoint, FastPathError> {
    if cfg!(feature = "no-dll-loading") {
        return Err(FastPathError::DllLoadDisabled);
    }
    let directory = match executable.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => return Err(FastPathError::RelativePath),
    };
    load_from(directory, config)
}

#[cfg(windows)]
fn load_from(directory: &Path, config: &FastPathConfig) -> Result<EntryPoint, FastPathError> {
    use crate::windows::dll::{restrict_search_path, Library};

    restrict_search_path(directory).map_err(FastPathError::Os)?;
    let library = Library::load(&config.dll_name).map_err(FastPathError::Os)?;

    let version = library
        .symbol(b"Py_Version\0")
        .map_err(|_| FastPathError::NoPython3)?;
    // SAFETY: `Py_Version` is an exported `const unsigned long`
    let version = unsafe { *(version as *const u32) };
    if !version_supported(version, config) {
        tracing::debug!("Rejecting runtime version 0x{:08X}", version);
        return Err(FastPathError::NoPython3);
    }

    let main = library.symbol(b"Py_Main\0").map_err(FastPathError::Os)?;
    // SAFETY: `Py_Main` has the documented `int (int, wchar_t **)` signature
    let main: PyMainFn = unsafe { std::mem::transmute(main) };
    Ok(EntryPoint { _library: library, main })
}

#[cfg(not(windows))]
fn load_from(_directory: &Path, _config: &FastPathConfig) -> Result<EntryPoint, FastPathError> {
    Err(FastPathError::DllLoadDisabled)
}
