//! Dynamic library loading with a restricted search path

use std::ffi::{c_void, OsStr};
use std::path::Path;

use windows::core::{PCSTR, PCWSTR};
use windows::Win32::Foundation::{FreeLibrary, GetLastError, HANDLE, HMODULE};
use windows::Win32::System::LibraryLoader::{
    AddDllDirectory, GetProcAddress, LoadLibraryExW, SetDefaultDllDirectories,
    LOAD_LIBRARY_FLAGS, LOAD_LIBRARY_SEARCH_SYSTEM32, LOAD_LIBRARY_SEARCH_USER_DIRS,
};

use super::to_wide;
use crate::core::error::hresult_from_win32;

/// Search System32, user directories and `directory`. `PATH` is never used.
pub fn restrict_search_path(directory: &Path) -> Result<(), u32> {
    let wide = to_wide(directory.as_os_str());
    unsafe {
        SetDefaultDllDirectories(LOAD_LIBRARY_SEARCH_SYSTEM32 | LOAD_LIBRARY_SEARCH_USER_DIRS)
            .map_err(|e| e.code().0 as u32)?;
        AddDllDirectory(PCWSTR(wide.as_ptr()));
    }
    Ok(())
}

/// A loaded module, freed on drop.
pub struct Library {
    module: HMODULE,
}

impl Library {
    /// Load `name` through the default search directories.
    ///
    /// Errors are the plain Win32 code (no severity bit) since a missing
    /// library is an expected outcome.
    pub fn load(name: &str) -> Result<Self, u32> {
        let wide = to_wide(OsStr::new(name));
        unsafe {
            LoadLibraryExW(PCWSTR(wide.as_ptr()), HANDLE::default(), LOAD_LIBRARY_FLAGS(0))
                .map(|module| Self { module })
                .map_err(|e| (e.code().0 as u32) & 0xFFFF)
        }
    }

    /// Address of an exported symbol. `name` must be NUL-terminated.
    pub fn symbol(&self, name: &[u8]) -> Result<*const c_void, u32> {
        debug_assert_eq!(name.last(), Some(&0));
        unsafe {
            match GetProcAddress(self.module, PCSTR(name.as_ptr())) {
                Some(f) => Ok(f as *const c_void),
                None => Err(hresult_from_win32(GetLastError().0)),
            }
        }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        unsafe {
            let _ = FreeLibrary(self.module);
        }
    }
}
