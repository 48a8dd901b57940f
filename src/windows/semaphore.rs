//! Named semaphore backing the single-instance gate

use std::ffi::OsStr;
use std::time::Duration;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, WAIT_ABANDONED, WAIT_FAILED,
    WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows::Win32::System::Threading::{
    CreateSemaphoreExW, ReleaseSemaphore, WaitForSingleObjectEx, INFINITE,
};

use super::to_wide;
use crate::core::error::{hresult_from_win32, LaunchError};

/// `SEMAPHORE_MODIFY_STATE | SYNCHRONIZE`
const SEMAPHORE_ACCESS: u32 = 0x0002 | 0x0010_0000;

pub struct NamedSemaphore {
    handle: HANDLE,
    already_existed: bool,
}

impl NamedSemaphore {
    /// Create or open the semaphore. A newly created one starts owned by us
    /// (count 0, maximum 1).
    pub fn create(name: &str) -> Result<Self, LaunchError> {
        let wide = to_wide(OsStr::new(name));
        unsafe {
            let handle = CreateSemaphoreExW(None, 0, 1, PCWSTR(wide.as_ptr()), 0, SEMAPHORE_ACCESS)
                .map_err(|e| LaunchError::from_win("CreateSemaphoreExW", e))?;
            let already_existed = GetLastError() == ERROR_ALREADY_EXISTS;
            Ok(Self { handle, already_existed })
        }
    }

    /// Another process created the semaphore first and may be holding it.
    pub fn already_existed(&self) -> bool {
        self.already_existed
    }

    /// Alertable wait. Returns `Ok(false)` on timeout; I/O completion wakeups
    /// go back to waiting.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<bool, LaunchError> {
        let millis = timeout
            .map(|t| t.as_millis().min(u128::from(INFINITE - 1)) as u32)
            .unwrap_or(INFINITE);
        loop {
            let res = unsafe { WaitForSingleObjectEx(self.handle, millis, true) };
            if res == WAIT_OBJECT_0 || res == WAIT_ABANDONED {
                return Ok(true);
            }
            if res == WAIT_TIMEOUT {
                return Ok(false);
            }
            if res == WAIT_FAILED {
                let code = unsafe { GetLastError() };
                return Err(LaunchError::Os {
                    context: "WaitForSingleObjectEx",
                    code: hresult_from_win32(code.0),
                });
            }
            // WAIT_IO_COMPLETION
        }
    }

    pub fn release(&self) {
        unsafe {
            let _ = ReleaseSemaphore(self.handle, 1, None);
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}
