//! Console plumbing: raw command line, standard handles, Ctrl+C

use windows::Win32::Foundation::{
    CloseHandle, DuplicateHandle, BOOL, DUPLICATE_SAME_ACCESS, ERROR_INVALID_HANDLE, HANDLE,
    INVALID_HANDLE_VALUE, TRUE,
};
use windows::Win32::System::Console::{
    GetStdHandle, SetConsoleCtrlHandler, STD_ERROR_HANDLE, STD_HANDLE, STD_INPUT_HANDLE,
    STD_OUTPUT_HANDLE,
};
use windows::Win32::System::Environment::GetCommandLineW;
use windows::Win32::System::Threading::GetCurrentProcess;

use crate::core::error::LaunchError;

/// The launcher's command line exactly as it was passed to the process.
pub fn raw_command_line() -> String {
    unsafe { String::from_utf16_lossy(GetCommandLineW().as_wide()) }
}

unsafe extern "system" fn ignore_ctrl_event(_ctrl_type: u32) -> BOOL {
    // The child shares our console and handles the event itself
    TRUE
}

/// Stop Ctrl+C and Ctrl+Break from terminating the launcher.
pub fn ignore_ctrl_events() -> Result<(), LaunchError> {
    unsafe {
        SetConsoleCtrlHandler(Some(ignore_ctrl_event), true)
            .map_err(|e| LaunchError::from_win("SetConsoleCtrlHandler", e))
    }
}

/// Drop the "app starting" cursor Explorer shows for GUI launches.
///
/// Explorer keeps it until the launched process touches its message queue,
/// which the launcher itself never does.
#[cfg(feature = "windowed")]
pub fn clear_app_starting_cursor() {
    use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
    use windows::Win32::UI::WindowsAndMessaging::{GetMessageW, PostMessageW, MSG};

    unsafe {
        // A null window posts to this thread's own queue, so the get
        // returns immediately
        if PostMessageW(HWND::default(), 0, WPARAM(0), LPARAM(0)).is_ok() {
            let mut msg = MSG::default();
            let _ = GetMessageW(&mut msg, HWND::default(), 0, 0);
        }
    }
}

/// Inheritable copies of stdin, stdout and stderr for the child.
///
/// Missing or invalid handles are passed through as they are.
pub struct StdHandles {
    pub input: HANDLE,
    pub output: HANDLE,
    pub error: HANDLE,
    owned: [bool; 3],
}

fn is_passthrough(handle: HANDLE) -> bool {
    handle.0.is_null() || handle == INVALID_HANDLE_VALUE
}

fn duplicate_inheritable(which: STD_HANDLE) -> Result<(HANDLE, bool), LaunchError> {
    let source = unsafe { GetStdHandle(which) }.unwrap_or(INVALID_HANDLE_VALUE);
    if is_passthrough(source) {
        return Ok((source, false));
    }

    let mut copy = HANDLE::default();
    unsafe {
        let me = GetCurrentProcess();
        match DuplicateHandle(me, source, me, &mut copy, 0, true, DUPLICATE_SAME_ACCESS) {
            Ok(()) => Ok((copy, true)),
            // Stale handle left behind by the parent; the child gets none
            Err(e) if e.code() == ERROR_INVALID_HANDLE.to_hresult() => Ok((HANDLE::default(), false)),
            Err(e) => Err(LaunchError::from_win("DuplicateHandle", e)),
        }
    }
}

impl StdHandles {
    pub fn inheritable() -> Result<Self, LaunchError> {
        let (input, in_owned) = duplicate_inheritable(STD_INPUT_HANDLE)?;
        let mut handles = Self { input, output: HANDLE::default(), error: HANDLE::default(), owned: [in_owned, false, false] };
        let (output, out_owned) = duplicate_inheritable(STD_OUTPUT_HANDLE)?;
        handles.output = output;
        handles.owned[1] = out_owned;
        let (error, err_owned) = duplicate_inheritable(STD_ERROR_HANDLE)?;
        handles.error = error;
        handles.owned[2] = err_owned;
        Ok(handles)
    }
}

impl Drop for StdHandles {
    fn drop(&mut self) {
        for (handle, owned) in [self.input, self.output, self.error].into_iter().zip(self.owned) {
            if owned {
                unsafe {
                    let _ = CloseHandle(handle);
                }
            }
        }
    }
}

#[cfg(all(test, feature = "windowed"))]
mod tests {
    use super::*;

    #[test]
    fn test_clear_cursor_does_not_block() {
        clear_app_starting_cursor();
        clear_app_starting_cursor();
    }
}
