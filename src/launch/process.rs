//! Process launch primitive
//!
//! Runs the target runtime as a child that shares our console, waits for it,
//! and returns its exit code. On Windows the child lives in a kill-on-close
//! job so it cannot outlive the launcher.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::cmdline;
use crate::core::error::LaunchError;

/// One launch of the target runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    executable: PathBuf,
    inserted_args: String,
    skip_argc: usize,
}

impl LaunchRequest {
    /// `executable` must be absolute.
    pub fn new(
        executable: impl Into<PathBuf>,
        inserted_args: impl Into<String>,
        skip_argc: usize,
    ) -> Result<Self, LaunchError> {
        let executable = executable.into();
        if !executable.is_absolute() {
            return Err(LaunchError::RelativePath(executable));
        }
        Ok(Self { executable, inserted_args: inserted_args.into(), skip_argc })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn inserted_args(&self) -> &str {
        &self.inserted_args
    }

    pub fn skip_argc(&self) -> usize {
        self.skip_argc
    }

    /// The child's command line, derived from the launcher's `original` one.
    pub fn command_line(&self, original: &str) -> String {
        cmdline::build_child_command_line(
            original,
            &self.executable.to_string_lossy(),
            &self.inserted_args,
            self.skip_argc,
        )
    }
}

/// The launcher's own command line.
///
/// Windows hands us the raw string. Elsewhere it is rebuilt from argv with
/// the same quoting rules, which round-trips through the splitter.
pub fn original_command_line() -> String {
    #[cfg(windows)]
    {
        crate::windows::console::raw_command_line()
    }
    #[cfg(not(windows))]
    {
        let argv: Vec<String> = std::env::args_os()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        cmdline::join_args(&argv)
    }
}

/// Launch the request using this process's command line and wait for it.
pub fn launch(request: &LaunchRequest) -> Result<u32, LaunchError> {
    launch_with_command_line(request, &original_command_line())
}

/// Launch the request as if the launcher had been started with `original`.
pub fn launch_with_command_line(request: &LaunchRequest, original: &str) -> Result<u32, LaunchError> {
    let command_line = request.command_line(original);
    debug!("Launching {} with command line: {}", request.executable.display(), command_line);
    spawn_and_wait(&request.executable, command_line)
}

#[cfg(windows)]
fn spawn_and_wait(executable: &Path, command_line: String) -> Result<u32, LaunchError> {
    use std::ffi::OsStr;
    use windows::core::{PCWSTR, PWSTR};
    use windows::Win32::Foundation::{CloseHandle, GetLastError};
    use windows::Win32::System::Threading::{
        CreateProcessW, GetExitCodeProcess, GetStartupInfoW, ResumeThread, TerminateProcess,
        WaitForSingleObjectEx, CREATE_SUSPENDED, INFINITE, PROCESS_INFORMATION,
        STARTF_USESTDHANDLES, STARTUPINFOW,
    };

    use crate::windows::console::{ignore_ctrl_events, StdHandles};
    use crate::windows::job::JobObject;
    use crate::windows::to_wide;

    #[cfg(feature = "windowed")]
    crate::windows::console::clear_app_starting_cursor();

    let job = JobObject::kill_on_close()?;
    let handles = StdHandles::inheritable()?;
    ignore_ctrl_events()?;

    let application = to_wide(executable.as_os_str());
    let mut command_line = to_wide(OsStr::new(&command_line));

    unsafe {
        let mut startup_info = STARTUPINFOW::default();
        GetStartupInfoW(&mut startup_info);
        startup_info.dwFlags = STARTF_USESTDHANDLES;
        startup_info.hStdInput = handles.input;
        startup_info.hStdOutput = handles.output;
        startup_info.hStdError = handles.error;

        let mut process_info = PROCESS_INFORMATION::default();
        CreateProcessW(
            PCWSTR(application.as_ptr()),
            PWSTR(command_line.as_mut_ptr()),
            None,
            None,
            true,
            CREATE_SUSPENDED,
            None,
            PCWSTR::null(),
            &startup_info,
            &mut process_info,
        )
        .map_err(|e| LaunchError::from_win("CreateProcessW", e))?;

        // Assigning before the first instruction runs keeps every descendant
        // inside the job
        if let Err(e) = job.assign(process_info.hProcess) {
            debug!("Child runs outside the job: {}", e);
        }
        let resumed = check_resumed(ResumeThread(process_info.hThread), || GetLastError().0);
        let _ = CloseHandle(process_info.hThread);
        if let Err(err) = resumed {
            // Still suspended; waiting on it would never return
            let _ = TerminateProcess(process_info.hProcess, err.exit_code());
            let _ = CloseHandle(process_info.hProcess);
            return Err(err);
        }

        WaitForSingleObjectEx(process_info.hProcess, INFINITE, false);
        let mut exit_code = 0u32;
        let result = GetExitCodeProcess(process_info.hProcess, &mut exit_code);
        let _ = CloseHandle(process_info.hProcess);
        result.map_err(|e| LaunchError::from_win("GetExitCodeProcess", e))?;

        // Closing the job is the kill switch; only now is that harmless
        drop(job);
        drop(handles);
        Ok(exit_code)
    }
}

/// `ResumeThread` returns the previous suspend count, or `u32::MAX` on error.
#[cfg_attr(not(windows), allow(dead_code))]
fn check_resumed(previous: u32, last_error: impl FnOnce() -> u32) -> Result<(), LaunchError> {
    if previous == u32::MAX {
        return Err(LaunchError::Os {
            context: "ResumeThread",
            code: crate::core::error::hresult_from_win32(last_error()),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn spawn_and_wait(executable: &Path, command_line: String) -> Result<u32, LaunchError> {
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    let argv = cmdline::split_command_line(&command_line);

    // A caught signal is reset to default in the child on exec, so the
    // child still receives Ctrl+C while the launcher ignores it
    let interrupted = Arc::new(AtomicBool::new(false));
    let sigint = signal_hook::flag::register(signal_hook::consts::SIGINT, interrupted)?;

    let status = Command::new(executable).args(argv.iter().skip(1)).status();
    signal_hook::low_level::unregister(sigint);

    let status = status?;
    Ok(match (status.code(), status.signal()) {
        (Some(code), _) => code as u32,
        (None, Some(signal)) => 128 + signal as u32,
        (None, None) => 1,
    })
}
