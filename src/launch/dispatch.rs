//! Running a resolved runtime
//!
//! Shared by both launchers: try the in-process fast path when the argv
//! would be identical, otherwise start a supervised child.

use std::path::Path;

use tracing::{debug, info, warn};

use super::fastpath::{self, FastPathError};
use super::locator::ResolvedRuntime;
use super::process::{self, LaunchRequest};
use super::target::format_error;
use crate::core::config::FastPathConfig;
use crate::core::error::LaunchError;

/// How a resolved runtime is actually started.
pub trait RuntimeDispatcher {
    /// Run the runtime inside this process. `argv` is the launcher's own.
    fn run_in_process(
        &mut self,
        executable: &Path,
        argv: &[String],
        config: &FastPathConfig,
    ) -> Result<u32, FastPathError>;

    fn spawn(&mut self, request: &LaunchRequest) -> Result<u32, LaunchError>;
}

/// Loads the runtime library or creates a real child process.
#[derive(Debug, Default)]
pub struct NativeDispatcher;

impl RuntimeDispatcher for NativeDispatcher {
    fn run_in_process(
        &mut self,
        executable: &Path,
        argv: &[String],
        config: &FastPathConfig,
    ) -> Result<u32, FastPathError> {
        let entry = fastpath::load(executable, config)?;
        Ok(entry.run(&fastpath::fast_path_argv(executable, argv)))
    }

    fn spawn(&mut self, request: &LaunchRequest) -> Result<u32, LaunchError> {
        process::launch(request)
    }
}

/// Run `runtime` and return the exit code to use.
///
/// The fast path is only tried when nothing was consumed from or inserted
/// into the command line, since `Py_Main` gets our own argv.
pub fn launch_runtime(
    dispatcher: &mut dyn RuntimeDispatcher,
    runtime: &ResolvedRuntime,
    argv: &[String],
    skip_argc: usize,
    config: &FastPathConfig,
) -> u32 {
    let executable = &runtime.executable;

    if runtime.args.is_empty() && skip_argc == 0 {
        match dispatcher.run_in_process(executable, argv, config) {
            Ok(code) => return code,
            Err(err) => {
                if let Some(notice) = fast_path_notice(&err) {
                    warn!("In-process launch failed: {}", err);
                    eprintln!("{notice}");
                } else {
                    info!("In-process launch unavailable ({}); launching as a new process", err);
                }
            }
        }
    }

    let result = LaunchRequest::new(executable.clone(), runtime.args.clone(), skip_argc)
        .and_then(|request| dispatcher.spawn(&request));
    match result {
        Ok(code) => code,
        Err(err) => {
            debug!("Launch failure: {}", err);
            eprintln!("{}", launch_failure_message(executable, &err));
            err.exit_code()
        }
    }
}

/// Message shown for a fast-path failure, if it deserves one.
pub fn fast_path_notice(err: &FastPathError) -> Option<String> {
    err.should_report().then(|| {
        format_error(
            err.code(),
            "Failed to load runtime DLL; attempting to launch as a new process.",
        )
    })
}

pub fn launch_failure_message(executable: &Path, err: &LaunchError) -> String {
    if err.is_machine_type_mismatch() {
        format!(
            "[FATAL ERROR] Executable '{}' is for a different kind of processor architecture.\n\
             Try using '-V:<version>' to select a different runtime, or use 'py install' to install one for your CPU.",
            executable.display()
        )
    } else {
        format!(
            "[FATAL ERROR] Failed to launch '{}' (0x{:08X})\n\
             This may be a corrupt install or a system configuration issue.",
            executable.display(),
            err.exit_code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::hresult_from_win32;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        fast_path: Option<FastPathError>,
        in_process: usize,
        spawned: Vec<LaunchRequest>,
        spawn_error: Option<u32>,
    }

    impl RuntimeDispatcher for Recorder {
        fn run_in_process(
            &mut self,
            _executable: &Path,
            _argv: &[String],
            _config: &FastPathConfig,
        ) -> Result<u32, FastPathError> {
            self.in_process += 1;
            match self.fast_path {
                Some(err) => Err(err),
                None => Ok(4),
            }
        }

        fn spawn(&mut self, request: &LaunchRequest) -> Result<u32, LaunchError> {
            self.spawned.push(request.clone());
            match self.spawn_error {
                Some(code) => Err(LaunchError::Os { context: "CreateProcessW", code }),
                None => Ok(9),
            }
        }
    }

    fn runtime(args: &str) -> ResolvedRuntime {
        ResolvedRuntime {
            executable: std::env::temp_dir().join("python.exe"),
            args: args.into(),
        }
    }

    fn argv() -> Vec<String> {
        vec!["python.exe".into(), "app.py".into()]
    }

    #[test]
    fn test_old_runtime_falls_back_quietly() {
        let mut dispatcher = Recorder { fast_path: Some(FastPathError::NoPython3), ..Default::default() };
        let code = launch_runtime(&mut dispatcher, &runtime(""), &argv(), 0, &FastPathConfig::default());
        assert_eq!(code, 9);
        assert_eq!(dispatcher.in_process, 1);
        assert_eq!(dispatcher.spawned.len(), 1);
        assert_eq!(dispatcher.spawned[0].skip_argc(), 0);
        assert!(fast_path_notice(&FastPathError::NoPython3).is_none());
        assert!(fast_path_notice(&FastPathError::DllLoadDisabled).is_none());
        assert!(fast_path_notice(&FastPathError::Os(126)).is_none());
    }

    #[test]
    fn test_severe_fast_path_error_is_shown() {
        assert_eq!(
            fast_path_notice(&FastPathError::Os(0x8007_007F)).as_deref(),
            Some("[ERROR] Failed to load runtime DLL; attempting to launch as a new process. (0x8007007F)")
        );
    }

    #[test]
    fn test_fast_path_result_is_exit_code() {
        let mut dispatcher = Recorder::default();
        let code = launch_runtime(&mut dispatcher, &runtime(""), &argv(), 0, &FastPathConfig::default());
        assert_eq!(code, 4);
        assert!(dispatcher.spawned.is_empty());
    }

    #[test]
    fn test_skip_or_inserted_args_bypass_fast_path() {
        let mut dispatcher = Recorder::default();
        launch_runtime(&mut dispatcher, &runtime(""), &argv(), 1, &FastPathConfig::default());
        launch_runtime(&mut dispatcher, &runtime("-X utf8"), &argv(), 0, &FastPathConfig::default());
        assert_eq!(dispatcher.in_process, 0);
        assert_eq!(dispatcher.spawned.len(), 2);
    }

    #[test]
    fn test_spawn_failure_returns_os_code() {
        let mut dispatcher = Recorder {
            fast_path: Some(FastPathError::NoPython3),
            spawn_error: Some(hresult_from_win32(2)),
            ..Default::default()
        };
        let code = launch_runtime(&mut dispatcher, &runtime(""), &argv(), 0, &FastPathConfig::default());
        assert_eq!(code, 0x8007_0002);
    }

    #[test]
    fn test_relative_runtime_is_a_launch_failure() {
        let mut dispatcher = Recorder::default();
        let relative = ResolvedRuntime { executable: PathBuf::from("python.exe"), args: "-E".into() };
        let code = launch_runtime(&mut dispatcher, &relative, &argv(), 0, &FastPathConfig::default());
        assert_eq!(code, crate::core::error::ERROR_RELATIVE_PATH);
        assert!(dispatcher.spawned.is_empty());
    }

    #[test]
    fn test_failure_messages() {
        let exe = Path::new("C:\\Py\\python.exe");
        let mismatch = LaunchError::Os { context: "CreateProcessW", code: hresult_from_win32(216) };
        assert!(launch_failure_message(exe, &mismatch).contains("different kind of processor architecture"));

        let missing = LaunchError::Os { context: "CreateProcessW", code: 0x8007_0002 };
        assert!(launch_failure_message(exe, &missing)
            .starts_with("[FATAL ERROR] Failed to launch 'C:\\Py\\python.exe' (0x80070002)"));
    }
}
