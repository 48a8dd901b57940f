//! Per-runtime alias launcher
//!
//! A copy of this executable sits next to `<name>.exe.__target__` and behaves
//! like the runtime named there: in-process through `python3.dll` when it
//! can, otherwise as a supervised child with the same command line.

#![cfg_attr(all(windows, feature = "windowed"), windows_subsystem = "windows")]

use std::path::{Path, PathBuf};

use pymanager_launcher::core::{config::LauncherConfig, logging};
use pymanager_launcher::launch::target::{print_error, read_target_file, target_file_for};
use pymanager_launcher::launch::{launch_runtime, NativeDispatcher};
use pymanager_launcher::{LaunchError, ResolvedRuntime};
use tracing::debug;

fn target_path() -> Result<PathBuf, LaunchError> {
    let exe = std::env::current_exe()?;
    read_target_file(&target_file_for(&exe))
}

fn main() {
    let argv: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let root = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let config = LauncherConfig::discover(&root);
    logging::init(&config);

    let executable = match target_path() {
        Ok(path) => path,
        Err(err) => {
            debug!("{}", err);
            let code = print_error(err.exit_code(), "Failed to get target path");
            std::process::exit(code as i32);
        }
    };
    debug!("Target runtime is {}", executable.display());

    let runtime = ResolvedRuntime { executable, args: String::new() };
    let code = launch_runtime(&mut NativeDispatcher, &runtime, &argv, 0, &config.fast_path);
    std::process::exit(code as i32);
}
