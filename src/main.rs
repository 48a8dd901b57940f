//! Python install manager launcher
//!
//! Installed as `py`, `python`, `python3`, `pymanager` and friends; the name
//! it was started under decides how arguments are treated.

#![cfg_attr(all(windows, feature = "windowed"), windows_subsystem = "windows")]

use std::path::PathBuf;

use pymanager_launcher::core::{config::LauncherConfig, logging};
use pymanager_launcher::launch::alias::alias_name;
use pymanager_launcher::LaunchContext;
use tracing::debug;

const WINDOWED: bool = cfg!(feature = "windowed");

fn main() {
    let argv: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let exe = std::env::current_exe()
        .unwrap_or_else(|_| PathBuf::from(argv.first().cloned().unwrap_or_default()));
    let root = exe.parent().map(PathBuf::from).unwrap_or_default();

    let config = LauncherConfig::discover(&root);
    logging::init(&config);

    // Packaged builds bake their alias in; dev builds go by argv[0]
    let alias = match option_env!("PYMANAGER_EXE_NAME") {
        Some(name) => name.to_string(),
        None => alias_name(argv.first().map(String::as_str).unwrap_or("py")).to_string(),
    };
    debug!("Starting as {:?} from {}", alias, root.display());

    let mut context = LaunchContext::native(&root, &alias, WINDOWED, config);
    let code = context.run(&argv);
    drop(context);

    std::process::exit(code as i32);
}
