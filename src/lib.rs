//! Python install manager launchers
//!
//! Native front end for a Python runtime manager. The `pymanager` binary is
//! installed under several aliases (`py`, `python`, `python3`, `pymanager`
//! and their windowed variants). It works out which runtime the user asked
//! for, asks the selection engine to find or install it, and then runs it,
//! in-process when the runtime's stable-ABI library allows it and otherwise
//! as a supervised child process.
//!
//! ## Pieces
//!
//! - **Argument classifier**: `-V:<tag>`, `-3.x` and script detection
//! - **Locator bridge**: typed results from the external selection engine
//! - **Instance gate**: one install/uninstall at a time, machine wide
//! - **Launch primitive**: job-object supervised child with shared console
//! - **Fast path**: `Py_Main` from `python3.dll` without a second process
//!
//! The `python-alias` binary is the small per-runtime launcher that reads
//! its target from a `.__target__` file.

pub mod core;
pub mod launch;
#[cfg(windows)]
pub mod windows;

// Re-exports
pub use core::config::LauncherConfig;
pub use core::error::{LaunchError, LocateError};
pub use launch::{LaunchContext, LaunchRequest, ResolvedRuntime, SelectionEngine};
