//! Launch pipeline shared by `pymanager` and `python-alias`

pub mod alias;
pub mod args;
pub mod cmdline;
pub mod dispatch;
pub mod fastpath;
pub mod gate;
pub mod locator;
pub mod orchestrator;
pub mod process;
pub mod target;

pub use locator::{LocateRequest, ManageEngine, ResolvedRuntime, SelectionEngine};
pub use dispatch::{launch_runtime, NativeDispatcher, RuntimeDispatcher};
pub use orchestrator::LaunchContext;
pub use process::LaunchRequest;
