//! Bridge to the runtime selection engine
//!
//! Version resolution, installs and listing live in the external `manage`
//! package. We drive it through the bundled interpreter and only carry typed
//! results back across the boundary.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::LauncherConfig;
use crate::core::error::{LaunchError, LocateError};

/// Inputs for one `find_one` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateRequest {
    pub root: PathBuf,
    pub tag: String,
    pub script: String,
    pub windowed: bool,
    pub autoinstall_permitted: bool,
    pub print_not_found: bool,
}

/// The runtime chosen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRuntime {
    pub executable: PathBuf,
    /// Extra arguments, already quoted, inserted before the user's own
    #[serde(default)]
    pub args: String,
}

pub trait SelectionEngine {
    fn find_one(&mut self, request: &LocateRequest) -> Result<ResolvedRuntime, LocateError>;

    /// Run a management command (`argv[0]` is the launcher) and return its
    /// exit code.
    fn run_command(&mut self, argv: &[String]) -> Result<u32, LaunchError>;
}

const FIND_ONE_SNIPPET: &str = r#"
import importlib, json, sys
manage = importlib.import_module(sys.argv[1])
manage._set_exe_name(sys.argv[2])
try:
    exe, args = manage.find_one(sys.argv[3], sys.argv[4], sys.argv[5],
                                int(sys.argv[6]), int(sys.argv[7]), int(sys.argv[8]))
except manage.NoInstallsError:
    reply = {"error": "no-installs"}
except manage.NoInstallFoundError:
    reply = {"error": "no-install-found"}
except manage.AutomaticInstallDisabledError:
    reply = {"error": "auto-install-disabled"}
else:
    reply = {"executable": str(exe), "args": str(args or "")}
sys.stdout.flush()
print(json.dumps(reply))
"#;

const RUN_COMMAND_SNIPPET: &str = r#"
import importlib, sys
manage = importlib.import_module(sys.argv[1])
manage._set_exe_name(sys.argv[2])
sys.exit(manage.main(sys.argv[4:], sys.argv[3]))
"#;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reply {
    Found(ResolvedRuntime),
    Failed { error: String },
}

/// Interpret the engine's stdout. The reply is the last non-empty line;
/// anything before it is engine output meant for the user.
pub fn parse_reply(stdout: &str) -> (Result<ResolvedRuntime, LocateError>, Vec<&str>) {
    let mut lines: Vec<&str> = stdout.lines().collect();
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let Some(last) = lines.pop() else {
        return (Err(LocateError::Internal(1)), lines);
    };

    let result = match serde_json::from_str::<Reply>(last.trim()) {
        Ok(Reply::Found(runtime)) => Ok(runtime),
        Ok(Reply::Failed { error }) => Err(match error.as_str() {
            "no-installs" => LocateError::NoInstalls,
            "no-install-found" => LocateError::NoInstallFound,
            "auto-install-disabled" => LocateError::AutoInstallDisabled,
            _ => LocateError::Internal(1),
        }),
        Err(e) => {
            debug!("Unparseable engine reply {:?}: {}", last, e);
            lines.push(last);
            Err(LocateError::Internal(1))
        }
    };
    (result, lines)
}

/// Production engine: the `manage` package run by the bundled interpreter.
pub struct ManageEngine {
    root: PathBuf,
    exe_name: String,
    python: PathBuf,
    module: String,
    import_time: bool,
    windowed: bool,
}

impl ManageEngine {
    pub fn new(root: &Path, exe_name: &str, config: &LauncherConfig, windowed: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            exe_name: exe_name.to_string(),
            python: config.engine_python(root),
            module: config.engine.module.clone(),
            import_time: config.import_time,
            windowed,
        }
    }

    fn command(&self, snippet: &str) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-I");
        if self.import_time {
            cmd.args(["-X", "importtime"]);
        }
        cmd.arg("-c").arg(snippet).arg(&self.module).arg(&self.exe_name);
        #[cfg(windows)]
        if self.windowed {
            use std::os::windows::process::CommandExt;
            // CREATE_NO_WINDOW
            cmd.creation_flags(0x0800_0000);
        }
        cmd
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

impl SelectionEngine for ManageEngine {
    fn find_one(&mut self, request: &LocateRequest) -> Result<ResolvedRuntime, LocateError> {
        info!(
            "Locating runtime (tag={:?}, script={:?}, autoinstall={})",
            request.tag, request.script, request.autoinstall_permitted
        );
        let output = self
            .command(FIND_ONE_SNIPPET)
            .arg(&request.root)
            .arg(&request.tag)
            .arg(&request.script)
            .arg(flag(request.windowed || self.windowed))
            .arg(flag(request.autoinstall_permitted))
            .arg(flag(request.print_not_found))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| {
                debug!("Failed to start {}: {}", self.python.display(), e);
                LocateError::Internal(crate::core::error::io_error_code(&e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (result, passthrough) = parse_reply(&stdout);
        for line in passthrough {
            println!("{line}");
        }
        if !output.status.success() {
            // Tracebacks were already printed to stderr
            let code = output.status.code().map(|c| c as u32).unwrap_or(1);
            return Err(LocateError::Internal(code));
        }
        if let Ok(runtime) = &result {
            debug!("Engine selected {} {}", runtime.executable.display(), runtime.args);
        }
        result
    }

    fn run_command(&mut self, argv: &[String]) -> Result<u32, LaunchError> {
        info!("Running command {:?}", argv.get(1..).unwrap_or_default());
        let status = self
            .command(RUN_COMMAND_SNIPPET)
            .arg(&self.root)
            .args(argv)
            .status()?;
        Ok(status.code().map(|c| c as u32).unwrap_or(1))
    }
}
