//! Launch orchestration
//!
//! Classifies the command line, asks the selection engine for a runtime,
//! installs one through the gate when allowed, and finally runs it either
//! in-process or as a child. The returned value is the process exit code.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::alias::{is_subcommand, AliasPolicy, EXEC_COMMAND, HELP_WITH_ERROR_COMMAND};
use super::args::{classify, Classification};
use super::dispatch::{launch_runtime, NativeDispatcher, RuntimeDispatcher};
use super::gate::InstanceGate;
use super::locator::{LocateRequest, ManageEngine, ResolvedRuntime, SelectionEngine};
use super::target::format_error;
use crate::core::config::LauncherConfig;
use crate::core::error::{LaunchError, LocateError, BUG_REPORT_URL};

/// Everything one launcher invocation needs, created once at startup.
pub struct LaunchContext {
    root: PathBuf,
    alias: String,
    windowed: bool,
    config: LauncherConfig,
    engine: Box<dyn SelectionEngine>,
    dispatcher: Box<dyn RuntimeDispatcher>,
    gate: InstanceGate,
}

impl LaunchContext {
    pub fn new(
        root: impl Into<PathBuf>,
        alias: impl Into<String>,
        windowed: bool,
        config: LauncherConfig,
        engine: Box<dyn SelectionEngine>,
        dispatcher: Box<dyn RuntimeDispatcher>,
    ) -> Self {
        let gate = InstanceGate::new(&config.gate);
        Self {
            root: root.into(),
            alias: alias.into(),
            windowed,
            config,
            engine,
            dispatcher,
            gate,
        }
    }

    /// Production context backed by the bundled `manage` engine.
    pub fn native(root: &Path, alias: &str, windowed: bool, config: LauncherConfig) -> Self {
        let engine = ManageEngine::new(root, alias, &config, windowed);
        Self::new(root, alias, windowed, config, Box::new(engine), Box::new(NativeDispatcher))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Handle one invocation and return the exit code.
    pub fn run(&mut self, argv: &[String]) -> u32 {
        let mut policy = AliasPolicy::resolve(&self.alias, argv, self.windowed);
        let mut skip_argc = 0;
        debug!("Alias {:?} resolved to {:?}", self.alias, policy);

        if policy.commands {
            let first = argv.get(1).map(String::as_str).unwrap_or_default();
            if is_subcommand(first) {
                return self.gated_command(argv.to_vec());
            }
            if first == EXEC_COMMAND {
                skip_argc += 1;
                policy.cli_tag = argv.len() >= 3;
                policy.shebangs = argv.len() >= 3;
                policy.default_command = None;
            }
        }

        let argv0 = argv.first().cloned().unwrap_or_else(|| self.alias.clone());
        match policy.default_command {
            Some(HELP_WITH_ERROR_COMMAND) => {
                let arg = argv.get(1).cloned().unwrap_or_default();
                return self.gated_command(vec![argv0, HELP_WITH_ERROR_COMMAND.into(), arg]);
            }
            Some(command) => return self.command(vec![argv0, command.into()]),
            None => {}
        }

        let classification =
            classify(argv, skip_argc, policy.cli_tag, policy.shebangs, &self.config.company);
        debug!("Classified arguments: {:?}", classification);

        let runtime = match self.locate(&argv0, &classification, policy.autoinstall) {
            Ok(runtime) => runtime,
            Err(code) => return code,
        };
        launch_runtime(
            self.dispatcher.as_mut(),
            &runtime,
            argv,
            classification.skip_argc,
            &self.config.fast_path,
        )
    }

    fn request(&self, classification: &Classification, autoinstall: bool, print: bool) -> LocateRequest {
        LocateRequest {
            root: self.root.clone(),
            tag: classification.tag.clone().unwrap_or_default(),
            script: classification.script.clone().unwrap_or_default(),
            windowed: self.windowed,
            autoinstall_permitted: autoinstall,
            print_not_found: print,
        }
    }

    /// Find a runtime, installing one if the engine reports none match and
    /// `autoinstall` allows it. `Err` carries the exit code; any message has
    /// already been shown.
    fn locate(
        &mut self,
        argv0: &str,
        classification: &Classification,
        autoinstall: bool,
    ) -> Result<ResolvedRuntime, u32> {
        let request = self.request(classification, autoinstall, false);
        let mut result = self.engine.find_one(&request);

        if let Err(err) = &result {
            if err.is_not_found() && autoinstall {
                info!("No matching runtime ({}); trying automatic install", err);
                let code = self.auto_install(argv0, classification);
                if code != 0 {
                    return Err(code);
                }
                let request = self.request(classification, autoinstall, true);
                result = self.engine.find_one(&request);
            } else if err.is_not_found() {
                debug!("No matching runtime ({}); automatic install not permitted", err);
            }
        }

        result.map_err(|err| match err {
            LocateError::Internal(code) => {
                eprintln!("INTERNAL ERROR 0x{code:08X}. Please report to {BUG_REPORT_URL}");
                code
            }
            // The engine already explained these
            other => other.exit_code(),
        })
    }

    fn auto_install(&mut self, argv0: &str, classification: &Classification) -> u32 {
        let mut argv = vec![argv0.to_string(), "install".into(), "--automatic".into()];
        if let Some(tag) = &classification.tag {
            argv.push(tag.clone());
        } else if let Some(script) = &classification.script {
            argv.push("--from-script".into());
            argv.push(script.clone());
        }
        self.gated_command(argv)
    }

    fn command(&mut self, argv: Vec<String>) -> u32 {
        match self.engine.run_command(&argv) {
            Ok(code) => code,
            Err(err) => report_command_failure(&err),
        }
    }

    /// Run a management command while holding the single-instance gate.
    fn gated_command(&mut self, argv: Vec<String>) -> u32 {
        let engine = &mut self.engine;
        match self.gate.run(|| engine.run_command(&argv)) {
            Ok(Ok(code)) => code,
            Ok(Err(err)) | Err(err) => report_command_failure(&err),
        }
    }
}

fn report_command_failure(err: &LaunchError) -> u32 {
    eprintln!("{}", format_error(err.exit_code(), &format!("Failed to run command: {err}")));
    err.exit_code()
}
