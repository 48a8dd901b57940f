//! Configuration for the launchers

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up next to the launcher executable
pub const CONFIG_FILE_NAME: &str = "pymanager-launcher.toml";

/// Main launcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Company prefix used for short `-3.x` tags
    pub company: String,

    /// Single-instance gate settings
    pub gate: GateConfig,

    /// How to reach the selection engine
    pub engine: EngineConfig,

    /// In-process launch settings
    pub fast_path: FastPathConfig,

    /// Log fast-path fallbacks and engine invocations
    pub verbose: bool,

    /// Log everything, including expected fallbacks
    pub debug: bool,

    /// Ask the engine's interpreter for import timings
    pub import_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Systemwide name of the semaphore (or lock file stem)
    pub name: String,

    /// Bounded wait before printing the "waiting" notice (milliseconds)
    pub notice_after_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory of the bundled runtime, relative to the root
    pub runtime_dir: PathBuf,

    /// Interpreter executable inside `runtime_dir`
    pub python: PathBuf,

    /// Importable package that implements the selection engine
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastPathConfig {
    /// Stable-ABI library loaded from the target's directory
    pub dll_name: String,

    /// Lowest accepted `Py_Version` (inclusive)
    pub min_version: u32,

    /// First rejected `Py_Version` (exclusive)
    pub max_version: u32,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            company: "PythonCore".into(),
            gate: GateConfig::default(),
            engine: EngineConfig::default(),
            fast_path: FastPathConfig::default(),
            verbose: false,
            debug: false,
            import_time: false,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            name: "PyManager-OperationInProgress".into(),
            notice_after_ms: 3000,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            runtime_dir: PathBuf::from("runtime"),
            python: PathBuf::from(if cfg!(windows) { "python.exe" } else { "python3" }),
            module: "manage".into(),
        }
    }
}

impl Default for FastPathConfig {
    fn default() -> Self {
        Self {
            dll_name: "python3.dll".into(),
            min_version: 0x030A_0000,
            max_version: 0x0400_0000,
        }
    }
}

impl LauncherConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Config file next to the launcher if it exists, defaults otherwise.
    /// Environment flags are applied on top in both cases.
    pub fn discover(root: &Path) -> Self {
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = if path.is_file() {
            match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var_os(name).map(|v| !v.is_empty()).unwrap_or(false));
        config
    }

    /// Override flags from `PYMANAGER_*` variables. Only non-empty values count.
    pub fn apply_env(&mut self, is_set: impl Fn(&str) -> bool) {
        if is_set("PYMANAGER_VERBOSE") {
            self.verbose = true;
        }
        if is_set("PYMANAGER_DEBUG") {
            self.debug = true;
            self.verbose = true;
        }
        if is_set("PYMANAGER_IMPORT_TIME") {
            self.import_time = true;
        }
    }

    /// Absolute path of the selection engine's interpreter.
    pub fn engine_python(&self, root: &Path) -> PathBuf {
        root.join(&self.engine.runtime_dir).join(&self.engine.python)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LauncherConfig::default();
        assert_eq!(config.company, "PythonCore");
        assert_eq!(config.gate.name, "PyManager-OperationInProgress");
        assert_eq!(config.gate.notice_after_ms, 3000);
        assert_eq!(config.fast_path.min_version, 0x030A0000);
        assert_eq!(config.fast_path.max_version, 0x04000000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "company = \"Contoso\"\n[gate]\nnotice_after_ms = 10\n").unwrap();

        let config = LauncherConfig::load(&path).unwrap();
        assert_eq!(config.company, "Contoso");
        assert_eq!(config.gate.notice_after_ms, 10);
        assert_eq!(config.gate.name, "PyManager-OperationInProgress");
        assert_eq!(config.engine.module, "manage");
    }

    #[test]
    fn test_save_then_discover() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LauncherConfig::default();
        config.fast_path.dll_name = "python313.dll".into();
        config.save(&dir.path().join(CONFIG_FILE_NAME)).unwrap();

        let found = LauncherConfig::discover(dir.path());
        assert_eq!(found.fast_path.dll_name, "python313.dll");
    }

    #[test]
    fn test_env_flags() {
        let mut config = LauncherConfig::default();
        config.apply_env(|name| name == "PYMANAGER_DEBUG");
        assert!(config.debug);
        assert!(config.verbose);
        assert!(!config.import_time);

        let mut config = LauncherConfig::default();
        config.apply_env(|name| name == "PYMANAGER_IMPORT_TIME");
        assert!(config.import_time);
        assert!(!config.verbose);
    }
}
