//! Per-alias launcher behaviour
//!
//! One executable is installed under several names. The name it was invoked
//! as decides which features are active; everything else is shared.

/// Subcommands implemented by the selection engine.
pub const SUBCOMMANDS: &[&str] = &[
    "--list",
    "--list-paths",
    "-0",
    "-0p",
    "help",
    "install",
    "list",
    "uninstall",
];

/// Subcommand handled natively: launch with the remaining arguments.
pub const EXEC_COMMAND: &str = "exec";

/// Shown when `pymanager` gets an argument it does not recognize.
pub const HELP_WITH_ERROR_COMMAND: &str = "__help_with_error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AliasKind {
    /// `python`, `python3`: behave like the interpreter itself
    Python,
    /// `py`: the classic launcher with tags and subcommands
    Py,
    /// `pymanager`: management only
    Manager,
}

const ALIASES: &[(&str, AliasKind)] = &[
    ("python", AliasKind::Python),
    ("python3", AliasKind::Python),
    ("py", AliasKind::Py),
    ("pymanager", AliasKind::Manager),
];

/// Feature switches for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasPolicy {
    /// Command to run instead of launching anything
    pub default_command: Option<&'static str>,
    /// `argv[1]` may name a subcommand
    pub commands: bool,
    /// `argv[1]` may carry a `-V:`/`-3` tag
    pub cli_tag: bool,
    /// The first positional argument is a script to inspect
    pub shebangs: bool,
    /// Missing runtimes may be installed automatically
    pub autoinstall: bool,
}

impl AliasPolicy {
    /// Look up the policy for `alias` given the full argv.
    ///
    /// Windowed launches never auto-install.
    pub fn resolve(alias: &str, argv: &[String], windowed: bool) -> Self {
        let has_args = argv.len() >= 2;
        let is_exec = argv.get(1).map(|a| a == EXEC_COMMAND).unwrap_or(false);

        let kind = ALIASES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(alias))
            .map(|(_, kind)| *kind);

        let mut policy = match kind {
            Some(AliasKind::Python) => AliasPolicy {
                default_command: None,
                commands: false,
                cli_tag: false,
                shebangs: has_args,
                autoinstall: false,
            },
            Some(AliasKind::Py) => AliasPolicy {
                default_command: None,
                commands: has_args,
                cli_tag: has_args,
                shebangs: has_args,
                autoinstall: has_args && is_exec,
            },
            Some(AliasKind::Manager) => AliasPolicy {
                default_command: Some(if has_args { HELP_WITH_ERROR_COMMAND } else { "help" }),
                commands: has_args,
                cli_tag: false,
                shebangs: false,
                autoinstall: has_args && is_exec,
            },
            // Direct launches, Start menu, file associations
            None => AliasPolicy {
                default_command: None,
                commands: has_args,
                cli_tag: true,
                shebangs: true,
                autoinstall: true,
            },
        };

        if windowed {
            policy.autoinstall = false;
        }
        policy
    }
}

/// Derive the alias name from argv[0].
///
/// Takes the file name, drops the extension, and strips one trailing `w`
/// (`pyw.exe` is `py`). Names without an extension are used as they are.
pub fn alias_name(argv0: &str) -> &str {
    let name = match argv0.rfind(['\\', '/']) {
        Some(i) => &argv0[i + 1..],
        None => argv0,
    };
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let stem = &name[..dot];
            if stem.len() > 1 && stem.ends_with(['w', 'W']) {
                &stem[..stem.len() - 1]
            } else {
                stem
            }
        }
        _ => name,
    }
}

/// Whether `arg` names a subcommand implemented by the selection engine.
pub fn is_subcommand(arg: &str) -> bool {
    SUBCOMMANDS.contains(&arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alias_name() {
        assert_eq!(alias_name("C:\\Users\\me\\AppData\\Local\\Microsoft\\WindowsApps\\py.exe"), "py");
        assert_eq!(alias_name("pyw.exe"), "py");
        assert_eq!(alias_name("PythonW.EXE"), "Python");
        assert_eq!(alias_name("python3.exe"), "python3");
        assert_eq!(alias_name("/usr/local/bin/python3"), "python3");
        // No extension, no stripping
        assert_eq!(alias_name("pythonw"), "pythonw");
        assert_eq!(alias_name("w.exe"), "w");
        assert_eq!(alias_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_python_alias() {
        let p = AliasPolicy::resolve("python", &argv(&["python.exe", "myscript.py"]), false);
        assert!(!p.commands);
        assert!(!p.cli_tag);
        assert!(p.shebangs);
        assert!(!p.autoinstall);
        assert_eq!(p.default_command, None);

        let p = AliasPolicy::resolve("Python3", &argv(&["python3"]), false);
        assert!(!p.shebangs);
    }

    #[test]
    fn test_py_alias() {
        let p = AliasPolicy::resolve("py", &argv(&["py"]), false);
        assert!(!p.commands && !p.cli_tag && !p.shebangs && !p.autoinstall);

        let p = AliasPolicy::resolve("py", &argv(&["py", "-3"]), false);
        assert!(p.commands && p.cli_tag && p.shebangs);
        assert!(!p.autoinstall);

        let p = AliasPolicy::resolve("py", &argv(&["py", "exec", "-3"]), false);
        assert!(p.autoinstall);
        let p = AliasPolicy::resolve("py", &argv(&["py", "exec", "-3"]), true);
        assert!(!p.autoinstall);
    }

    #[test]
    fn test_pymanager_alias() {
        let p = AliasPolicy::resolve("pymanager", &argv(&["pymanager"]), false);
        assert_eq!(p.default_command, Some("help"));
        assert!(!p.commands);

        let p = AliasPolicy::resolve("pymanager", &argv(&["pymanager", "bogus"]), false);
        assert_eq!(p.default_command, Some(HELP_WITH_ERROR_COMMAND));
        assert!(p.commands);
        assert!(!p.cli_tag && !p.shebangs);
    }

    #[test]
    fn test_direct_launch() {
        let p = AliasPolicy::resolve("python3.13", &argv(&["python3.13"]), false);
        assert!(!p.commands);
        assert!(p.cli_tag && p.shebangs && p.autoinstall);

        let p = AliasPolicy::resolve("anything", &argv(&["anything", "x.py"]), true);
        assert!(!p.autoinstall);
    }

    #[test]
    fn test_subcommands() {
        assert!(is_subcommand("install"));
        assert!(is_subcommand("-0p"));
        assert!(!is_subcommand(EXEC_COMMAND));
        assert!(!is_subcommand(HELP_WITH_ERROR_COMMAND));
    }
}
