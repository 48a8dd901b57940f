//! Argument classifier
//!
//! Looks at the launcher's own argv for a runtime tag (`-V:<tag>`, `-3.12`)
//! or, failing that, the first positional argument, which the selection
//! engine uses as a script whose shebang may pick the runtime.

/// How many following arguments an interpreter option consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSkip {
    /// Nothing after this option can be a script path (`-c`, `-m`)
    Stop,
    /// Skip this many extra tokens and keep scanning
    Consume(usize),
}

/// Result of classifying the launcher's argv.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub tag: Option<String>,
    pub script: Option<String>,
    /// Launcher arguments that must not reach the runtime
    pub skip_argc: usize,
}

/// Work out what an option-shaped argument does to the scan.
pub fn args_to_skip(arg: &str) -> ArgSkip {
    let mut consume = 0;
    for c in arg.chars() {
        match c {
            'c' | 'm' => return ArgSkip::Stop,
            'W' | 'X' => consume = 1,
            '-' => {}
            c if c.is_ascii_alphanumeric() => {}
            _ => return ArgSkip::Consume(0),
        }
    }
    ArgSkip::Consume(consume)
}

/// Read a tag from `argv[1 + skip_argc]`.
///
/// Short forms are qualified with `company`: `-3.11` and `-V:3.11` both
/// become `<company>\3.11`. A `-V:` value that already names a company (or
/// does not start with a digit) is kept as given.
pub fn read_tag(argv: &[String], skip_argc: usize, company: &str) -> Option<String> {
    let arg = argv.get(1 + skip_argc)?;
    let rest = arg.strip_prefix(['-', '/'])?;

    if let Some(tag) = rest.strip_prefix("V:") {
        if tag.starts_with(|c: char| c.is_ascii_digit()) && !tag.contains(['\\', '/']) {
            return Some(format!("{company}\\{tag}"));
        }
        return Some(tag.to_string());
    }
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return Some(format!("{company}\\{rest}"));
    }
    None
}

/// Find the first positional argument after `skip_argc` launcher arguments.
pub fn read_script(argv: &[String], skip_argc: usize) -> Option<String> {
    let mut skip = skip_argc;
    for arg in argv.iter().skip(1) {
        if skip > 0 {
            skip -= 1;
            continue;
        }
        if arg.starts_with('-') {
            match args_to_skip(arg) {
                ArgSkip::Stop => return None,
                ArgSkip::Consume(n) => skip = n,
            }
            continue;
        }
        if arg.is_empty() {
            return None;
        }
        return Some(arg.clone());
    }
    None
}

/// Classify argv. A recognized tag counts as a consumed launcher argument and
/// disables script scanning.
pub fn classify(
    argv: &[String],
    skip_argc: usize,
    use_cli_tag: bool,
    use_shebangs: bool,
    company: &str,
) -> Classification {
    let mut result = Classification { skip_argc, ..Default::default() };

    if use_cli_tag {
        if let Some(tag) = read_tag(argv, skip_argc, company) {
            result.tag = Some(tag);
            result.skip_argc += 1;
            return result;
        }
    }

    if use_shebangs {
        result.script = read_script(argv, result.skip_argc);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_args_to_skip() {
        assert_eq!(args_to_skip("-c"), ArgSkip::Stop);
        assert_eq!(args_to_skip("-Bm"), ArgSkip::Stop);
        assert_eq!(args_to_skip("-W"), ArgSkip::Consume(1));
        assert_eq!(args_to_skip("-X"), ArgSkip::Consume(1));
        assert_eq!(args_to_skip("-EX"), ArgSkip::Consume(1));
        assert_eq!(args_to_skip("-E"), ArgSkip::Consume(0));
        assert_eq!(args_to_skip("--version"), ArgSkip::Consume(0));
        assert_eq!(args_to_skip("-Wdefault=x"), ArgSkip::Consume(0));
    }

    #[test]
    fn test_long_tag() {
        let a = argv(&["py.exe", "-V:3.12", "script.py"]);
        let c = classify(&a, 0, true, true, "PythonCore");
        assert_eq!(c.tag.as_deref(), Some("PythonCore\\3.12"));
        assert_eq!(c.script, None);
        assert_eq!(c.skip_argc, 1);
    }

    #[test]
    fn test_long_tag_with_company_is_verbatim() {
        let a = argv(&["py", "-V:Contoso\\3.12-64"]);
        assert_eq!(read_tag(&a, 0, "PythonCore").as_deref(), Some("Contoso\\3.12-64"));
        let a = argv(&["py", "/V:venv"]);
        assert_eq!(read_tag(&a, 0, "PythonCore").as_deref(), Some("venv"));
    }

    #[test]
    fn test_short_tag_suppresses_script() {
        let a = argv(&["py", "-3.11", "script.py"]);
        let c = classify(&a, 0, true, true, "PythonCore");
        assert_eq!(c.tag.as_deref(), Some("PythonCore\\3.11"));
        assert_eq!(c.script, None);
        assert_eq!(c.skip_argc, 1);
        // Same answer every time
        assert_eq!(classify(&a, 0, true, true, "PythonCore"), c);
    }

    #[test]
    fn test_not_a_tag() {
        let a = argv(&["py", "-E", "x.py"]);
        assert_eq!(read_tag(&a, 0, "PythonCore"), None);
        let a = argv(&["py", "script.py"]);
        assert_eq!(read_tag(&a, 0, "PythonCore"), None);
        let a = argv(&["py"]);
        assert_eq!(read_tag(&a, 0, "PythonCore"), None);
        let a = argv(&["py", ""]);
        assert_eq!(read_tag(&a, 0, "PythonCore"), None);
    }

    #[test]
    fn test_tag_after_exec() {
        let a = argv(&["py", "exec", "-V:3.13", "x.py"]);
        let c = classify(&a, 1, true, true, "PythonCore");
        assert_eq!(c.tag.as_deref(), Some("PythonCore\\3.13"));
        assert_eq!(c.skip_argc, 2);
    }

    #[test]
    fn test_python_alias_scans_script() {
        let a = argv(&["python.exe", "myscript.py"]);
        let c = classify(&a, 0, false, true, "PythonCore");
        assert_eq!(c.tag, None);
        assert_eq!(c.script.as_deref(), Some("myscript.py"));
        assert_eq!(c.skip_argc, 0);

        // Tag parsing is off, so a tag-shaped option is just an option
        let a = argv(&["python.exe", "-3", "myscript.py"]);
        let c = classify(&a, 0, false, true, "PythonCore");
        assert_eq!(c.tag, None);
        assert_eq!(c.script.as_deref(), Some("myscript.py"));
    }

    #[test]
    fn test_module_and_command_never_scan() {
        for args in [
            &["py", "-m", "pip", "install", "x"][..],
            &["py", "-c", "print(1)", "x.py"][..],
            &["py", "-E", "-m", "x.py"][..],
            &["py", "-X", "dev", "-c", "x.py"][..],
        ] {
            assert_eq!(read_script(&argv(args), 0), None, "{args:?}");
        }
    }

    #[test]
    fn test_options_consuming_values() {
        let a = argv(&["py", "-W", "error", "-X", "utf8", "-E", "run.py", "arg"]);
        assert_eq!(read_script(&a, 0).as_deref(), Some("run.py"));
        // A value glued to -W still leaves the next token alone once a
        // separator shows up
        let a = argv(&["py", "-Werror::Warning", "run.py"]);
        assert_eq!(read_script(&a, 0).as_deref(), Some("run.py"));
    }

    #[test]
    fn test_skip_matches_launcher_position() {
        // Skipping N launcher arguments is the same as scanning argv without them
        let full = argv(&["py", "exec", "-V:x", "-u", "a.py", "b"]);
        let trimmed = argv(&["py", "-u", "a.py", "b"]);
        assert_eq!(read_script(&full, 2), read_script(&trimmed, 0));
    }
}
