//! Windows command-line codec
//!
//! The child's command line is rebuilt from the launcher's raw command line
//! rather than from parsed argv so user quoting survives untouched. Splitting
//! and quoting follow `CommandLineToArgvW`:
//!
//! * argv[0] ends at the closing quote if it starts with one, otherwise at
//!   the first space or tab. No escapes apply inside it.
//! * Other arguments are separated by unquoted spaces or tabs.
//! * `2n` backslashes before a quote give `n` backslashes and the quote
//!   toggles quoting; `2n + 1` give `n` backslashes and a literal quote.
//! * `""` inside a quoted run is a literal quote.
//! * Backslashes not followed by a quote are literal.

use std::borrow::Cow;

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Split off the program token, returning the text that follows it.
///
/// The returned slice starts at the delimiter (or is empty).
pub fn skip_program_token(cmdline: &str) -> &str {
    let bytes = cmdline.as_bytes();
    if bytes.first() == Some(&b'"') {
        match bytes[1..].iter().position(|&b| b == b'"') {
            Some(i) => &cmdline[i + 2..],
            None => "",
        }
    } else {
        match bytes.iter().position(|&b| is_blank(b)) {
            Some(i) => &cmdline[i..],
            None => "",
        }
    }
}

/// Parse one argument from the front of `s`, skipping leading blanks.
///
/// Returns `None` when only blanks remain. Otherwise returns the decoded
/// argument and the rest of the input starting at the delimiter.
fn next_arg(s: &str) -> Option<(String, &str)> {
    let bytes = s.as_bytes();
    let mut i = bytes.iter().position(|&b| !is_blank(b))?;
    let mut out: Vec<u8> = Vec::new();
    let mut in_quotes = false;

    while i < bytes.len() {
        match bytes[i] {
            b if is_blank(b) && !in_quotes => break,
            b'\\' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'\\').count();
                i += run;
                if bytes.get(i) == Some(&b'"') {
                    out.extend(std::iter::repeat(b'\\').take(run / 2));
                    if run % 2 == 1 {
                        out.push(b'"');
                        i += 1;
                    }
                } else {
                    out.extend(std::iter::repeat(b'\\').take(run));
                }
            }
            b'"' => {
                i += 1;
                if in_quotes && bytes.get(i) == Some(&b'"') {
                    out.push(b'"');
                    i += 1;
                } else {
                    in_quotes = !in_quotes;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    // Only ever split at ASCII bytes, so the buffer is still valid UTF-8
    Some((String::from_utf8_lossy(&out).into_owned(), &s[i..]))
}

/// Skip `count` arguments after the program token.
pub fn skip_args(mut rest: &str, count: usize) -> &str {
    for _ in 0..count {
        match next_arg(rest) {
            Some((_, tail)) => rest = tail,
            None => return "",
        }
    }
    rest
}

/// Split a command line into argv the way `CommandLineToArgvW` does.
pub fn split_command_line(cmdline: &str) -> Vec<String> {
    if cmdline.is_empty() {
        return Vec::new();
    }
    let rest = skip_program_token(cmdline);
    let program = &cmdline[..cmdline.len() - rest.len()];
    let program = program.strip_prefix('"').unwrap_or(program);
    let program = program.strip_suffix('"').unwrap_or(program);

    let mut args = vec![program.to_string()];
    let mut rest = rest;
    while let Some((arg, tail)) = next_arg(rest) {
        args.push(arg);
        rest = tail;
    }
    args
}

/// Quote a single argument so that [`split_command_line`] returns it unchanged.
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty() && !arg.contains([' ', '\t', '\n', '\x0b', '"']) {
        return Cow::Borrowed(arg);
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                out.push('"');
                backslashes = 0;
            }
            _ => {
                out.extend(std::iter::repeat('\\').take(backslashes));
                backslashes = 0;
                out.push(c);
            }
        }
    }
    out.extend(std::iter::repeat('\\').take(backslashes * 2));
    out.push('"');
    Cow::Owned(out)
}

/// Build a command line from an argv vector.
///
/// The program token gets plain quotes since argv[0] has no escapes.
pub fn join_args<S: AsRef<str>>(argv: &[S]) -> String {
    let mut out = String::new();
    for (i, arg) in argv.iter().enumerate() {
        let arg = arg.as_ref();
        if i == 0 {
            if arg.is_empty() || arg.contains([' ', '\t']) {
                out.push('"');
                out.push_str(arg);
                out.push('"');
            } else {
                out.push_str(arg);
            }
        } else {
            out.push(' ');
            out.push_str(&quote_arg(arg));
        }
    }
    out
}

/// Rebuild the child's command line.
///
/// The launcher's program token is replaced with the quoted `executable`,
/// followed by `inserted` (verbatim, when non-empty), followed by whatever
/// remains of `original` after skipping `skip_argc` arguments. Only the one
/// delimiter after the last consumed token is dropped; the remainder is
/// otherwise copied byte for byte.
pub fn build_child_command_line(
    original: &str,
    executable: &str,
    inserted: &str,
    skip_argc: usize,
) -> String {
    let rest = skip_args(skip_program_token(original), skip_argc);
    let rest = rest.strip_prefix([' ', '\t']).unwrap_or(rest);

    let mut out = String::with_capacity(executable.len() + inserted.len() + rest.len() + 4);
    out.push('"');
    out.push_str(executable);
    out.push('"');
    if !inserted.is_empty() {
        out.push(' ');
        out.push_str(inserted);
    }
    if !rest.is_empty() {
        out.push(' ');
        out.push_str(rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_token() {
        assert_eq!(skip_program_token("py.exe a b"), " a b");
        assert_eq!(skip_program_token("\"C:\\Program Files\\py.exe\" a"), " a");
        assert_eq!(skip_program_token("py.exe"), "");
        assert_eq!(skip_program_token("\"unterminated"), "");
    }

    #[test]
    fn test_split_basic() {
        assert_eq!(
            split_command_line("\"C:\\My Py\\py.exe\" -V:3.12 \"my script.py\" x"),
            vec!["C:\\My Py\\py.exe", "-V:3.12", "my script.py", "x"]
        );
        assert_eq!(split_command_line("py   a\tb  "), vec!["py", "a", "b"]);
        assert!(split_command_line("").is_empty());
    }

    #[test]
    fn test_split_backslashes_and_quotes() {
        assert_eq!(split_command_line(r#"p a\\\"b"#), vec!["p", r#"a\"b"#]);
        assert_eq!(split_command_line(r#"p "a\\" b"#), vec!["p", r"a\", "b"]);
        assert_eq!(split_command_line(r"p C:\dir\ x"), vec!["p", r"C:\dir\", "x"]);
        assert_eq!(split_command_line(r#"p "say ""hi""""#), vec!["p", r#"say "hi""#]);
    }

    #[test]
    fn test_quote_arg_is_split_inverse() {
        for arg in ["plain", "", "two words", r#"a"b"#, r"trailing\", r#"c:\x y\"#, "tab\there"] {
            let line = format!("p {}", quote_arg(arg));
            assert_eq!(split_command_line(&line), vec!["p".to_string(), arg.to_string()], "{line}");
        }
        assert!(matches!(quote_arg("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_build_replaces_program_token_only() {
        let original = "py.exe  -c \"print('a  b')\"   x";
        let built = build_child_command_line(original, "C:\\Python\\python.exe", "", 0);
        assert_eq!(built, "\"C:\\Python\\python.exe\"  -c \"print('a  b')\"   x");
    }

    #[test]
    fn test_build_keeps_spacing_after_program_token() {
        for original in ["py.exe a", "py.exe   a  b", "\"C:\\Tools\\py.exe\"  -c pass"] {
            let built = build_child_command_line(original, "C:\\x.exe", "", 0);
            let rest = skip_program_token(original);
            assert_eq!(built, format!("\"C:\\x.exe\"{rest}"), "{original}");
        }

        // Extra blanks after a skipped token survive too
        let built = build_child_command_line("py -3.12   app.py", "C:\\x.exe", "", 1);
        assert_eq!(built, "\"C:\\x.exe\"   app.py");
    }

    #[test]
    fn test_build_with_skip_and_insert() {
        let original = "\"C:\\Tools\\py.exe\" -V:3.12 script.py arg";
        let built = build_child_command_line(original, "C:\\Py\\python.exe", "-E", 1);
        assert_eq!(built, "\"C:\\Py\\python.exe\" -E script.py arg");

        // exec plus a tag
        let original = "py exec -3.11 -m pip";
        let built = build_child_command_line(original, "C:\\Py\\python.exe", "", 2);
        assert_eq!(built, "\"C:\\Py\\python.exe\" -m pip");
    }

    #[test]
    fn test_build_skip_respects_quoted_token() {
        let original = "py \"-V:Company\\Tag With Space\" script.py";
        let built = build_child_command_line(original, "C:\\x.exe", "", 1);
        assert_eq!(built, "\"C:\\x.exe\" script.py");
    }

    #[test]
    fn test_build_without_remainder() {
        assert_eq!(build_child_command_line("py.exe", "C:\\x.exe", "", 0), "\"C:\\x.exe\"");
        assert_eq!(build_child_command_line("py.exe -3", "C:\\x.exe", "", 1), "\"C:\\x.exe\"");
        assert_eq!(build_child_command_line("py.exe", "C:\\x.exe", "-I", 5), "\"C:\\x.exe\" -I");
    }

    #[test]
    fn test_skip_agrees_with_split() {
        let original = "py \"a b\" c\\\"d e f";
        let argv = split_command_line(original);
        for skip in 0..argv.len() {
            let rest = skip_args(skip_program_token(original), skip);
            let tail = split_command_line(&format!("p{rest}"));
            assert_eq!(&tail[1..], &argv[1 + skip..]);
        }
    }

    #[test]
    fn test_join_args() {
        assert_eq!(join_args(&["py", "a b", "c"]), "py \"a b\" c");
        assert_eq!(join_args(&["C:\\My Py\\py.exe"]), "\"C:\\My Py\\py.exe\"");
        let argv = ["C:\\My Py\\py.exe", "-c", "print(\"x\")"];
        assert_eq!(split_command_line(&join_args(&argv)), argv);
    }
}
