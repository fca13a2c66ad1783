//! POSIX shell stand-ins for the external evaluation tool.
//!
//! Every stub appends its arguments to a log file (one argument per line, invocations
//! separated by `--end--`) so tests can inspect the temporary paths it was handed.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

const END_MARKER: &str = "--end--";

#[derive(Clone, Debug)]
pub struct StubTool {
    pub path: Utf8PathBuf,
    pub log: Utf8PathBuf,
}

/// One recorded invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
}

impl Invocation {
    /// Value following `flag`, e.g. `--bundle` or `-i`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let idx = self.args.iter().position(|a| a == flag)?;
        self.args.get(idx + 1).map(String::as_str)
    }

    pub fn entrypoint(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

impl StubTool {
    pub fn invocations(&self) -> io::Result<Vec<Invocation>> {
        let text = match std::fs::read_to_string(&self.log) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut out = Vec::new();
        let mut args = Vec::new();
        for line in text.lines() {
            if line == END_MARKER {
                out.push(Invocation {
                    args: std::mem::take(&mut args),
                });
            } else {
                args.push(line.to_string());
            }
        }
        Ok(out)
    }
}

/// A stub printing `stdout` for entrypoints ending in each rule name, `{}` otherwise, and
/// exiting 0. The input file is copied to `<log>.input` on every call.
pub fn answering(dir: &Utf8Path, answers: &[(&str, &str)]) -> io::Result<StubTool> {
    let mut cases = String::new();
    for (suffix, stdout) in answers {
        cases.push_str(&format!(
            "  *{suffix}) printf '%s\\n' {} ;;\n",
            shell_quote(stdout)
        ));
    }
    cases.push_str("  *) printf '{}\\n' ;;\n");
    write(
        dir,
        "opa-answering",
        &format!(
            "input=''\nprev=''\nfor a in \"$@\"; do\n  if [ \"$prev\" = '-i' ]; then input=\"$a\"; fi\n  prev=\"$a\"\ndone\n\
             if [ -n \"$input\" ]; then cat \"$input\" > \"$LOG.input\"; fi\n\
             case \"$prev\" in\n{cases}esac\n"
        ),
    )
}

/// A stub that prints `stdout`/`stderr` and exits with `code`.
pub fn failing(dir: &Utf8Path, code: i32, stdout: &str, stderr: &str) -> io::Result<StubTool> {
    write(
        dir,
        "opa-failing",
        &format!(
            "printf '%s' {} \nprintf '%s' {} >&2\nexit {code}\n",
            shell_quote(stdout),
            shell_quote(stderr)
        ),
    )
}

/// A stub that prints `stdout` verbatim and exits 0.
pub fn printing(dir: &Utf8Path, stdout: &str) -> io::Result<StubTool> {
    write(
        dir,
        "opa-printing",
        &format!("printf '%s' {}\n", shell_quote(stdout)),
    )
}

fn write(dir: &Utf8Path, name: &str, body: &str) -> io::Result<StubTool> {
    let path = dir.join(name);
    let log = dir.join(format!("{name}.log"));
    let script = format!(
        "#!/bin/sh\nLOG={log}\nfor a in \"$@\"; do printf '%s\\n' \"$a\" >> \"$LOG\"; done\n\
         printf '%s\\n' '{END_MARKER}' >> \"$LOG\"\n{body}",
        log = shell_quote(log.as_str()),
    );
    std::fs::write(&path, script)?;
    make_executable(&path)?;
    Ok(StubTool { path, log })
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> io::Result<()> {
    Ok(())
}

/// Single-quote `s` for `sh`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_single_quotes() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote("{\"a\":1}"), "'{\"a\":1}'");
    }

    #[test]
    fn invocation_lookup() {
        let inv = Invocation {
            args: ["eval", "--format", "json", "--bundle", "/b", "-i", "/in.json", "data.p.allow"]
                .map(String::from)
                .to_vec(),
        };
        assert_eq!(inv.value_of("--bundle"), Some("/b"));
        assert_eq!(inv.value_of("-i"), Some("/in.json"));
        assert_eq!(inv.entrypoint(), Some("data.p.allow"));
        assert_eq!(inv.value_of("--missing"), None);
    }
}
