//! # Script runners
//!
//! The loop only needs `run(script) -> stdout | fault`. [`PythonRunner`]
//! provides it by running each script in a child interpreter through a tiny
//! harness, so a crashing script cannot take the assistant down with it.
//!
//! ## Harness protocol
//! - argv: `<script file> <fault file>`
//! - the script runs in a fresh `__main__` namespace
//! - an uncaught exception writes `error\n<str(exc)>` to the fault file and exits 1
//! - KeyboardInterrupt writes `interrupt\n` and exits 130
//! - stdout is captured by the parent; stdin and stderr stay on the terminal

use crate::outcome::ScriptFault;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

/// Runs one proposed script and returns everything it wrote to stdout.
#[allow(async_fn_in_trait)]
pub trait ScriptRunner {
    async fn run(&self, script: &str) -> Result<String, ScriptFault>;
}

const HARNESS: &str = r#"
import sys

_script, _fault = sys.argv[1], sys.argv[2]
sys.argv = [_script]


def _report(kind, text=""):
    with open(_fault, "w", encoding="utf-8") as f:
        f.write(kind + "\n" + text)


try:
    with open(_script, encoding="utf-8") as f:
        _code = compile(f.read(), _script, "exec")
    exec(_code, {"__name__": "__main__", "__file__": _script, "__builtins__": __builtins__})
except KeyboardInterrupt:
    _report("interrupt")
    sys.exit(130)
except SystemExit:
    raise
except BaseException as e:
    _report("error", str(e))
    sys.exit(1)
"#;

/// Runs scripts with a Python 3 interpreter in a child process.
#[derive(Debug, Clone)]
pub struct PythonRunner {
    python: String,
}

impl PythonRunner {
    pub fn new(python: impl Into<String>) -> Self {
        Self { python: python.into() }
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    async fn spawn(&self, script_path: &Path, fault_path: &Path) -> Result<(ExitStatus, String), ScriptFault> {
        let child = Command::new(&self.python)
            .arg("-c")
            .arg(HARNESS)
            .arg(script_path)
            .arg(fault_path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScriptFault::Failed(format!("failed to start {}: {}", self.python, e)))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ScriptFault::Failed(format!("failed to wait for {}: {}", self.python, e)))?;

        Ok((output.status, String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl ScriptRunner for PythonRunner {
    async fn run(&self, script: &str) -> Result<String, ScriptFault> {
        let dir = tempfile::tempdir()
            .map_err(|e| ScriptFault::Failed(format!("failed to create script directory: {}", e)))?;
        let script_path = dir.path().join("script.py");
        let fault_path = dir.path().join("fault");

        tokio::fs::write(&script_path, script)
            .await
            .map_err(|e| ScriptFault::Failed(format!("failed to write script: {}", e)))?;

        let (status, stdout) = self.spawn(&script_path, &fault_path).await?;
        tracing::debug!(python = %self.python, %status, bytes = stdout.len(), "script finished");

        if status.success() {
            return Ok(stdout);
        }

        let report = tokio::fs::read_to_string(&fault_path).await.unwrap_or_default();
        Err(classify_failure(status, &report))
    }
}

/// Turn a non-zero exit and the harness report into a fault.
fn classify_failure(status: ExitStatus, report: &str) -> ScriptFault {
    let (kind, description) = report.split_once('\n').unwrap_or((report, ""));
    match kind {
        "interrupt" => ScriptFault::Interrupted,
        "error" => ScriptFault::Failed(description.to_string()),
        _ if killed_by_interrupt(&status) => ScriptFault::Interrupted,
        _ => ScriptFault::Failed(format!("script exited with {}", status)),
    }
}

#[cfg(unix)]
fn killed_by_interrupt(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(2)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: &ExitStatus) -> bool {
    false
}
