//! External tool invocation for checks

use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::{Builder, Handle};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Longest stdout/stderr excerpt kept in check details
pub const MAX_CAPTURE_CHARS: usize = 2000;

/// Wall-clock limit for one external tool call
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(15);

/// Output of one finished command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Captured {
    pub returncode: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.returncode == Some(0)
    }

    /// First non-empty stdout line
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).find(|line| !line.is_empty())
    }

    /// Non-empty stdout lines, trimmed
    pub fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Truncated copy suitable for report details
    pub fn to_details(&self) -> Value {
        serde_json::json!({
            "returncode": self.returncode,
            "stdout": truncate(&self.stdout),
            "stderr": truncate(&self.stderr),
        })
    }
}

/// Resolve a program on `PATH`
pub fn locate(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// First Python interpreter on `PATH`
pub fn python_interpreter() -> Option<PathBuf> {
    locate("python3").or_else(|| locate("python"))
}

/// Run a program to completion and capture its output, bounded by [`TOOL_TIMEOUT`]
pub fn run(program: &Path, args: &[&str]) -> io::Result<Captured> {
    run_with_timeout(program, args, TOOL_TIMEOUT)
}

/// Run a program, killing it once `limit` elapses
///
/// Called from blocking check bodies. A timed-out call fails with
/// [`ErrorKind::TimedOut`].
pub fn run_with_timeout(program: &Path, args: &[&str], limit: Duration) -> io::Result<Captured> {
    debug!(program = %program.display(), ?args, "running external tool");

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

    let output = match block_on(timeout(limit, cmd.output()))? {
        Ok(output) => output?,
        Err(_) => {
            warn!(program = %program.display(), "external tool timed out");
            return Err(io::Error::new(
                ErrorKind::TimedOut,
                format!("{} timed out after {}s", program.display(), limit.as_secs_f64()),
            ));
        }
    };

    Ok(Captured {
        returncode: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Drive a future from a blocking thread, on the ambient runtime when there is one
fn block_on<F: Future>(future: F) -> io::Result<F::Output> {
    match Handle::try_current() {
        Ok(handle) => Ok(handle.block_on(future)),
        Err(_) => Ok(Builder::new_current_thread().enable_all().build()?.block_on(future)),
    }
}

/// Cut text down to [`MAX_CAPTURE_CHARS`] characters
pub fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_CAPTURE_CHARS) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// First dotted numeric version (`12.2`, `535.54.03`) in `text`
pub fn extract_version(text: &str) -> Option<String> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map(|token| token.trim_matches('.'))
        .find(|token| token.contains('.') && token.split('.').all(|part| !part.is_empty()))
        .map(str::to_string)
}

/// Compare dotted numeric versions; `None` if either has a non-numeric part
pub fn compare_versions(left: &str, right: &str) -> Option<std::cmp::Ordering> {
    let parse = |v: &str| -> Option<Vec<u64>> { v.trim().split('.').map(|p| p.parse().ok()).collect() };
    let mut left = parse(left)?;
    let mut right = parse(right)?;
    let len = left.len().max(right.len());
    left.resize(len, 0);
    right.resize(len, 0);
    Some(left.cmp(&right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_truncate() {
        let long = "x".repeat(MAX_CAPTURE_CHARS + 50);
        assert_eq!(truncate(&long).len(), MAX_CAPTURE_CHARS);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_truncate_multibyte() {
        let long = "é".repeat(MAX_CAPTURE_CHARS + 1);
        assert_eq!(truncate(&long).chars().count(), MAX_CAPTURE_CHARS);
    }

    #[test]
    fn test_extract_version() {
        assert_eq!(extract_version("535.54.03").as_deref(), Some("535.54.03"));
        assert_eq!(
            extract_version("Cuda compilation tools, release 12.2, V12.2.140").as_deref(),
            Some("12.2")
        );
        assert_eq!(extract_version("no digits here"), None);
        assert_eq!(extract_version("version 7"), None);
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("535.54.03", "530.30.02"), Some(Ordering::Greater));
        assert_eq!(compare_versions("520.61.05", "520.61.05"), Some(Ordering::Equal));
        assert_eq!(compare_versions("12.1", "12.1.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("515.65", "520.61.05"), Some(Ordering::Less));
        assert_eq!(compare_versions("abc", "1.0"), None);
    }

    #[test]
    fn test_captured_lines() {
        let captured = Captured {
            returncode: Some(0),
            stdout: "\n  NVIDIA A100  \n\nNVIDIA A100\n".to_string(),
            stderr: String::new(),
        };
        assert!(captured.success());
        assert_eq!(captured.first_line(), Some("NVIDIA A100"));
        assert_eq!(captured.lines().len(), 2);
    }

    #[test]
    fn test_captures_exit_code() {
        let Some(sh) = locate("sh") else { return };
        let captured = run(&sh, &["-c", "echo ready; exit 3"]).unwrap();
        assert_eq!(captured.returncode, Some(3));
        assert_eq!(captured.first_line(), Some("ready"));
    }

    #[test]
    fn test_slow_tool_times_out() {
        let Some(sleep) = locate("sleep") else { return };
        let started = std::time::Instant::now();
        let err = run_with_timeout(&sleep, &["5"], Duration::from_millis(100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_slow_tool_times_out_on_blocking_worker() {
        let Some(sleep) = locate("sleep") else { return };
        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt
            .block_on(async move {
                tokio::task::spawn_blocking(move || {
                    run_with_timeout(&sleep, &["5"], Duration::from_millis(100))
                })
                .await
                .unwrap()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn test_missing_program_not_located() {
        assert!(locate("definitely-not-a-real-binary-4f2a").is_none());
    }
}
