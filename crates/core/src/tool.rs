//! Running external command-line backends (yt-dlp, ffmpeg).

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

/// Captured result of a finished backend process.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Last non-empty stderr lines, for error messages.
    pub fn stderr_tail(&self, lines: usize) -> Option<String> {
        let tail: Vec<&str> = self
            .stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();
        if tail.is_empty() {
            return None;
        }
        let start = tail.len().saturating_sub(lines);
        Some(tail[start..].join("\n"))
    }
}

/// Runs `program` with `args` to completion.
///
/// The child is killed if the returned future is dropped, so a caller-side
/// timeout never leaves the backend running.
pub(crate) async fn run_tool(program: &Path, args: &[String]) -> std::io::Result<ToolOutput> {
    tracing::debug!(program = %program.display(), ?args, "Running backend");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Checks that `program` can be executed by running it with `version_arg`.
pub(crate) async fn probe_tool(program: &Path, version_arg: &str) -> std::io::Result<()> {
    let status = Command::new(program)
        .arg(version_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "{} {} exited with {:?}",
            program.display(),
            version_arg,
            status.code()
        )))
    }
}
