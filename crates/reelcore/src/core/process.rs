//! Process execution utilities with timeout support
//!
//! Provides helpers for running external processes (ffmpeg, ffprobe, yt-dlp)
//! with configurable timeouts so a hung tool cannot block its request forever.
//! Every child is spawned with `kill_on_drop`, so a timed-out or cancelled
//! request never leaves an orphaned process behind.

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::AppError;
use crate::download::error::DownloadError;

/// Timeout for `-version` style availability checks
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async Command with a timeout.
///
/// Returns the process Output on success, or an AppError on timeout/IO failure.
/// On timeout the child is killed when the pending future is dropped.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, AppError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(AppError::Io(e)),
        Err(_) => Err(DownloadError::Timeout(format!("Process timed out after {}s", timeout.as_secs())).into()),
    }
}

/// Checks whether a tool can be started on this host.
///
/// Runs `<bin> <version_flag>` and reports success. Missing binaries,
/// non-zero exits and hangs all count as "not available".
pub async fn is_tool_available(bin: &str, version_flag: &str) -> bool {
    run_with_timeout(Command::new(bin).arg(version_flag), VERSION_CHECK_TIMEOUT)
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Last non-empty lines of a tool's stderr, for logs and error details.
pub fn stderr_tail(output: &Output, max_lines: usize) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool_is_not_available() {
        assert!(!is_tool_available("reel-definitely-not-a-real-binary", "-version").await);
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let mut cmd = Command::new("reel-definitely-not-a-real-binary");
        let err = run_with_timeout(&mut cmd, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_reported() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err = run_with_timeout(&mut cmd, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, AppError::Download(DownloadError::Timeout(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_tail_keeps_last_lines() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf 'one\\n\\ntwo\\nthree\\n' >&2"]);
        let output = run_with_timeout(&mut cmd, Duration::from_secs(5)).await.unwrap();
        assert_eq!(stderr_tail(&output, 2), "two\nthree");
    }
}
