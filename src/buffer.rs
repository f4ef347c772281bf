//! Line buffering around a child process's standard output.
//!
//! Some engines are shell pipelines that misbehave when their stdout is a
//! socket instead of a pipe. Running them behind a real pipe and relaying the
//! output line by line avoids the problem.

use anyhow::{Context, Result};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Run `program` with our stdin and relay its stdout to `out`, one line at a time.
///
/// Bytes are forwarded unchanged and in order, including a final line without
/// a trailing newline. Returns the child's exit status once its output closes.
/// If forwarding fails the child is killed before the error is returned.
pub async fn forward_output<W>(program: &str, args: &[String], out: &mut W) -> Result<ExitStatus>
where
    W: AsyncWrite + Unpin,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {}", program))?;

    let stdout = child
        .stdout
        .take()
        .with_context(|| format!("{} has no stdout pipe", program))?;
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    let mut forwarded = 0usize;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .with_context(|| format!("Failed to read output of {}", program))?;
        if read == 0 {
            break;
        }
        out.write_all(&line)
            .await
            .context("Failed to write forwarded output")?;
        out.flush().await.context("Failed to flush forwarded output")?;
        forwarded += read;
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("Failed to wait for {}", program))?;
    debug!("{} exited with {} after {} bytes", program, status, forwarded);

    Ok(status)
}

/// Exit code to report for a child status; signal termination maps to 1
pub fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_forwards_lines_in_order() {
        let mut out = Vec::new();
        let status = forward_output("sh", &sh("printf 'one\\ntwo\\nthree\\n'"), &mut out)
            .await
            .expect("run");

        assert!(status.success());
        assert_eq!(out, b"one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let mut out = Vec::new();
        forward_output("sh", &sh("printf 'a\\nb'"), &mut out)
            .await
            .expect("run");

        assert_eq!(out, b"a\nb");
    }

    #[tokio::test]
    async fn test_non_utf8_bytes_preserved() {
        let mut out = Vec::new();
        forward_output("sh", &sh("printf '\\377\\376\\n'"), &mut out)
            .await
            .expect("run");

        assert_eq!(out, vec![0xff, 0xfe, b'\n']);
    }

    #[tokio::test]
    async fn test_exit_code_propagates() {
        let mut out = Vec::new();
        let status = forward_output("sh", &sh("echo partial; exit 3"), &mut out)
            .await
            .expect("run");

        assert_eq!(exit_code(&status), 3);
        assert_eq!(out, b"partial\n");
    }

    #[tokio::test]
    async fn test_arguments_are_forwarded() {
        let mut out = Vec::new();
        forward_output("echo", &["es-ca".to_string(), "-u".to_string()], &mut out)
            .await
            .expect("run");

        assert_eq!(out, b"es-ca -u\n");
    }

    /// Writer whose reader has gone away
    struct ClosedPipe;

    impl AsyncWrite for ClosedPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_failure_returns_error() {
        let result = forward_output("sh", &sh("echo first; exec sleep 30"), &mut ClosedPipe).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to write forwarded output"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_write_failure_kills_child() {
        let temp_dir = tempfile::TempDir::new().expect("temp dir");
        let pid_file = temp_dir.path().join("engine.pid");
        let script = format!("echo $$ > '{}'; echo first; exec sleep 30", pid_file.display());

        let result = forward_output("sh", &sh(&script), &mut ClosedPipe).await;
        assert!(result.is_err());

        let pid = std::fs::read_to_string(&pid_file).expect("pid file");
        let proc_status = format!("/proc/{}/status", pid.trim());

        // The killed child either disappears or lingers as a zombie until reaped
        let mut running = true;
        for _ in 0..50 {
            running = match std::fs::read_to_string(&proc_status) {
                Ok(status) => !status.lines().any(|l| l.starts_with("State:") && l.contains('Z')),
                Err(_) => false,
            };
            if !running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        assert!(!running, "engine process should be killed after a write failure");
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let mut out = Vec::new();
        let result = forward_output("definitely-not-an-installed-engine", &[], &mut out).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
        assert!(out.is_empty());
    }
}
