//! Subprocess execution for training scripts.
//!
//! [`run_command`] spawns a prepared [`Command`], pipes a JSON document to
//! its stdin, captures stdout/stderr and waits for exit or cancellation.

use std::process::Stdio;
use std::time::Instant;

use ppm_core::error::CoreError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` if the process was killed by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawn `cmd`, write `input` to its stdin and wait for it to exit.
///
/// Cancelling `cancel` kills the child and returns
/// [`CoreError::Execution`].
pub async fn run_command(
    cmd: &mut Command,
    input: &serde_json::Value,
    cancel: &CancellationToken,
) -> Result<ScriptOutput, CoreError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd
        .spawn()
        .map_err(|e| CoreError::Execution(format!("Failed to spawn process: {e}")))?;

    // Readers start before any input is written so a chatty child cannot
    // fill its output pipe while we block on its stdin.
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    if let Some(mut stdin) = child.stdin.take() {
        let bytes = serde_json::to_vec(input)?;
        tokio::spawn(async move {
            // The script may exit without reading stdin.
            let _ = stdin.write_all(&bytes).await;
        });
    }

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to kill cancelled process");
            }
            return Err(CoreError::Execution("Process cancelled".into()));
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    Ok(ScriptOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code: status.code().unwrap_or(-1),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Read an entire output stream, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES).read_to_end(&mut buf).await;
    }
    buf
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn captures_stdin_echo_and_exit_code() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("cat; echo oops >&2; exit 3");

        let output = run_command(&mut cmd, &serde_json::json!({"a": 1}), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), r#"{"a":1}"#);
        assert_eq!(output.stderr.trim(), "oops");
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn large_input_with_large_output_completes() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("head -c 1048576 /dev/zero; cat > /dev/null");
        let input = serde_json::Value::String("x".repeat(1 << 20));

        let output = tokio::time::timeout(
            Duration::from_secs(10),
            run_command(&mut cmd, &input, &CancellationToken::new()),
        )
        .await
        .expect("process pipes deadlocked")
        .unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.len(), 1 << 20);
    }

    #[tokio::test]
    async fn cancellation_kills_long_running_process() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 30");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = run_command(&mut cmd, &serde_json::Value::Null, &cancel).await;
        assert_matches!(result, Err(CoreError::Execution(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_program_is_execution_error() {
        let mut cmd = Command::new("/definitely/not/a/program");
        let result = run_command(&mut cmd, &serde_json::Value::Null, &CancellationToken::new()).await;
        assert_matches!(result, Err(CoreError::Execution(_)));
    }
}
