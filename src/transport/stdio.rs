//! Child-process transport speaking newline-delimited JSON-RPC.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};
use crate::transport::Transport;

/// How long `stop` waits for the child to exit after the termination
/// signal before escalating to a kill.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Stdio transport for MCP servers.
///
/// Spawns the target command with all three standard streams piped. The
/// stderr stream is drained by a background task into a buffer kept for
/// post-mortem diagnostics.
pub struct StdioTransport {
    command: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<()>>,
    stderr_buffer: Arc<Mutex<String>>,
    running: bool,
    /// Lines on stdout that did not parse as JSON; counted, never returned.
    non_json_lines: u64,
    exit_code: Option<i32>,
}

impl StdioTransport {
    #[must_use]
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
            child: None,
            stdin: None,
            stdout: None,
            stderr_task: None,
            stderr_buffer: Arc::new(Mutex::new(String::new())),
            running: false,
            non_json_lines: 0,
            exit_code: None,
        }
    }

    /// Captured stderr output of the child so far.
    #[must_use]
    pub fn stderr_output(&self) -> String {
        self.stderr_buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Number of non-JSON stdout lines skipped so far.
    #[must_use]
    pub fn non_json_lines(&self) -> u64 {
        self.non_json_lines
    }

    /// Exit code of the child, once it has been observed.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Writes raw bytes followed by a newline to the child's stdin,
    /// bypassing JSON serialization. Used to inject malformed input.
    pub async fn send_raw_line(&mut self, line: &str) -> ProbeResult<()> {
        let stdin = self.stdin.as_mut().ok_or(ProbeError::NotStarted)?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Sends the graceful-termination signal to the child.
    pub fn signal_terminate(&mut self) -> ProbeResult<()> {
        if self.exit_code.is_some() {
            return Ok(());
        }
        let child = self.child.as_mut().ok_or(ProbeError::NotStarted)?;
        let Some(pid) = child.id() else {
            return Ok(());
        };
        #[cfg(unix)]
        {
            // tokio only exposes SIGKILL; SIGTERM goes through libc.
            let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if ret != 0 {
                return Err(ProbeError::ConnectionClosed(format!(
                    "failed to signal pid {pid}"
                )));
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }
        Ok(())
    }

    /// Waits up to `timeout` for the child to exit.
    ///
    /// Returns `Ok(Some(code))` once exited, `Ok(None)` if still running
    /// when the timeout expires.
    pub async fn wait_exit(&mut self, timeout: Duration) -> ProbeResult<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        let child = self.child.as_mut().ok_or(ProbeError::NotStarted)?;
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let code = status.code().unwrap_or(-1);
                self.exit_code = Some(code);
                Ok(Some(code))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(None),
        }
    }

    /// Force-kills the child and records its exit code.
    pub async fn force_kill(&mut self) -> ProbeResult<()> {
        if self.exit_code.is_some() {
            return Ok(());
        }
        let child = self.child.as_mut().ok_or(ProbeError::NotStarted)?;
        let _ = child.start_kill();
        if let Ok(status) = child.wait().await {
            self.exit_code = status.code();
        }
        Ok(())
    }

    async fn read_message(&mut self) -> ProbeResult<Value> {
        let stdout = self.stdout.as_mut().ok_or(ProbeError::NotStarted)?;
        let mut line = String::new();
        loop {
            line.clear();
            let n = stdout.read_line(&mut line).await?;
            if n == 0 {
                return Err(ProbeError::ConnectionClosed(
                    "server process closed stdout (EOF)".to_string(),
                ));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str(trimmed) {
                Ok(value) => return Ok(value),
                Err(_) => {
                    self.non_json_lines += 1;
                    let preview: String = trimmed.chars().take(200).collect();
                    debug!("non-JSON line from stdout: {preview}");
                }
            }
        }
    }
}

impl Transport for StdioTransport {
    async fn start(&mut self) -> ProbeResult<()> {
        let args = shlex::split(&self.command).ok_or_else(|| {
            ProbeError::Config(format!("cannot parse command line: {}", self.command))
        })?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| ProbeError::Config("empty command line".to_string()))?;

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProbeError::ConnectionClosed(format!("failed to spawn '{program}': {e}"))
            })?;

        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take().map(BufReader::new);

        if let Some(stderr) = child.stderr.take() {
            let buffer = Arc::clone(&self.stderr_buffer);
            self.stderr_task = Some(tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if let Ok(mut buf) = buffer.lock() {
                                buf.push_str(&line);
                            }
                        }
                    }
                }
            }));
        }

        self.child = Some(child);
        self.running = true;
        Ok(())
    }

    async fn send(&mut self, message: &Value) -> ProbeResult<()> {
        let stdin = self.stdin.as_mut().ok_or(ProbeError::NotStarted)?;
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> ProbeResult<Value> {
        match tokio::time::timeout(timeout, self.read_message()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(timeout.as_secs_f64())),
        }
    }

    async fn stop(&mut self) -> ProbeResult<()> {
        if self.child.is_none() {
            return Ok(());
        }
        self.running = false;

        let _ = self.signal_terminate();
        if self.wait_exit(GRACE_PERIOD).await?.is_none() {
            self.force_kill().await?;
        }

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
