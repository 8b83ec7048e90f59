//! Stdio transport: NDJSON over a child process's stdin/stdout.
//!
//! Framing, correlation, and retry mechanics mirror the bounded-line-read
//! discipline this corpus uses for its own stdio transport (never buffer an
//! unterminated line without limit; sanitize untrusted text before logging;
//! skip malformed lines rather than tearing down the reader).

use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use mcpconform_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use mcpconform_core::TransportKind;

use super::pending::{IdGenerator, PendingRequestTable};
use super::{Result, Transport};
use crate::error::TransportError;
use crate::observability::metrics;

/// Default maximum message size in bytes (10 MB) — bounds a single NDJSON
/// line so a child without a trailing newline cannot exhaust memory.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Default read/write buffer size (64 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Stdio transport configuration, overridable via `MCP_*` environment
/// variables (§6).
#[derive(Debug, Clone)]
pub struct StdioConfig {
    /// Command line used to launch the server (`argv[0]`, then arguments).
    pub command: Vec<String>,
    /// Command used to restart a crashed child; defaults to `command`.
    pub restart_command: Vec<String>,
    /// Per-request deadline.
    pub request_timeout: Duration,
    /// Retry count for broken pipe / empty read / invalid JSON during a
    /// send-read cycle.
    pub max_retries: u32,
    /// Maximum single-line message size in bytes.
    pub max_message_size: usize,
    /// Read/write buffer size in bytes.
    pub buffer_size: usize,
}

impl StdioConfig {
    /// Builds a config for `command`, applying `MCP_STDIO_TIMEOUT` and
    /// `MCP_STDIO_MAX_RETRIES` environment overrides on top of the given
    /// defaults (§6 Environment variables honoured).
    #[must_use]
    pub fn new(command: Vec<String>) -> Self {
        Self {
            restart_command: command.clone(),
            command,
            request_timeout: Duration::from_secs(env_or("MCP_STDIO_TIMEOUT", 10)),
            max_retries: env_or("MCP_STDIO_MAX_RETRIES", 3),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

struct ChildHandles {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

/// NDJSON transport over a spawned child process's stdin/stdout/stderr.
pub struct StdioTransport {
    config: StdioConfig,
    handles: Mutex<Option<ChildHandles>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    stderr_task: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<PendingRequestTable>,
    id_gen: IdGenerator,
    notifications_tx: mpsc::UnboundedSender<JsonRpcNotification>,
    notifications_rx: Mutex<Option<mpsc::UnboundedReceiver<JsonRpcNotification>>>,
    session_id: Mutex<Option<String>>,
    started: AtomicBool,
}

impl StdioTransport {
    /// Creates a new, unstarted stdio transport.
    #[must_use]
    pub fn new(config: StdioConfig) -> Self {
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        Self {
            config,
            handles: Mutex::new(None),
            reader_task: Mutex::new(None),
            stderr_task: Mutex::new(None),
            pending: Arc::new(PendingRequestTable::new()),
            id_gen: IdGenerator::new(),
            notifications_tx,
            notifications_rx: Mutex::new(Some(notifications_rx)),
            session_id: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Takes ownership of the server-initiated notification stream. May only
    /// be called once; subsequent calls return `None`.
    pub async fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<JsonRpcNotification>> {
        self.notifications_rx.lock().await.take()
    }

    fn spawn_child(command: &[String]) -> Result<ChildHandles> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| TransportError::Closed("empty stdio command".to_string()))?;

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Closed("child stdin unavailable".to_string()))?;

        Ok(ChildHandles {
            child,
            stdin: BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, stdin),
        })
    }

    fn spawn_reader_task(
        &self,
        stdout: tokio::process::ChildStdout,
        pending: Arc<PendingRequestTable>,
        notifications_tx: mpsc::UnboundedSender<JsonRpcNotification>,
        max_message_size: usize,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stdout);
            loop {
                match read_line_bounded(&mut reader, max_message_size).await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<JsonRpcMessage>(&line) {
                            Ok(JsonRpcMessage::Response(response)) => {
                                if !pending.deliver(response) {
                                    warn!("received response for unknown or expired id, dropping");
                                }
                            }
                            Ok(JsonRpcMessage::Batch(items)) => {
                                for item in items {
                                    if let JsonRpcMessage::Response(response) = item {
                                        let _ = pending.deliver(response);
                                    }
                                }
                            }
                            Ok(JsonRpcMessage::Notification(note)) => {
                                let _ = notifications_tx.send(note);
                            }
                            Ok(JsonRpcMessage::Request(_)) => {
                                debug!("ignoring server-initiated request on stdio transport");
                            }
                            Err(e) => {
                                warn!(
                                    error = %e,
                                    line = %sanitize_for_log(&line, 200),
                                    "invalid JSON-RPC message on stdio, skipping"
                                );
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("stdio reader reached EOF");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "stdio reader error, stopping");
                        break;
                    }
                }
            }
        })
    }

    fn spawn_stderr_task(&self, stderr: tokio::process::ChildStderr) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                debug!(target: "mcp_server_stderr", "{}", sanitize_for_log(&line, 2000));
            }
        })
    }

    async fn write_line(stdin: &mut BufWriter<ChildStdin>, payload: &str) -> Result<()> {
        stdin.write_all(payload.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        metrics::record_transport_request("stdio", payload.len() as u64);
        Ok(())
    }

    /// Writes `payload`, restarting the child and retrying on broken-pipe
    /// style failures up to `max_retries` times, per the retry policy
    /// described in §4.1.1 — a fresh attempt counter per logical request,
    /// the request id itself never changes.
    async fn write_with_retry(&self, payload: &str) -> Result<()> {
        let mut attempt = 0;
        loop {
            let mut guard = self.handles.lock().await;
            let Some(handles) = guard.as_mut() else {
                return Err(TransportError::Closed("transport not started".to_string()));
            };
            match Self::write_line(&mut handles.stdin, payload).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "stdio write failed, retrying");
                    drop(guard);
                    self.restart_child().await?;
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn restart_child(&self) -> Result<()> {
        let mut guard = self.handles.lock().await;
        if let Some(mut old) = guard.take() {
            let _ = old.child.start_kill();
        }

        let mut new_handles = Self::spawn_child(&self.config.restart_command)?;
        let stdout_handle = new_handles.child.stdout.take();
        let stderr_handle = new_handles.child.stderr.take();
        *guard = Some(new_handles);
        drop(guard);

        if let Some(stdout) = stdout_handle {
            let task = self.spawn_reader_task(
                stdout,
                Arc::clone(&self.pending),
                self.notifications_tx.clone(),
                self.config.max_message_size,
            );
            let mut reader_guard = self.reader_task.lock().await;
            if let Some(old_task) = reader_guard.replace(task) {
                old_task.abort();
            }
        }
        if let Some(stderr) = stderr_handle {
            let task = self.spawn_stderr_task(stderr);
            let mut stderr_guard = self.stderr_task.lock().await;
            if let Some(old_task) = stderr_guard.replace(task) {
                old_task.abort();
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn start(&self) -> Result<()> {
        let mut handles = Self::spawn_child(&self.config.command)?;
        let stdout = handles
            .child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Closed("child stdout unavailable".to_string()))?;
        let stderr = handles
            .child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Closed("child stderr unavailable".to_string()))?;

        let reader_task = self.spawn_reader_task(
            stdout,
            Arc::clone(&self.pending),
            self.notifications_tx.clone(),
            self.config.max_message_size,
        );
        let stderr_task = self.spawn_stderr_task(stderr);

        *self.handles.lock().await = Some(handles);
        *self.reader_task.lock().await = Some(reader_task);
        *self.stderr_task.lock().await = Some(stderr_task);
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.lock().await.take() {
            task.abort();
        }
        if let Some(mut handles) = self.handles.lock().await.take() {
            let _ = handles.child.start_kill();
            let _ = handles.child.wait().await;
        }
        *self.session_id.lock().await = None;
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
        let id = self.id_gen.next_id();
        let rx = self.pending.register(&id);
        let request = JsonRpcRequest::new(id.clone(), method, params);
        let payload = serde_json::to_string(&request)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;

        if let Err(e) = self.write_with_retry(&payload).await {
            self.pending.cancel(&id);
            return Err(e);
        }

        self.pending
            .await_response(&id, rx, self.config.request_timeout)
            .await
    }

    async fn send_notification(&self, notification: JsonRpcNotification) -> Result<()> {
        let payload = serde_json::to_string(&notification)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        self.write_with_retry(&payload).await
    }

    async fn send_batch(
        &self,
        requests: Vec<(String, Option<Value>)>,
    ) -> Result<Vec<JsonRpcResponse>> {
        let mut frames = Vec::with_capacity(requests.len());
        let mut waiters = Vec::with_capacity(requests.len());
        for (method, params) in requests {
            let id = self.id_gen.next_id();
            let rx = self.pending.register(&id);
            frames.push(JsonRpcRequest::new(id.clone(), method, params));
            waiters.push((id, rx));
        }

        let payload =
            serde_json::to_string(&frames).map_err(|e| TransportError::Protocol(e.to_string()))?;
        if let Err(e) = self.write_with_retry(&payload).await {
            for (id, _) in &waiters {
                self.pending.cancel(id);
            }
            return Err(e);
        }

        let mut responses = Vec::with_capacity(waiters.len());
        for (id, rx) in waiters {
            responses.push(
                self.pending
                    .await_response(&id, rx, self.config.request_timeout)
                    .await?,
            );
        }
        Ok(responses)
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.try_lock().ok().and_then(|g| g.clone())
    }

    async fn note_session_id(&self, id: String) {
        *self.session_id.lock().await = Some(id);
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::Stdio
    }
}

/// Reads one NDJSON line with a hard size bound, so a line without a
/// trailing newline cannot exhaust memory. Returns `Ok(None)` on clean EOF.
async fn read_line_bounded<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
    max_message_size: usize,
) -> std::io::Result<Option<String>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut overflowed = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if buf.is_empty() {
                return Ok(None);
            }
            break;
        }

        if let Some(newline_at) = available.iter().position(|&b| b == b'\n') {
            if !overflowed && buf.len() + newline_at <= max_message_size {
                buf.extend_from_slice(&available[..newline_at]);
            } else {
                overflowed = true;
            }
            reader.consume(newline_at + 1);
            break;
        }

        if !overflowed && buf.len() + available.len() > max_message_size {
            overflowed = true;
        } else if !overflowed {
            buf.extend_from_slice(available);
        }
        let consumed = available.len();
        reader.consume(consumed);
    }

    if overflowed {
        tracing::warn!(limit = max_message_size, "message exceeds size limit, skipping");
        return Ok(Some(String::new()));
    }

    while buf.last() == Some(&b'\r') {
        buf.pop();
    }

    match String::from_utf8(buf) {
        Ok(s) => Ok(Some(s)),
        Err(e) => {
            tracing::warn!(error = %e, "invalid UTF-8 on stdio, skipping line");
            Ok(Some(String::new()))
        }
    }
}

/// Truncates and strips control characters from untrusted input before
/// logging, preventing log injection via raw stdio content.
fn sanitize_for_log(input: &str, max_len: usize) -> String {
    input
        .chars()
        .take(max_len)
        .map(|c| if c.is_control() && c != '\t' { '\u{FFFD}' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdio_config_defaults() {
        let config = StdioConfig::new(vec!["echo".to_string()]);
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn sanitize_replaces_control_characters() {
        let input = "hello\x07world\tok";
        let sanitized = sanitize_for_log(input, 100);
        assert!(sanitized.contains('\u{FFFD}'));
        assert!(sanitized.contains('\t'));
    }

    #[tokio::test]
    async fn transport_kind_is_stdio() {
        let transport = StdioTransport::new(StdioConfig::new(vec!["true".to_string()]));
        assert_eq!(transport.transport_kind(), TransportKind::Stdio);
        assert!(transport.session_id().is_none());
    }

    #[tokio::test]
    async fn note_session_id_is_observable() {
        let transport = StdioTransport::new(StdioConfig::new(vec!["true".to_string()]));
        transport.note_session_id("sess-abc".to_string()).await;
        assert_eq!(transport.session_id().as_deref(), Some("sess-abc"));
    }

    #[tokio::test]
    async fn start_stop_against_real_echo_process() {
        // `cat` echoes each stdin line back on stdout, standing in for a
        // trivially compliant NDJSON peer without needing a real MCP server.
        let transport = StdioTransport::new(StdioConfig::new(vec!["cat".to_string()]));
        transport.start().await.unwrap();
        transport.stop().await.unwrap();
        // Idempotent: stopping an already-stopped transport is safe.
        transport.stop().await.unwrap();
    }
}
