//! Asynchronous HTTP + SSE transport (FastMCP style, §4.1.3).
//!
//! A message endpoint accepts POSTed requests and replies `202 Accepted`;
//! a notification endpoint is a long-lived `GET text/event-stream` that
//! carries every Response and server-initiated notification. The reader
//! runs its own reconnect state machine rather than treating a dropped
//! stream as fatal, the same posture the stdio transport takes toward a
//! restartable child process.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::StreamExt;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mcpconform_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use mcpconform_core::TransportKind;

use super::pending::{IdGenerator, PendingRequestTable};
use super::{Result, Transport};
use crate::error::TransportError;
use crate::observability::metrics;

/// The reader's reconnect state machine (§4.1.3, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseState {
    /// Stream not yet established.
    Connecting,
    /// Receiving events normally.
    Live,
    /// Stream broke; attempt `n` of a reconnect is in flight.
    Reconnecting(u32),
    /// Reconnect attempts exhausted; the transport is unusable.
    Dead,
}

/// Async HTTP+SSE transport configuration.
#[derive(Debug, Clone)]
pub struct SseConfig {
    /// `POST` endpoint for client-to-server requests/notifications.
    pub message_url: String,
    /// `GET text/event-stream` endpoint for server-to-client traffic.
    pub sse_url: String,
    /// Deadline for a request to receive its correlated response.
    pub request_timeout: Duration,
    /// Deadline for the SSE stream to deliver its first event on connect.
    pub connect_timeout: Duration,
    /// Maximum reconnect attempts before the transport gives up (→ `Dead`).
    pub max_reconnects: u32,
    /// Bearer token, sent when the protocol revision requires OAuth.
    pub bearer_token: Option<String>,
    /// `MCP-Protocol-Version` header value (2025-06-18 only).
    pub protocol_version_header: Option<String>,
}

fn session_id_patterns() -> [Regex; 2] {
    [
        Regex::new(r"(?i)connected to session\s+(\S+)").expect("static pattern"),
        Regex::new(r"session_id=([A-Za-z0-9._-]+)").expect("static pattern"),
    ]
}

/// Parses a server-announced session id out of raw SSE event data,
/// accepting either a `Connected to session <id>` message or a
/// `…session_id=<id>` URL fragment — both conventions appear in the wild.
fn parse_session_id(data: &str) -> Option<String> {
    for pattern in session_id_patterns() {
        if let Some(caps) = pattern.captures(data) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

struct ReaderShared {
    pending: Arc<PendingRequestTable>,
    notifications_tx: mpsc::UnboundedSender<JsonRpcNotification>,
    session_id: Arc<StdMutex<Option<String>>>,
    state: Arc<StdMutex<SseState>>,
}

/// Async HTTP+SSE transport.
pub struct SseTransport {
    client: Client,
    config: SseConfig,
    pending: Arc<PendingRequestTable>,
    id_gen: IdGenerator,
    session_id: Arc<StdMutex<Option<String>>>,
    state: Arc<StdMutex<SseState>>,
    reconnect_attempts: Arc<AtomicU32>,
    notifications_rx: Mutex<Option<mpsc::UnboundedReceiver<JsonRpcNotification>>>,
    notifications_tx: mpsc::UnboundedSender<JsonRpcNotification>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl SseTransport {
    /// Builds a transport against `config`'s message/SSE endpoints.
    #[must_use]
    pub fn new(config: SseConfig) -> Self {
        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        Self {
            client: Client::new(),
            config,
            pending: Arc::new(PendingRequestTable::new()),
            id_gen: IdGenerator::new(),
            session_id: Arc::new(StdMutex::new(None)),
            state: Arc::new(StdMutex::new(SseState::Connecting)),
            reconnect_attempts: Arc::new(AtomicU32::new(0)),
            notifications_tx,
            notifications_rx: Mutex::new(Some(notifications_rx)),
            reader_task: Mutex::new(None),
        }
    }

    /// Takes ownership of the server-initiated notification stream. May
    /// only be called once.
    pub async fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<JsonRpcNotification>> {
        self.notifications_rx.lock().await.take()
    }

    /// Current reconnect state machine position.
    #[must_use]
    pub fn state(&self) -> SseState {
        *self.state.lock().expect("state mutex poisoned")
    }

    fn headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder.header("Accept", "text/event-stream, application/json");
        if let Some(session_id) = self.session_id.lock().expect("session_id mutex poisoned").clone() {
            builder = builder.header("Mcp-Session-Id", &session_id);
            builder = builder.query(&[("session_id", session_id)]);
        }
        if let Some(token) = &self.config.bearer_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(version) = &self.config.protocol_version_header {
            builder = builder.header("MCP-Protocol-Version", version);
        }
        builder
    }

    fn spawn_reader(&self, ready_tx: oneshot::Sender<Result<()>>) -> JoinHandle<()> {
        let client = self.client.clone();
        let config = self.config.clone();
        let shared = ReaderShared {
            pending: Arc::clone(&self.pending),
            notifications_tx: self.notifications_tx.clone(),
            session_id: Arc::clone(&self.session_id),
            state: Arc::clone(&self.state),
        };
        let reconnect_attempts = Arc::clone(&self.reconnect_attempts);

        tokio::spawn(async move {
            let mut ready_tx = Some(ready_tx);
            loop {
                *shared.state.lock().expect("state mutex poisoned") = SseState::Connecting;

                let mut builder = client
                    .get(&config.sse_url)
                    .header("Accept", "text/event-stream");
                if let Some(session_id) =
                    shared.session_id.lock().expect("session_id mutex poisoned").clone()
                {
                    builder = builder.header("Mcp-Session-Id", session_id);
                }
                if let Some(token) = &config.bearer_token {
                    builder = builder.header("Authorization", format!("Bearer {token}"));
                }

                let response = match builder.send().await {
                    Ok(r) if r.status().is_success() => r,
                    Ok(r) => {
                        let status = r.status();
                        fail_connect(&mut ready_tx, TransportError::Http {
                            status: status.as_u16(),
                            body: "SSE handshake rejected".to_string(),
                        });
                        if !advance_or_die(&shared.state, &reconnect_attempts, config.max_reconnects) {
                            return;
                        }
                        continue;
                    }
                    Err(e) => {
                        fail_connect(&mut ready_tx, TransportError::Reqwest(e));
                        if !advance_or_die(&shared.state, &reconnect_attempts, config.max_reconnects) {
                            return;
                        }
                        continue;
                    }
                };

                info!("SSE stream connected");
                let mut byte_stream = response.bytes_stream();
                let mut buffer = String::new();
                let mut first_event = true;

                loop {
                    let chunk = match tokio::time::timeout(config.connect_timeout, byte_stream.next()).await {
                        Ok(Some(Ok(bytes))) => bytes,
                        Ok(Some(Err(e))) => {
                            warn!(error = %e, "SSE stream read error");
                            break;
                        }
                        Ok(None) => {
                            debug!("SSE stream closed by server");
                            break;
                        }
                        Err(_) => {
                            warn!("SSE keepalive gap exceeded, reconnecting");
                            break;
                        }
                    };

                    buffer.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(pos) = buffer.find("\n\n") {
                        let event = buffer[..pos].to_string();
                        buffer.drain(..=pos + 1);
                        let data = extract_data(&event);
                        if data.trim().is_empty() {
                            continue;
                        }

                        if first_event {
                            first_event = false;
                            if let Some(id) = parse_session_id(&data) {
                                *shared.session_id.lock().expect("session_id mutex poisoned") = Some(id);
                            }
                            *shared.state.lock().expect("state mutex poisoned") = SseState::Live;
                            reconnect_attempts.store(0, Ordering::SeqCst);
                            if let Some(tx) = ready_tx.take() {
                                let _ = tx.send(Ok(()));
                            }
                        }

                        dispatch_event(&data, &shared);
                    }
                }

                if !advance_or_die(&shared.state, &reconnect_attempts, config.max_reconnects) {
                    return;
                }
            }
        })
    }
}

fn fail_connect(ready_tx: &mut Option<oneshot::Sender<Result<()>>>, error: TransportError) {
    if let Some(tx) = ready_tx.take() {
        let _ = tx.send(Err(error));
    }
}

/// Advances the state machine on a broken stream: `Reconnecting(n)` while
/// attempts remain, `Dead` once exhausted. Returns `false` once `Dead`.
fn advance_or_die(
    state: &Arc<StdMutex<SseState>>,
    reconnect_attempts: &Arc<AtomicU32>,
    max_reconnects: u32,
) -> bool {
    let attempt = reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt > max_reconnects {
        *state.lock().expect("state mutex poisoned") = SseState::Dead;
        false
    } else {
        *state.lock().expect("state mutex poisoned") = SseState::Reconnecting(attempt);
        true
    }
}

fn extract_data(event: &str) -> String {
    event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
}

fn dispatch_event(data: &str, shared: &ReaderShared) {
    match serde_json::from_str::<JsonRpcMessage>(data) {
        Ok(JsonRpcMessage::Response(response)) => {
            if !shared.pending.deliver(response) {
                warn!("SSE response for unknown or expired id, dropping");
            }
        }
        Ok(JsonRpcMessage::Batch(items)) => {
            for item in items {
                if let JsonRpcMessage::Response(response) = item {
                    let _ = shared.pending.deliver(response);
                }
            }
        }
        Ok(JsonRpcMessage::Notification(note)) => {
            let _ = shared.notifications_tx.send(note);
        }
        Ok(JsonRpcMessage::Request(_)) => {
            debug!("ignoring server-initiated request over SSE");
        }
        Err(_) => {
            // Not every SSE event carries a JSON-RPC frame (e.g. the
            // session-announcement event); only warn past the first event.
            debug!(data = %data.chars().take(200).collect::<String>(), "non-JSON-RPC SSE event");
        }
    }
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    async fn start(&self) -> Result<()> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = self.spawn_reader(ready_tx);
        *self.reader_task.lock().await = Some(task);

        match tokio::time::timeout(self.config.connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(TransportError::Closed("SSE reader task dropped".to_string())),
            Err(_) => Err(TransportError::Timeout(self.config.connect_timeout)),
        }
    }

    async fn stop(&self) -> Result<()> {
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        *self.state.lock().expect("state mutex poisoned") = SseState::Dead;
        *self.session_id.lock().expect("session_id mutex poisoned") = None;
        Ok(())
    }

    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
        let id = self.id_gen.next_id();
        let rx = self.pending.register(&id);
        let request = JsonRpcRequest::new(id.clone(), method, params);
        let payload =
            serde_json::to_string(&request).map_err(|e| TransportError::Protocol(e.to_string()))?;
        metrics::record_transport_request("http-sse", payload.len() as u64);

        let response = self
            .headers(self.client.post(&self.config.message_url).header("Content-Type", "application/json"))
            .body(payload)
            .send()
            .await
            .map_err(TransportError::Reqwest)?;

        if !response.status().is_success() {
            self.pending.cancel(&id);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http { status: status.as_u16(), body });
        }

        self.pending
            .await_response(&id, rx, self.config.request_timeout)
            .await
    }

    async fn send_notification(&self, notification: JsonRpcNotification) -> Result<()> {
        let payload = serde_json::to_string(&notification)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        metrics::record_transport_request("http-sse", payload.len() as u64);
        let response = self
            .headers(self.client.post(&self.config.message_url).header("Content-Type", "application/json"))
            .body(payload)
            .send()
            .await
            .map_err(TransportError::Reqwest)?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::Http { status: status.as_u16(), body })
        }
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
        metrics::record_transport_request("http-sse", payload.len() as u64);
        let response = self
            .headers(self.client.post(&self.config.message_url).header("Content-Type", "application/json"))
            .body(payload)
            .send()
            .await
            .map_err(TransportError::Reqwest)?;

        if !response.status().is_success() {
            for (id, _) in &waiters {
                self.pending.cancel(id);
            }
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http { status: status.as_u16(), body });
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
        self.session_id.lock().expect("session_id mutex poisoned").clone()
    }

    async fn note_session_id(&self, id: String) {
        *self.session_id.lock().expect("session_id mutex poisoned") = Some(id);
    }

    fn transport_kind(&self) -> TransportKind {
        TransportKind::HttpSse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connected_to_session_phrasing() {
        assert_eq!(
            parse_session_id("Connected to session abc-123"),
            Some("abc-123".to_string())
        );
    }

    #[test]
    fn parses_url_style_session_id() {
        assert_eq!(
            parse_session_id("https://example.com/sse?session_id=xyz-789"),
            Some("xyz-789".to_string())
        );
    }

    #[test]
    fn unparseable_data_yields_none() {
        assert_eq!(parse_session_id("just some greeting"), None);
    }

    #[test]
    fn extract_data_joins_multiple_data_lines() {
        let event = "event: message\ndata: line one\ndata: line two";
        assert_eq!(extract_data(event), "line one\nline two");
    }

    #[test]
    fn advance_or_die_transitions_to_dead_past_the_limit() {
        let state = Arc::new(StdMutex::new(SseState::Live));
        let attempts = Arc::new(AtomicU32::new(0));
        assert!(advance_or_die(&state, &attempts, 2));
        assert_eq!(*state.lock().unwrap(), SseState::Reconnecting(1));
        assert!(advance_or_die(&state, &attempts, 2));
        assert_eq!(*state.lock().unwrap(), SseState::Reconnecting(2));
        assert!(!advance_or_die(&state, &attempts, 2));
        assert_eq!(*state.lock().unwrap(), SseState::Dead);
    }

    #[tokio::test]
    async fn transport_kind_is_http_sse() {
        let transport = SseTransport::new(SseConfig {
            message_url: "http://127.0.0.1:0/mcp".to_string(),
            sse_url: "http://127.0.0.1:0/sse".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            max_reconnects: 3,
            bearer_token: None,
            protocol_version_header: None,
        });
        assert_eq!(transport.transport_kind(), TransportKind::HttpSse);
        assert_eq!(transport.state(), SseState::Connecting);
    }
}
