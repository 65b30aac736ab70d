//! JSON-RPC 2.0 over `Content-Length`-framed stdio — the standard LSP wire
//! format. One dedicated reader task demultiplexes responses to a
//! `oneshot`-per-request-id map and forwards server notifications
//! (`textDocument/publishDiagnostics` among them) to the caller.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex as SyncMutex;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};

use crate::diagnostics::DiagnosticsStore;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to spawn language server: {0}")]
    Spawn(std::io::Error),
    #[error("io error talking to language server: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed LSP message: {0}")]
    Codec(String),
    #[error("server returned an error response: {0}")]
    Server(String),
    #[error("the language server process has exited")]
    Closed,
}

/// A server-initiated notification (not tied to any outstanding request).
#[derive(Debug, Clone)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

struct PendingRequest {
    responder: oneshot::Sender<Result<Value, Error>>,
}

struct ClientState {
    pending: HashMap<i64, PendingRequest>,
}

/// A running language server connection.
///
/// Cloning shares the underlying process handle and request map — hold
/// one `Client` per server per workspace.
#[derive(Clone)]
pub struct Client {
    stdin: Arc<AsyncMutex<tokio::process::ChildStdin>>,
    state: Arc<SyncMutex<ClientState>>,
    next_id: Arc<AtomicI64>,
    diagnostics: DiagnosticsStore,
}

impl Client {
    /// Spawn `command` and start the reader task. `notifications` receives
    /// every server notification other than `publishDiagnostics`, which is
    /// routed straight into the shared [`DiagnosticsStore`].
    pub fn spawn(
        command: &str,
        args: &[String],
        cwd: &std::path::Path,
    ) -> Result<(Self, mpsc::Receiver<Notification>), Error> {
        let mut child: Child = Command::new(command)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::Spawn)?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        let state = Arc::new(SyncMutex::new(ClientState {
            pending: HashMap::new(),
        }));
        let diagnostics = DiagnosticsStore::default();
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(reader_task(
            BufReader::new(stdout),
            Arc::clone(&state),
            diagnostics.clone(),
            tx,
        ));
        // Keep the child alive for the duration of the process; dropping
        // the Client drops this handle and (kill_on_drop) the process.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok((
            Self {
                stdin: Arc::new(AsyncMutex::new(stdin)),
                state,
                next_id: Arc::new(AtomicI64::new(1)),
                diagnostics,
            },
            rx,
        ))
    }

    pub fn diagnostics(&self) -> &DiagnosticsStore {
        &self.diagnostics
    }

    /// Send a request and wait for its response.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.state.lock().pending.insert(id, PendingRequest { responder: tx });

        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.write(&message).await?;

        rx.await.map_err(|_| Error::Closed)?
    }

    /// Send a fire-and-forget notification (no response expected).
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), Error> {
        let message = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.write(&message).await
    }

    async fn write(&self, message: &Value) -> Result<(), Error> {
        let body = serde_json::to_vec(message).map_err(|e| Error::Codec(e.to_string()))?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        // Hold the lock across both writes so concurrent callers don't
        // interleave frames.
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(header.as_bytes()).await?;
        stdin.write_all(&body).await?;
        stdin.flush().await?;
        Ok(())
    }
}

async fn reader_task(
    mut reader: BufReader<tokio::process::ChildStdout>,
    state: Arc<Mutex<ClientState>>,
    diagnostics: DiagnosticsStore,
    notifications: mpsc::Sender<Notification>,
) {
    loop {
        match read_message(&mut reader).await {
            Ok(Some(value)) => dispatch(&value, &state, &diagnostics, &notifications).await,
            Ok(None) | Err(_) => break,
        }
    }
}

async fn read_message(
    reader: &mut BufReader<tokio::process::ChildStdout>,
) -> Result<Option<Value>, Error> {
    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            content_length = value.trim().parse().ok();
        }
    }

    let Some(len) = content_length else {
        return Err(Error::Codec("missing Content-Length header".into()));
    };

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    serde_json::from_slice(&buf)
        .map(Some)
        .map_err(|e| Error::Codec(e.to_string()))
}

async fn dispatch(
    value: &Value,
    state: &Arc<Mutex<ClientState>>,
    diagnostics: &DiagnosticsStore,
    notifications: &mpsc::Sender<Notification>,
) {
    if let Some(id) = value.get("id").and_then(|v| v.as_i64()) {
        let pending = state.lock().pending.remove(&id);
        if let Some(pending) = pending {
            let result = if let Some(error) = value.get("error") {
                Err(Error::Server(error.to_string()))
            } else {
                Ok(value.get("result").cloned().unwrap_or(Value::Null))
            };
            let _ = pending.responder.send(result);
        }
        return;
    }

    let Some(method) = value.get("method").and_then(|v| v.as_str()) else {
        return;
    };
    let params = value.get("params").cloned().unwrap_or(Value::Null);

    if method == "textDocument/publishDiagnostics" {
        diagnostics.ingest(&params);
        return;
    }

    let _ = notifications
        .send(Notification {
            method: method.to_string(),
            params,
        })
        .await;
}
