//! Control socket: server (during `reqtap serve`) and client (for the inspection commands).
//! Protocol: one JSON request per line, answered by one JSON response per line.

use anyhow::{Context, Result};
use reqtap_core::capture::CaptureHandle;
use reqtap_core::client::{CaptureClient, ChannelError};
use reqtap_core::protocol::{Request, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

/// Binds `path` and spawns a task answering requests by forwarding them to the
/// capture service. Each forwarded request is bounded by `timeout`. Malformed
/// lines get an `{"error": ...}` reply; the connection stays open.
pub fn spawn_control_listener(
    handle: CaptureHandle,
    path: impl AsRef<Path>,
    timeout: Duration,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("control socket bind: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "control socket listening");

    let task = tokio::spawn(async move {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, _)) => {
                    let handle = handle.clone();
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, &handle, timeout, &shutdown).await {
                            tracing::debug!("control connection: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
        let _ = std::fs::remove_file(&path);
    });
    Ok(task)
}

async fn serve_connection(
    stream: UnixStream,
    handle: &CaptureHandle,
    timeout: Duration,
    shutdown: &CancellationToken,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                tracing::debug!(?request, "control request");
                handle
                    .request(request, timeout, shutdown)
                    .await
                    .unwrap_or_else(|e| Response::Error {
                        error: e.to_string(),
                    })
            }
            Err(e) => Response::Error {
                error: format!("bad request: {e}"),
            },
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        write.write_all(out.as_bytes()).await?;
    }
    Ok(())
}

/// [`CaptureClient`] talking to a `reqtap serve` process over its control socket.
#[derive(Debug, Clone)]
pub struct SocketClient {
    path: PathBuf,
    timeout: Duration,
    cancel: CancellationToken,
}

impl SocketClient {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            path: path.into(),
            timeout,
            cancel,
        }
    }

    async fn exchange(&self, request: &Request) -> Result<Response, ChannelError> {
        let transport = |e: std::io::Error| ChannelError::Transport(e.to_string());
        let stream = UnixStream::connect(&self.path).await.map_err(|e| {
            ChannelError::Transport(format!(
                "connect {} (is `reqtap serve` running?): {}",
                self.path.display(),
                e
            ))
        })?;
        let (read, mut write) = stream.into_split();
        let mut line =
            serde_json::to_string(request).map_err(|e| ChannelError::Transport(e.to_string()))?;
        line.push('\n');
        write.write_all(line.as_bytes()).await.map_err(transport)?;
        let reply = BufReader::new(read)
            .lines()
            .next_line()
            .await
            .map_err(transport)?
            .ok_or_else(|| ChannelError::Transport("connection closed before response".into()))?;
        serde_json::from_str(&reply).map_err(|e| ChannelError::Transport(format!("bad response: {e}")))
    }
}

impl CaptureClient for SocketClient {
    async fn send(&self, request: Request) -> Result<Response, ChannelError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ChannelError::Cancelled),
            res = tokio::time::timeout(self.timeout, self.exchange(&request)) => {
                res.unwrap_or(Err(ChannelError::Timeout(self.timeout)))
            }
        }
    }
}
