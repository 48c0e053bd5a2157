//! Capture service: one task that owns the store and handles commands in order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{CaptureClient, ChannelError};
use crate::event::HostEvent;
use crate::protocol::{Request, Response};
use crate::settings::{self, SettingsStore};

use super::store::{CallStore, HeaderOutcome};

/// Depth of the command queue between handles and the service task.
const COMMAND_QUEUE: usize = 1024;

enum Command {
    Observe(HostEvent),
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
}

/// Owns the captured calls and the header-tracking flag.
///
/// The flag is read from the settings store once, at construction, and after
/// that changes only through [`Request::UpdateHeaderTracking`].
pub struct CaptureService {
    store: CallStore,
    track_headers: bool,
    settings: Arc<dyn SettingsStore>,
}

impl CaptureService {
    pub fn new(window_ms: f64, settings: Arc<dyn SettingsStore>) -> Self {
        let track_headers = match settings::track_headers_enabled(settings.as_ref()) {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!("read header tracking flag: {:#}; defaulting to enabled", e);
                true
            }
        };
        tracing::info!(track_headers, window_ms, "capture service initialized");
        Self {
            store: CallStore::new(window_ms),
            track_headers,
            settings,
        }
    }

    pub fn track_headers(&self) -> bool {
        self.track_headers
    }

    /// Applies one host event. Never fails; misses are logged and dropped.
    pub fn handle_event(&mut self, event: HostEvent) -> Option<HeaderOutcome> {
        match event {
            HostEvent::BeforeRequest(ev) => {
                self.store.on_request_body(ev);
                None
            }
            HostEvent::SendHeaders(ev) => Some(self.store.on_headers(&ev, self.track_headers)),
        }
    }

    pub fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::GetApiCalls => {
                tracing::debug!(count = self.store.len(), "serving api calls");
                Response::ApiCalls {
                    api_calls: self.store.snapshot(),
                }
            }
            Request::ClearApiCalls => {
                self.store.clear();
                tracing::info!("api calls cleared");
                Response::ok()
            }
            Request::UpdateHeaderTracking { track_headers } => {
                self.track_headers = track_headers;
                tracing::info!(track_headers, "header tracking updated");
                if let Err(e) = settings::set_track_headers(self.settings.as_ref(), track_headers) {
                    tracing::warn!("persist header tracking flag: {:#}", e);
                }
                Response::ok()
            }
        }
    }

    /// Moves the service onto its own task. It runs until `shutdown` fires or
    /// every handle is dropped.
    pub fn spawn(self, shutdown: CancellationToken) -> (CaptureHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let task = tokio::spawn(self.run(rx, shutdown));
        (CaptureHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(Command::Observe(event)) => {
                        self.handle_event(event);
                    }
                    Some(Command::Request { request, reply }) => {
                        let response = self.handle_request(request);
                        // The caller may have timed out or been cancelled.
                        let _ = reply.send(response);
                    }
                    None => break,
                },
            }
        }
        tracing::debug!(remaining = self.store.len(), "capture service stopped");
    }
}

/// Cloneable sender side of a running [`CaptureService`].
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Observe(ev) => f.debug_tuple("Observe").field(ev).finish(),
            Command::Request { request, .. } => f.debug_tuple("Request").field(request).finish(),
        }
    }
}

impl CaptureHandle {
    /// Delivers a host event. Fire-and-forget; fails only if the service is gone.
    pub async fn observe(&self, event: HostEvent) -> Result<(), ChannelError> {
        self.tx
            .send(Command::Observe(event))
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// One request/response exchange bounded by `timeout` and `cancel`.
    pub async fn request(
        &self,
        request: Request,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Response, ChannelError> {
        let exchange = async {
            let (reply, rx) = oneshot::channel();
            self.tx
                .send(Command::Request { request, reply })
                .await
                .map_err(|_| ChannelError::Closed)?;
            rx.await.map_err(|_| ChannelError::Closed)
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChannelError::Cancelled),
            res = tokio::time::timeout(timeout, exchange) => {
                res.unwrap_or(Err(ChannelError::Timeout(timeout)))
            }
        }
    }

    /// Binds a timeout and cancellation token, giving a [`CaptureClient`].
    pub fn client(&self, timeout: Duration, cancel: CancellationToken) -> LocalClient {
        LocalClient {
            handle: self.clone(),
            timeout,
            cancel,
        }
    }
}

/// In-process [`CaptureClient`].
#[derive(Debug, Clone)]
pub struct LocalClient {
    handle: CaptureHandle,
    timeout: Duration,
    cancel: CancellationToken,
}

impl CaptureClient for LocalClient {
    async fn send(&self, request: Request) -> Result<Response, ChannelError> {
        self.handle.request(request, self.timeout, &self.cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BeforeRequest, HttpHeader, SendHeaders};
    use crate::settings::{MemoryStore, TRACK_HEADERS_KEY};
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(5);

    fn get(url: &str, ts: f64) -> HostEvent {
        HostEvent::BeforeRequest(BeforeRequest {
            url: url.to_string(),
            method: "GET".to_string(),
            timestamp: ts,
            request_id: None,
            request_body: None,
        })
    }

    fn sent(url: &str, ts: f64) -> HostEvent {
        HostEvent::SendHeaders(SendHeaders {
            url: url.to_string(),
            method: None,
            timestamp: ts,
            request_id: None,
            request_headers: vec![HttpHeader {
                name: "Accept".to_string(),
                value: Some("*/*".to_string()),
            }],
        })
    }

    #[test]
    fn flag_loaded_from_settings_at_construction() {
        let settings = Arc::new(MemoryStore::new());
        assert!(CaptureService::new(50.0, settings.clone()).track_headers());
        settings.set(TRACK_HEADERS_KEY, json!(false)).unwrap();
        let mut svc = CaptureService::new(50.0, settings);
        assert!(!svc.track_headers());
        svc.handle_event(get("https://a.example/", 0.0));
        assert_eq!(
            svc.handle_event(sent("https://a.example/", 1.0)),
            Some(HeaderOutcome::Disabled)
        );
    }

    #[test]
    fn update_flag_persists_and_applies() {
        let settings = Arc::new(MemoryStore::new());
        let mut svc = CaptureService::new(50.0, settings.clone());
        let resp = svc.handle_request(Request::UpdateHeaderTracking { track_headers: false });
        assert!(resp.is_success());
        assert!(!svc.track_headers());
        assert_eq!(settings.get(TRACK_HEADERS_KEY).unwrap(), Some(json!(false)));
    }

    #[tokio::test]
    async fn clear_is_visible_to_next_fetch() {
        let svc = CaptureService::new(50.0, Arc::new(MemoryStore::new()));
        let (handle, _task) = svc.spawn(CancellationToken::new());
        let cancel = CancellationToken::new();
        handle.observe(get("https://a.example/", 0.0)).await.unwrap();
        handle.observe(get("https://b.example/", 1.0)).await.unwrap();

        match handle.request(Request::GetApiCalls, WAIT, &cancel).await.unwrap() {
            Response::ApiCalls { api_calls } => assert_eq!(api_calls.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        let cleared = handle.request(Request::ClearApiCalls, WAIT, &cancel).await.unwrap();
        assert!(cleared.is_success());
        match handle.request(Request::GetApiCalls, WAIT, &cancel).await.unwrap() {
            Response::ApiCalls { api_calls } => assert!(api_calls.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_request_returns_cancelled() {
        let svc = CaptureService::new(50.0, Arc::new(MemoryStore::new()));
        let (handle, _task) = svc.spawn(CancellationToken::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = handle
            .request(Request::GetApiCalls, WAIT, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Cancelled));
    }

    #[tokio::test]
    async fn stopped_service_reports_closed() {
        let shutdown = CancellationToken::new();
        let svc = CaptureService::new(50.0, Arc::new(MemoryStore::new()));
        let (handle, task) = svc.spawn(shutdown.clone());
        shutdown.cancel();
        task.await.unwrap();
        let err = handle
            .request(Request::GetApiCalls, WAIT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        assert!(matches!(
            handle.observe(get("https://a.example/", 0.0)).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_service_times_out() {
        // A receiver nobody drains stands in for a hung service.
        let (tx, _rx) = mpsc::channel(1);
        let handle = CaptureHandle { tx };
        let err = handle
            .request(
                Request::GetApiCalls,
                Duration::from_millis(200),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Timeout(d) if d == Duration::from_millis(200)));
    }
}
