//! Inspection session: mirrors the capture service's calls, filters, renders
//! and exports them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::client::{CaptureClient, ChannelError};
use crate::export::{self, Collection, ExportError};
use crate::filter::CallFilter;
use crate::model::CapturedCall;
use crate::protocol::{Request, Response};
use crate::settings::{self, SettingsStore};

#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("unexpected response from capture service: {0:?}")]
    Unexpected(Response),
    #[error("settings: {0:#}")]
    Settings(anyhow::Error),
    #[error("Download failed. Error: {0}")]
    Export(#[from] ExportError),
}

/// One inspection session against a capture service.
///
/// The mirrored calls are a copy taken by [`Inspector::load`] and go stale as
/// soon as the service captures anything new.
pub struct Inspector<C> {
    client: C,
    settings: Arc<dyn SettingsStore>,
    calls: Vec<CapturedCall>,
    pub filter: CallFilter,
    pub exclude_cookies: bool,
}

impl<C: CaptureClient> Inspector<C> {
    pub fn new(client: C, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            client,
            settings,
            calls: Vec::new(),
            filter: CallFilter::default(),
            exclude_cookies: false,
        }
    }

    /// Mirrored calls, unfiltered.
    pub fn calls(&self) -> &[CapturedCall] {
        &self.calls
    }

    /// Fetches the current calls from the service into the mirror.
    pub async fn load(&mut self) -> Result<usize, InspectError> {
        match self.client.send(Request::GetApiCalls).await? {
            Response::ApiCalls { api_calls } => {
                tracing::debug!(count = api_calls.len(), "loaded api calls");
                self.calls = api_calls;
                Ok(self.calls.len())
            }
            other => Err(InspectError::Unexpected(other)),
        }
    }

    /// Mirrored calls passing the current filter.
    pub fn visible(&self) -> Vec<CapturedCall> {
        self.filter.apply(&self.calls)
    }

    /// Text listing of the visible calls, one block per call.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for call in self.visible() {
            out.push_str(&render_call(&call));
        }
        out
    }

    /// Collection document for the visible calls.
    pub fn collection(&self) -> Collection {
        export::build_collection(&self.visible(), self.exclude_cookies)
    }

    /// Writes the collection for the visible calls into `dir`.
    pub fn export(&self, dir: &Path, filename: &str) -> Result<PathBuf, InspectError> {
        Ok(export::save_collection(&self.collection(), dir, filename)?)
    }

    /// Clears the service's calls; the mirror is emptied only on success.
    pub async fn clear(&mut self) -> Result<(), InspectError> {
        let response = self.client.send(Request::ClearApiCalls).await?;
        if !response.is_success() {
            return Err(InspectError::Unexpected(response));
        }
        self.calls.clear();
        tracing::info!("logs cleared");
        Ok(())
    }

    /// Stored header-tracking flag (enabled unless explicitly off).
    pub fn track_headers(&self) -> Result<bool, InspectError> {
        settings::track_headers_enabled(self.settings.as_ref()).map_err(InspectError::Settings)
    }

    /// Persists the flag, then pushes it to the running service.
    pub async fn set_track_headers(&self, enabled: bool) -> Result<(), InspectError> {
        settings::set_track_headers(self.settings.as_ref(), enabled)
            .map_err(InspectError::Settings)?;
        let response = self
            .client
            .send(Request::UpdateHeaderTracking {
                track_headers: enabled,
            })
            .await?;
        if !response.is_success() {
            return Err(InspectError::Unexpected(response));
        }
        Ok(())
    }
}

fn render_call(call: &CapturedCall) -> String {
    let mut block = format!("{} {}\n", call.method, call.url);
    if let Some(headers) = &call.headers {
        let json = serde_json::to_string(headers).unwrap_or_default();
        block.push_str(&format!("Headers: {json}\n"));
    }
    let body = call
        .request_body
        .as_ref()
        .map_or_else(|| "null".to_string(), |b| b.to_value().to_string());
    block.push_str(&format!("Body: {body}\n"));
    block
}
