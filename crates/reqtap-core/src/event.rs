//! Host request-lifecycle events, shaped like WebExtension `webRequest` details.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::HeaderMap;

/// Request body as reported by the host on dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<RawChunk>>,
    /// Set by the host when it failed to read the body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One element of the raw upload data. File uploads carry a path, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpHeader {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Fired once per request when it is first dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeRequest {
    pub url: String,
    pub method: String,
    #[serde(rename = "timeStamp")]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RawRequestBody>,
}

/// Fired when the finalized header set for a request is about to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendHeaders {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(rename = "timeStamp")]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default)]
    pub request_headers: Vec<HttpHeader>,
}

impl SendHeaders {
    /// Folds the header list into a map, keeping host order. A repeated name
    /// keeps its first position and its last value.
    pub fn header_map(&self) -> HeaderMap {
        self.request_headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone().unwrap_or_default()))
            .collect()
    }
}

/// One line of the host event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    BeforeRequest(BeforeRequest),
    SendHeaders(SendHeaders),
}
