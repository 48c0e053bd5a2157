//! HAR 1.2 import: replays recorded requests as host events.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::event::{BeforeRequest, HostEvent, HttpHeader, RawChunk, RawRequestBody, SendHeaders};

/// Spacing between replayed entries on the synthetic clock, in milliseconds.
const ENTRY_SPACING_MS: f64 = 1000.0;

#[derive(Debug, Deserialize)]
struct HarLog {
    log: HarRoot,
}

#[derive(Debug, Deserialize)]
struct HarRoot {
    #[serde(default)]
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
    #[serde(default)]
    post_data: Option<HarPostData>,
}

#[derive(Debug, Deserialize)]
struct HarHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct HarPostData {
    #[serde(default)]
    params: Vec<HarParam>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HarParam {
    name: String,
    #[serde(default)]
    value: Option<String>,
}

/// Reads a HAR file and turns each entry into a `beforeRequest` followed by a
/// `sendHeaders` event. Both carry a synthetic request id so headers
/// correlate exactly.
pub fn load_har_events(path: &Path) -> Result<Vec<HostEvent>> {
    let bytes = std::fs::read(path).with_context(|| format!("read HAR file: {}", path.display()))?;
    har_events_from_slice(&bytes).with_context(|| format!("parse HAR JSON: {}", path.display()))
}

pub fn har_events_from_slice(bytes: &[u8]) -> Result<Vec<HostEvent>> {
    let har: HarLog = serde_json::from_slice(bytes)?;
    let mut events = Vec::with_capacity(har.log.entries.len() * 2);
    for (index, entry) in har.log.entries.into_iter().enumerate() {
        let request_id = format!("har-{index}");
        let timestamp = index as f64 * ENTRY_SPACING_MS;
        let req = entry.request;
        events.push(HostEvent::BeforeRequest(BeforeRequest {
            url: req.url.clone(),
            method: req.method.clone(),
            timestamp,
            request_id: Some(request_id.clone()),
            request_body: req.post_data.map(post_data_to_body),
        }));
        events.push(HostEvent::SendHeaders(SendHeaders {
            url: req.url,
            method: Some(req.method),
            timestamp,
            request_id: Some(request_id),
            request_headers: req
                .headers
                .into_iter()
                .map(|h| HttpHeader {
                    name: h.name,
                    value: Some(h.value),
                })
                .collect(),
        }));
    }
    Ok(events)
}

/// Form params become form data; otherwise the text becomes raw bytes.
fn post_data_to_body(post: HarPostData) -> RawRequestBody {
    if !post.params.is_empty() {
        let mut form: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for p in post.params {
            form.entry(p.name).or_default().push(p.value.unwrap_or_default());
        }
        return RawRequestBody {
            form_data: Some(form),
            ..Default::default()
        };
    }
    RawRequestBody {
        raw: post.text.map(|t| {
            vec![RawChunk {
                bytes: Some(t.into_bytes()),
                file: None,
            }]
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HAR: &str = r#"{
        "log": {
            "version": "1.2",
            "entries": [
                {
                    "request": {
                        "method": "POST",
                        "url": "https://api.example.com/login",
                        "headers": [ { "name": "Cookie", "value": "session=abc123" } ],
                        "postData": { "mimeType": "application/json", "text": "{\"user\":\"a\"}" }
                    },
                    "response": { "status": 200, "headers": [] }
                },
                {
                    "request": {
                        "method": "POST",
                        "url": "https://api.example.com/form",
                        "headers": [],
                        "postData": {
                            "mimeType": "application/x-www-form-urlencoded",
                            "params": [ { "name": "q", "value": "1" }, { "name": "q", "value": "2" } ]
                        }
                    },
                    "response": { "status": 200, "headers": [] }
                },
                {
                    "request": { "method": "GET", "url": "https://cdn.example.com/app.js", "headers": [] },
                    "response": { "status": 304, "headers": [] }
                }
            ]
        }
    }"#;

    #[test]
    fn entries_become_paired_events() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(HAR.as_bytes()).unwrap();
        f.flush().unwrap();
        let events = load_har_events(f.path()).unwrap();
        assert_eq!(events.len(), 6);

        match (&events[0], &events[1]) {
            (HostEvent::BeforeRequest(b), HostEvent::SendHeaders(h)) => {
                assert_eq!(b.request_id, h.request_id);
                let raw = b.request_body.as_ref().unwrap().raw.as_ref().unwrap();
                assert_eq!(raw[0].bytes.as_deref(), Some(&br#"{"user":"a"}"#[..]));
                assert_eq!(h.header_map().get("Cookie").unwrap(), "session=abc123");
            }
            other => panic!("unexpected pair {other:?}"),
        }
        match &events[2] {
            HostEvent::BeforeRequest(b) => {
                let form = b.request_body.as_ref().unwrap().form_data.as_ref().unwrap();
                assert_eq!(form["q"], vec!["1".to_string(), "2".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &events[4] {
            HostEvent::BeforeRequest(b) => assert!(b.request_body.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_har_is_an_error() {
        assert!(har_events_from_slice(b"{\"log\":").is_err());
        assert!(har_events_from_slice(br#"{"log":{"entries":[]}}"#).unwrap().is_empty());
    }
}
