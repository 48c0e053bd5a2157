//! Owned record store and header correlation.

use std::collections::BTreeMap;

use crate::body::decode_request_body;
use crate::event::{BeforeRequest, SendHeaders};
use crate::model::{CallId, CapturedCall};

/// Default correlation window in host-clock milliseconds.
pub const DEFAULT_CORRELATION_WINDOW_MS: f64 = 50.0;

/// What happened to a header event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// Headers attached to this call.
    Attached(CallId),
    /// Matched a call that already had headers; the event was ignored.
    AlreadyHeadered(CallId),
    /// No call matched; the headers were dropped.
    NoMatch,
    /// Header tracking is off.
    Disabled,
}

/// Append-only store of captured calls, keyed by assigned id.
///
/// Ids increase in arrival order, so iterating the map yields storage order.
#[derive(Debug)]
pub struct CallStore {
    calls: BTreeMap<CallId, CapturedCall>,
    next_id: CallId,
    window_ms: f64,
}

impl Default for CallStore {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_WINDOW_MS)
    }
}

impl CallStore {
    pub fn new(window_ms: f64) -> Self {
        Self {
            calls: BTreeMap::new(),
            next_id: 1,
            window_ms: window_ms.max(0.0),
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn get(&self, id: CallId) -> Option<&CapturedCall> {
        self.calls.get(&id)
    }

    /// Records a dispatched request. Always appends exactly one call.
    pub fn on_request_body(&mut self, event: BeforeRequest) -> CallId {
        let id = self.next_id;
        self.next_id += 1;
        let request_body = event.request_body.as_ref().map(decode_request_body);
        let call = CapturedCall {
            id,
            url: event.url,
            method: event.method,
            timestamp: event.timestamp,
            request_body,
            headers: None,
            request_id: event.request_id,
        };
        tracing::debug!(id, method = %call.method, url = %call.url, "captured call");
        self.calls.insert(id, call);
        id
    }

    /// Attaches the event's headers to its matching call, if any.
    ///
    /// A host request id, when both sides carry one, identifies the call
    /// exactly. Without it the match is heuristic and lossy: the first call in
    /// storage order with the same URL whose timestamp lies within the window.
    /// Under bursts to one URL this can pick an earlier request than the one
    /// that produced the headers. Headers are written once; later matches are
    /// ignored.
    pub fn on_headers(&mut self, event: &SendHeaders, track_headers: bool) -> HeaderOutcome {
        if !track_headers {
            return HeaderOutcome::Disabled;
        }
        let Some(id) = self.find_match(event) else {
            tracing::debug!(url = %event.url, ts = event.timestamp, "no call matches header event");
            return HeaderOutcome::NoMatch;
        };
        let Some(call) = self.calls.get_mut(&id) else {
            return HeaderOutcome::NoMatch;
        };
        if call.headers.is_some() {
            tracing::debug!(id, "call already has headers; ignoring repeat");
            return HeaderOutcome::AlreadyHeadered(id);
        }
        call.headers = Some(event.header_map());
        tracing::debug!(id, url = %call.url, "headers attached");
        HeaderOutcome::Attached(id)
    }

    fn find_match(&self, event: &SendHeaders) -> Option<CallId> {
        if let Some(rid) = event.request_id.as_deref() {
            let exact = self
                .calls
                .values()
                .find(|c| c.request_id.as_deref() == Some(rid) && c.url == event.url);
            if let Some(call) = exact {
                return Some(call.id);
            }
        }
        self.calls
            .values()
            .find(|c| c.url == event.url && (c.timestamp - event.timestamp).abs() <= self.window_ms)
            .map(|c| c.id)
    }

    /// All calls in storage order.
    pub fn snapshot(&self) -> Vec<CapturedCall> {
        self.calls.values().cloned().collect()
    }

    /// Empties the store. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.calls.clear();
    }
}
