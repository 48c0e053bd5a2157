//! Request/response messages between the inspection side and the capture service.
//!
//! Wire form is JSON: requests are tagged by `action`, responses are plain
//! objects (`{"apiCalls": [...]}`, `{"success": true}` or `{"error": "..."}`).

use serde::{Deserialize, Serialize};

use crate::model::CapturedCall;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetApiCalls,
    ClearApiCalls,
    UpdateHeaderTracking {
        #[serde(rename = "trackHeaders")]
        track_headers: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    ApiCalls { api_calls: Vec<CapturedCall> },
    Success { success: bool },
    Error { error: String },
}

impl Response {
    pub fn ok() -> Self {
        Response::Success { success: true }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { success: true })
    }
}
