//! Captured request records and the body representation attached to them.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sentinel stored when a raw body is not UTF-8 JSON.
pub const UNPARSABLE_BODY: &str = "Unable to parse raw request body";

/// Sentinel stored when the host reported a body object without any payload.
pub const NO_BODY: &str = "No request body data";

/// Identifier assigned by the capture store. Increases in storage order and is
/// never reused, not even after a clear.
pub type CallId = u64;

/// Request headers: name -> value, in the order the host reported them.
pub type HeaderMap = IndexMap<String, String>;

/// Decoded request body.
///
/// Serialized untagged, so the wire form is exactly the form mapping, the JSON
/// value, or one of the sentinel strings.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Form-encoded fields: name -> values, unchanged from the host.
    Form(BTreeMap<String, Vec<String>>),
    /// Raw payload that decoded as UTF-8 JSON.
    Json(Value),
    /// Raw payload present but not UTF-8 JSON.
    Unparsable,
    /// Body object present but carrying neither form data nor raw bytes.
    Empty,
}

impl RequestBody {
    /// JSON value this body serializes to.
    pub fn to_value(&self) -> Value {
        match self {
            RequestBody::Form(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| {
                        let values = v.iter().cloned().map(Value::String).collect();
                        (k.clone(), Value::Array(values))
                    })
                    .collect(),
            ),
            RequestBody::Json(v) => v.clone(),
            RequestBody::Unparsable => Value::String(UNPARSABLE_BODY.to_string()),
            RequestBody::Empty => Value::String(NO_BODY.to_string()),
        }
    }

    /// Inverse of [`RequestBody::to_value`]. A JSON string equal to a sentinel
    /// maps back to that sentinel; an object whose values are all string arrays
    /// is read as form data.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) if s == UNPARSABLE_BODY => RequestBody::Unparsable,
            Value::String(s) if s == NO_BODY => RequestBody::Empty,
            Value::Object(map) if is_form_shaped(&map) => RequestBody::Form(
                map.into_iter()
                    .map(|(k, v)| {
                        let values = match v {
                            Value::Array(items) => items
                                .into_iter()
                                .filter_map(|i| match i {
                                    Value::String(s) => Some(s),
                                    _ => None,
                                })
                                .collect(),
                            _ => Vec::new(),
                        };
                        (k, values)
                    })
                    .collect(),
            ),
            other => RequestBody::Json(other),
        }
    }
}

fn is_form_shaped(map: &serde_json::Map<String, Value>) -> bool {
    !map.is_empty()
        && map.values().all(|v| match v {
            Value::Array(items) => items.iter().all(Value::is_string),
            _ => false,
        })
}

impl Serialize for RequestBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RequestBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RequestBody::from_value)
    }
}

/// One observed network request.
///
/// `url`, `method`, `timestamp` and `request_body` are fixed at creation;
/// `headers` is written at most once by the capture store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedCall {
    pub id: CallId,
    pub url: String,
    pub method: String,
    /// Host clock, milliseconds.
    pub timestamp: f64,
    /// `None` when the host reported no body object at all.
    pub request_body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderMap>,
    /// Host request id, when the feed supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}
