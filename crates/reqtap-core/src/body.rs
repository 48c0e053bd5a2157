//! Request body decoding. Never fails: malformed input degrades to a sentinel.

use crate::event::RawRequestBody;
use crate::model::RequestBody;

/// Decodes a host-reported body.
///
/// Form data wins and is kept as-is. Otherwise the raw chunks' bytes are
/// concatenated and parsed as UTF-8 JSON; any failure yields
/// [`RequestBody::Unparsable`]. With neither present the result is
/// [`RequestBody::Empty`].
pub fn decode_request_body(raw: &RawRequestBody) -> RequestBody {
    if let Some(form) = &raw.form_data {
        return RequestBody::Form(form.clone());
    }
    let Some(chunks) = &raw.raw else {
        return RequestBody::Empty;
    };

    let bytes: Vec<u8> = chunks
        .iter()
        .filter_map(|c| c.bytes.as_deref())
        .flatten()
        .copied()
        .collect();

    match std::str::from_utf8(&bytes) {
        Ok(text) => match serde_json::from_str(text) {
            Ok(value) => RequestBody::Json(value),
            Err(e) => {
                tracing::debug!("raw body is not JSON: {}", e);
                RequestBody::Unparsable
            }
        },
        Err(e) => {
            tracing::debug!("raw body is not UTF-8: {}", e);
            RequestBody::Unparsable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RawChunk;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn raw(chunks: &[&[u8]]) -> RawRequestBody {
        RawRequestBody {
            raw: Some(
                chunks
                    .iter()
                    .map(|b| RawChunk {
                        bytes: Some(b.to_vec()),
                        file: None,
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn form_data_is_returned_unchanged() {
        let mut form = BTreeMap::new();
        form.insert("user".to_string(), vec!["alice".to_string()]);
        form.insert("tags".to_string(), vec!["a".to_string(), "b".to_string()]);
        let body = RawRequestBody {
            form_data: Some(form.clone()),
            raw: Some(vec![RawChunk::default()]),
            error: None,
        };
        assert_eq!(decode_request_body(&body), RequestBody::Form(form));
    }

    #[test]
    fn raw_json_is_parsed() {
        let body = raw(&[br#"{"a":1,"b":[true,null]}"#]);
        assert_eq!(
            decode_request_body(&body),
            RequestBody::Json(json!({"a": 1, "b": [true, null]}))
        );
    }

    #[test]
    fn raw_chunks_are_concatenated() {
        let body = raw(&[br#"{"name":"#, br#""x"}"#]);
        assert_eq!(decode_request_body(&body), RequestBody::Json(json!({"name": "x"})));
    }

    #[test]
    fn invalid_json_yields_unparsable_sentinel() {
        assert_eq!(decode_request_body(&raw(&[b"a=1&b=2"])), RequestBody::Unparsable);
        assert_eq!(decode_request_body(&raw(&[b""])), RequestBody::Unparsable);
    }

    #[test]
    fn invalid_utf8_yields_unparsable_sentinel() {
        assert_eq!(
            decode_request_body(&raw(&[&[0xff, 0xfe, 0x7b, 0x7d]])),
            RequestBody::Unparsable
        );
    }

    #[test]
    fn file_only_upload_is_unparsable() {
        let body = RawRequestBody {
            raw: Some(vec![RawChunk {
                bytes: None,
                file: Some("/tmp/upload.bin".to_string()),
            }]),
            ..Default::default()
        };
        assert_eq!(decode_request_body(&body), RequestBody::Unparsable);
    }

    #[test]
    fn no_payload_yields_no_body_sentinel() {
        assert_eq!(decode_request_body(&RawRequestBody::default()), RequestBody::Empty);
        let errored = RawRequestBody {
            error: Some("Unknown error".to_string()),
            ..Default::default()
        };
        assert_eq!(decode_request_body(&errored), RequestBody::Empty);
    }

    #[test]
    fn arbitrary_bytes_never_panic() {
        for seed in 0u8..=255 {
            let bytes: Vec<u8> = (0..17).map(|i| seed.wrapping_mul(31).wrapping_add(i)).collect();
            let decoded = decode_request_body(&raw(&[&bytes]));
            assert!(matches!(decoded, RequestBody::Json(_) | RequestBody::Unparsable));
        }
    }
}
