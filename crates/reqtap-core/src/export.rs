//! Postman collection (v2.1) export of captured calls.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::CapturedCall;

pub const COLLECTION_NAME: &str = "Exported API Calls";
pub const COLLECTION_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";
pub const DEFAULT_EXPORT_FILENAME: &str = "postman_collection.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("serialize collection: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub info: CollectionInfo,
    pub item: Vec<CollectionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub name: String,
    pub request: ItemRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub url: String,
    pub method: String,
    pub header: Vec<HeaderEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ItemBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBody {
    pub mode: String,
    pub raw: String,
}

/// Builds the collection document for `calls`, in order.
///
/// With `exclude_cookies`, headers named `cookie` (any case) are left out.
/// Calls without a body object get no `body` section.
pub fn build_collection(calls: &[CapturedCall], exclude_cookies: bool) -> Collection {
    let item = calls
        .iter()
        .map(|call| {
            let header = call
                .headers
                .iter()
                .flatten()
                .filter(|(name, _)| !(exclude_cookies && name.eq_ignore_ascii_case("cookie")))
                .map(|(name, value)| HeaderEntry {
                    key: name.clone(),
                    value: value.clone(),
                })
                .collect();
            let body = call.request_body.as_ref().map(|b| ItemBody {
                mode: "raw".to_string(),
                raw: b.to_value().to_string(),
            });
            CollectionItem {
                name: call.url.clone(),
                request: ItemRequest {
                    url: call.url.clone(),
                    method: call.method.clone(),
                    header,
                    body,
                },
            }
        })
        .collect();

    Collection {
        info: CollectionInfo {
            name: COLLECTION_NAME.to_string(),
            schema: COLLECTION_SCHEMA.to_string(),
        },
        item,
    }
}

/// Writes the collection as pretty JSON to `dir/filename` and returns the path.
pub fn save_collection(
    collection: &Collection,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf, ExportError> {
    let json = serde_json::to_string_pretty(collection)?;
    let path = dir.join(filename);
    std::fs::write(&path, json).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!(items = collection.item.len(), path = %path.display(), "collection exported");
    Ok(path)
}
