//! Hashing System - SHA-256 Content Digests
//!
//! Provides deterministic, reproducible digests so downstream stages can
//! detect content changes without diffing whole manifests.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::document::{Document, ANNOTATION_CONTENT_HASH};

pub const CONTENT_HASH_PREFIX: &str = "sha256:";

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    Ok(sort_value(&v).to_string())
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_value).collect()),
        other => other.clone(),
    }
}

/// Compute the content digest of a document: `sha256:` + 64 lowercase hex chars.
///
/// Only a previously stored content-hash annotation is ignored, so re-hashing
/// a hashed document is stable. Every other annotation counts as content.
pub fn content_hash(doc: &Document) -> String {
    let content = strip_content_hash(doc.deep_copy()).into_value();
    let digest = sha256_hex(sort_value(&content).to_string().as_bytes());
    format!("{CONTENT_HASH_PREFIX}{digest}")
}

/// Store [`content_hash`] under the content-hash annotation.
pub fn set_content_hash(doc: &mut Document) {
    let hash = content_hash(doc);
    doc.set_annotation(ANNOTATION_CONTENT_HASH, hash);
}

// Containers are only pruned when removing the digest emptied them, so
// `{"metadata": {}}` and `{}` still hash differently.
fn strip_content_hash(mut doc: Document) -> Document {
    let Some(object) = doc.object() else {
        return doc;
    };
    if !has_content_hash(object) {
        return doc;
    }

    let object = doc.object_mut();
    let mut drop_metadata = false;
    if let Some(Value::Object(metadata)) = object.get_mut("metadata") {
        let mut drop_annotations = false;
        if let Some(Value::Object(annotations)) = metadata.get_mut("annotations") {
            annotations.remove(ANNOTATION_CONTENT_HASH);
            drop_annotations = annotations.is_empty();
        }
        if drop_annotations {
            metadata.remove("annotations");
            drop_metadata = metadata.is_empty();
        }
    }
    if drop_metadata {
        object.remove("metadata");
    }
    doc
}

fn has_content_hash(object: &Map<String, Value>) -> bool {
    object
        .get("metadata")
        .and_then(|m| m.get("annotations"))
        .and_then(Value::as_object)
        .map_or(false, |annotations| annotations.contains_key(ANNOTATION_CONTENT_HASH))
}
