//! Document Model - Opaque Manifest Records
//!
//! A document is a JSON object tree. The renderer only looks at a handful of
//! well-known paths (`kind`, `metadata.annotations`, ...) and treats the rest
//! as an opaque body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Names the component that produced a document.
pub const ANNOTATION_SOURCE_TYPE: &str = "render.manifest-kit.io/source-type";
/// Path of the source a document was loaded from. Never written by the mem renderer.
pub const ANNOTATION_SOURCE_PATH: &str = "render.manifest-kit.io/source-path";
/// File a document was loaded from. Never written by the mem renderer.
pub const ANNOTATION_SOURCE_FILE: &str = "render.manifest-kit.io/source-file";
/// `sha256:<hex>` digest of the document content.
pub const ANNOTATION_CONTENT_HASH: &str = "render.manifest-kit.io/content-hash";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document must be a JSON object or null, got {0}")]
    NotAnObject(&'static str),
}

/// One manifest. `None` means the document has no content at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    object: Option<Map<String, Value>>,
}

impl Document {
    pub fn new(object: Map<String, Value>) -> Self {
        Self { object: Some(object) }
    }

    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(map) => Ok(Self::new(map)),
            Value::Null => Ok(Self::default()),
            Value::Bool(_) => Err(DocumentError::NotAnObject("bool")),
            Value::Number(_) => Err(DocumentError::NotAnObject("number")),
            Value::String(_) => Err(DocumentError::NotAnObject("string")),
            Value::Array(_) => Err(DocumentError::NotAnObject("array")),
        }
    }

    /// True when there is no top-level content.
    pub fn is_empty(&self) -> bool {
        self.object.as_ref().map_or(true, Map::is_empty)
    }

    pub fn object(&self) -> Option<&Map<String, Value>> {
        self.object.as_ref()
    }

    pub fn object_mut(&mut self) -> &mut Map<String, Value> {
        self.object.get_or_insert_with(Map::new)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.object.as_ref()?.get(key)
    }

    pub fn kind(&self) -> Option<&str> {
        self.get("kind")?.as_str()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.get("apiVersion")?.as_str()
    }

    pub fn name(&self) -> Option<&str> {
        self.get("metadata")?.get("name")?.as_str()
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.string_map("annotations")
    }

    /// Insert one annotation. Every other entry of `metadata.annotations`,
    /// string or not, is kept.
    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set_string_entry("annotations", key.into(), value.into());
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map("labels")
    }

    /// Insert one label, keeping every other entry of `metadata.labels`.
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set_string_entry("labels", key.into(), value.into());
    }

    /// Independent copy sharing no structure with `self`.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn into_value(self) -> Value {
        self.object.map_or(Value::Null, Value::Object)
    }

    // Non-string values are skipped.
    fn string_map(&self, field: &str) -> BTreeMap<String, String> {
        self.get("metadata")
            .and_then(|metadata| metadata.get(field))
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    // A `metadata` or field value that is not an object cannot hold entries
    // and is replaced.
    fn set_string_entry(&mut self, field: &str, key: String, value: String) {
        let metadata = self
            .object_mut()
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Some(metadata) = metadata.as_object_mut() {
            let entries = metadata
                .entry(field)
                .or_insert_with(|| Value::Object(Map::new()));
            if !entries.is_object() {
                *entries = Value::Object(Map::new());
            }
            if let Some(entries) = entries.as_object_mut() {
                entries.insert(key, Value::String(value));
            }
        }
    }
}

impl TryFrom<Value> for Document {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(object: Map<String, Value>) -> Self {
        Self::new(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod() -> Document {
        Document::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": "test-pod",
                "labels": {"app": "test-app"},
                "annotations": {"team": "core", "replicas": 3}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let doc = pod();
        assert_eq!(doc.kind(), Some("Pod"));
        assert_eq!(doc.api_version(), Some("v1"));
        assert_eq!(doc.name(), Some("test-pod"));
        assert_eq!(doc.labels().get("app").map(String::as_str), Some("test-app"));
        // non-string annotation values are not exposed
        assert_eq!(doc.annotations().len(), 1);
    }

    #[test]
    fn test_empty_states() {
        assert!(Document::default().is_empty());
        assert!(Document::new(Map::new()).is_empty());
        assert!(!pod().is_empty());
    }

    #[test]
    fn test_from_value_rejects_scalars() {
        assert!(Document::from_value(json!("text")).is_err());
        assert!(Document::from_value(json!([1, 2])).is_err());
        assert!(Document::from_value(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_set_annotation_keeps_existing_entries() {
        let mut doc = pod();
        doc.set_annotation("added", "yes");
        assert_eq!(
            doc.get("metadata").unwrap(),
            &json!({
                "name": "test-pod",
                "labels": {"app": "test-app"},
                "annotations": {"team": "core", "replicas": 3, "added": "yes"}
            })
        );
    }

    #[test]
    fn test_set_annotation_creates_metadata() {
        let mut doc = Document::from_value(json!({"kind": "ConfigMap"})).unwrap();
        doc.set_annotation("a", "b");
        assert_eq!(doc.get("metadata").unwrap(), &json!({"annotations": {"a": "b"}}));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let original = pod();
        let mut copy = original.deep_copy();
        copy.object_mut().insert("kind".into(), json!("Changed"));
        assert_eq!(original.kind(), Some("Pod"));
    }

    #[test]
    fn test_serializes_transparently() {
        let doc = Document::from_value(json!({"kind": "Pod"})).unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"kind":"Pod"}"#);
        assert_eq!(serde_json::to_string(&Document::default()).unwrap(), "null");
    }
}
