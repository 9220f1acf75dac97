//! Input loading - JSON source groups for the CLI.
//!
//! Accepted shapes:
//! - `{"sources": [{"name": "web", "objects": [...]}, ...]}`
//! - `[{...}, {...}]` (one unnamed source)
//! - `{...}` (a single document)

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::Document;
use crate::pipeline::Source;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {path}: {cause}")]
    Io {
        path: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("invalid input JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct SourceSpec {
    #[serde(default)]
    name: String,
    #[serde(default)]
    objects: Vec<Document>,
}

/// Parse one of the accepted shapes. A top-level object with a `sources` key
/// is always read as source groups, so a malformed group is an error rather
/// than a single document.
pub fn parse_sources(json: &str) -> Result<Vec<Source>, InputError> {
    let value: Value = serde_json::from_str(json)?;
    let sources = match value {
        Value::Object(mut map) if map.contains_key("sources") => {
            let specs: Vec<SourceSpec> =
                serde_json::from_value(map.remove("sources").unwrap_or(Value::Null))?;
            specs
                .into_iter()
                .map(|spec| Source::new(spec.objects).named(spec.name))
                .collect()
        }
        Value::Array(items) => vec![Source::new(serde_json::from_value(Value::Array(items))?)],
        other => vec![Source::new(vec![serde_json::from_value(other)?])],
    };
    Ok(sources)
}

pub fn load_sources(path: &Path) -> Result<Vec<Source>, InputError> {
    let content = fs::read_to_string(path).map_err(|cause| InputError::Io {
        path: path.display().to_string(),
        cause,
    })?;
    parse_sources(&content)
}
