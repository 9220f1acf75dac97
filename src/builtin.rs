//! Stock filters and transformers.

use std::collections::{BTreeMap, BTreeSet};

use crate::chain::{Filter, Transformer};

/// Keep documents whose `kind` is one of `kinds`.
pub fn kind_filter<I, S>(kinds: I) -> Filter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let kinds: BTreeSet<String> = kinds.into_iter().map(Into::into).collect();
    Filter::new("kind", move |_, doc| {
        Ok(doc.kind().map_or(false, |kind| kinds.contains(kind)))
    })
}

/// Keep documents carrying label `key` with exactly `value`.
pub fn label_filter(key: impl Into<String>, value: impl Into<String>) -> Filter {
    let (key, value) = (key.into(), value.into());
    Filter::new("label", move |_, doc| {
        Ok(doc.labels().get(&key) == Some(&value))
    })
}

/// Merge `labels` into every document, overwriting existing keys.
pub fn set_labels(labels: BTreeMap<String, String>) -> Transformer {
    Transformer::new("set-labels", move |_, mut doc| {
        for (key, value) in &labels {
            doc.set_label(key.as_str(), value.as_str());
        }
        Ok(doc)
    })
}

/// Merge `annotations` into every document, overwriting existing keys.
pub fn set_annotations(annotations: BTreeMap<String, String>) -> Transformer {
    Transformer::new("set-annotations", move |_, mut doc| {
        for (key, value) in &annotations {
            doc.set_annotation(key.as_str(), value.as_str());
        }
        Ok(doc)
    })
}
