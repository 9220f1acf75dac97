//! Post-Render Chains
//!
//! Every stage that rewrites a batch of documents (filters, transformers,
//! general post-renderers) shares one shape: context and documents in,
//! documents out. Filters and transformers are kept as distinct types so the
//! composition order stays explicit.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::context::RenderContext;
use crate::document::Document;

/// Error produced by an externally supplied stage.
pub type StageError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A stage applied to a whole batch of documents.
pub trait PostRenderer: Send + Sync {
    /// Identifies the stage in error messages and logs.
    fn name(&self) -> &str;

    fn apply(&self, ctx: &RenderContext, docs: Vec<Document>) -> Result<Vec<Document>, StageError>;
}

pub type SharedPostRenderer = Arc<dyn PostRenderer>;

struct FnPostRenderer<F> {
    name: String,
    f: F,
}

impl<F> PostRenderer for FnPostRenderer<F>
where
    F: Fn(&RenderContext, Vec<Document>) -> Result<Vec<Document>, StageError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &RenderContext, docs: Vec<Document>) -> Result<Vec<Document>, StageError> {
        (self.f)(ctx, docs)
    }
}

/// Build a post-renderer from a closure over the whole batch.
pub fn post_renderer<F>(name: impl Into<String>, f: F) -> SharedPostRenderer
where
    F: Fn(&RenderContext, Vec<Document>) -> Result<Vec<Document>, StageError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnPostRenderer {
        name: name.into(),
        f,
    })
}

/// Reduces a batch. Runs before transformers in the renderer-level chain.
#[derive(Clone)]
pub struct Filter(SharedPostRenderer);

impl Filter {
    /// Keep every document for which `predicate` returns `true`.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&RenderContext, &Document) -> Result<bool, StageError> + Send + Sync + 'static,
    {
        Self(post_renderer(name, move |ctx, docs| {
            let mut kept = Vec::with_capacity(docs.len());
            for doc in docs {
                if predicate(ctx, &doc)? {
                    kept.push(doc);
                }
            }
            Ok(kept)
        }))
    }

    pub fn from_stage(stage: SharedPostRenderer) -> Self {
        Self(stage)
    }
}

/// Rewrites documents. Runs after filters in the renderer-level chain.
#[derive(Clone)]
pub struct Transformer(SharedPostRenderer);

impl Transformer {
    /// Map every document through `transform`.
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&RenderContext, Document) -> Result<Document, StageError> + Send + Sync + 'static,
    {
        Self(post_renderer(name, move |ctx, docs| {
            docs.into_iter().map(|doc| transform(ctx, doc)).collect()
        }))
    }

    pub fn from_stage(stage: SharedPostRenderer) -> Self {
        Self(stage)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.0.name()).finish()
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transformer").field(&self.0.name()).finish()
    }
}

/// Renderer-level chain: filters, then transformers, then post-renderers.
///
/// Filters come first so later stages only see the reduced set.
pub fn build_chain(
    filters: &[Filter],
    transformers: &[Transformer],
    post_renderers: &[SharedPostRenderer],
) -> Vec<SharedPostRenderer> {
    filters
        .iter()
        .map(|f| Arc::clone(&f.0))
        .chain(transformers.iter().map(|t| Arc::clone(&t.0)))
        .chain(post_renderers.iter().cloned())
        .collect()
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("cancelled before stage {stage_index} ({stage})")]
    Cancelled { stage_index: usize, stage: String },

    #[error("stage {stage_index} ({stage}) failed: {cause}")]
    Failed {
        stage_index: usize,
        stage: String,
        #[source]
        cause: StageError,
    },
}

/// Run `chain` in order, checking for cancellation before each stage.
pub fn apply_chain(
    ctx: &RenderContext,
    docs: Vec<Document>,
    chain: &[SharedPostRenderer],
) -> Result<Vec<Document>, ChainError> {
    let mut docs = docs;
    for (stage_index, stage) in chain.iter().enumerate() {
        if ctx.is_cancelled() {
            return Err(ChainError::Cancelled {
                stage_index,
                stage: stage.name().to_string(),
            });
        }

        let before = docs.len();
        docs = stage.apply(ctx, docs).map_err(|cause| ChainError::Failed {
            stage_index,
            stage: stage.name().to_string(),
            cause,
        })?;
        tracing::trace!(stage = stage.name(), before, after = docs.len(), "applied stage");
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn doc(kind: &str) -> Document {
        Document::from_value(json!({"kind": kind})).unwrap()
    }

    fn recorder(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> SharedPostRenderer {
        post_renderer(name, move |_, docs| {
            log.lock().unwrap().push(name);
            Ok(docs)
        })
    }

    #[test]
    fn test_chain_order_is_filters_transformers_post_renderers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = build_chain(
            &[Filter::from_stage(recorder("filter", log.clone()))],
            &[Transformer::from_stage(recorder("transformer", log.clone()))],
            &[recorder("post", log.clone())],
        );
        apply_chain(&RenderContext::new(), vec![doc("Pod")], &chain).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["filter", "transformer", "post"]);
    }

    #[test]
    fn test_filter_keeps_matching() {
        let filter = Filter::new("pods", |_, d| Ok(d.kind() == Some("Pod")));
        let out = apply_chain(
            &RenderContext::new(),
            vec![doc("Pod"), doc("ConfigMap"), doc("Pod")],
            &build_chain(&[filter], &[], &[]),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_failure_names_stage() {
        let chain = vec![
            post_renderer("ok", |_, docs| Ok(docs)),
            post_renderer("boom", |_, _| Err("exploded".into())),
        ];
        let err = apply_chain(&RenderContext::new(), vec![doc("Pod")], &chain).unwrap_err();
        match err {
            ChainError::Failed { stage_index, stage, cause } => {
                assert_eq!(stage_index, 1);
                assert_eq!(stage, "boom");
                assert_eq!(cause.to_string(), "exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_before_first_stage() {
        let ctx = RenderContext::new();
        ctx.cancel();
        let chain = vec![post_renderer("never", |_, _| panic!("must not run"))];
        let err = apply_chain(&ctx, vec![], &chain).unwrap_err();
        assert!(matches!(err, ChainError::Cancelled { stage_index: 0, .. }));
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let out = apply_chain(&RenderContext::new(), vec![doc("Pod")], &[]).unwrap();
        assert_eq!(out, vec![doc("Pod")]);
    }
}
