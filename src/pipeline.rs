//! Mem Renderer - Single Entry Point
//!
//! Sources are validated once at construction. Every `process` call works on
//! fresh copies, so the renderer itself is never mutated after `new`.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::chain::{apply_chain, build_chain, ChainError, SharedPostRenderer, StageError};
use crate::context::{RenderContext, Values};
use crate::document::{Document, ANNOTATION_CONTENT_HASH, ANNOTATION_SOURCE_TYPE};
use crate::hashing::content_hash;
use crate::options::{RendererConfig, RendererOption};
use crate::selector::{apply_source_selectors, SelectorError};
use crate::validation::validate_source;

/// Renderer type identifier, also written as the provenance annotation.
pub const RENDERER_TYPE: &str = "mem";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid source at index {source_index}: document at index {document_index} has empty content")]
    InvalidSource {
        source_index: usize,
        document_index: usize,
    },

    #[error("source selector error in mem renderer: selector {selector} failed for source {source_index}: {cause}")]
    SourceSelector {
        source_index: usize,
        selector: String,
        #[source]
        cause: StageError,
    },

    #[error("source post-renderer error in mem renderer: stage {stage_index} ({stage}) failed for source {source_index}: {cause}")]
    SourcePostRender {
        source_index: usize,
        stage_index: usize,
        stage: String,
        #[source]
        cause: StageError,
    },

    #[error("renderer post-renderer error in mem renderer: stage {stage_index} ({stage}) failed: {cause}")]
    RenderPostRender {
        stage_index: usize,
        stage: String,
        #[source]
        cause: StageError,
    },

    #[error("render cancelled before {stage}")]
    Cancelled { stage: String },
}

impl RenderError {
    fn from_selector(source_index: usize, err: SelectorError) -> Self {
        match err {
            SelectorError::Cancelled { selector } => Self::Cancelled {
                stage: format!("source selector {selector}"),
            },
            SelectorError::Failed { selector, cause } => Self::SourceSelector {
                source_index,
                selector,
                cause,
            },
        }
    }

    fn from_source_chain(source_index: usize, err: ChainError) -> Self {
        match err {
            ChainError::Cancelled { stage, .. } => Self::Cancelled {
                stage: format!("source post-renderer {stage}"),
            },
            ChainError::Failed {
                stage_index,
                stage,
                cause,
            } => Self::SourcePostRender {
                source_index,
                stage_index,
                stage,
                cause,
            },
        }
    }

    fn from_render_chain(err: ChainError) -> Self {
        match err {
            ChainError::Cancelled { stage, .. } => Self::Cancelled {
                stage: format!("renderer post-renderer {stage}"),
            },
            ChainError::Failed {
                stage_index,
                stage,
                cause,
            } => Self::RenderPostRender {
                stage_index,
                stage,
                cause,
            },
        }
    }
}

/// A named batch of documents plus its own post-render chain.
#[derive(Clone, Default)]
pub struct Source {
    name: String,
    objects: Vec<Document>,
    post_renderers: Vec<SharedPostRenderer>,
}

impl Source {
    pub fn new(objects: Vec<Document>) -> Self {
        Self {
            objects,
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append a stage applied to this source's output before merging.
    pub fn with_post_renderer(mut self, post_renderer: SharedPostRenderer) -> Self {
        self.post_renderers.push(post_renderer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &[Document] {
        &self.objects
    }

    pub fn post_renderers(&self) -> &[SharedPostRenderer] {
        &self.post_renderers
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("objects", &self.objects.len())
            .field(
                "post_renderers",
                &self.post_renderers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Renders documents that are already in memory.
#[derive(Debug, Clone)]
pub struct MemRenderer {
    sources: Vec<Source>,
    config: RendererConfig,
}

impl MemRenderer {
    /// Apply `options` over the defaults and validate every source, failing on
    /// the first invalid one.
    pub fn new(
        sources: Vec<Source>,
        options: impl IntoIterator<Item = RendererOption>,
    ) -> Result<Self, RenderError> {
        let config = RendererConfig::resolve(options);

        for (index, source) in sources.iter().enumerate() {
            validate_source(index, source)?;
        }

        debug!(
            sources = sources.len(),
            filters = config.filters.len(),
            transformers = config.transformers.len(),
            post_renderers = config.post_renderers.len(),
            source_selectors = config.source_selectors.len(),
            source_annotations = config.source_annotations,
            content_hash = config.content_hash,
            "built mem renderer"
        );

        Ok(Self { sources, config })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Render every selected source and run the renderer-level chain over the
    /// merged result. Render-time values are ignored.
    pub fn process(&self, ctx: &RenderContext, _values: &Values) -> Result<Vec<Document>, RenderError> {
        let mut all_objects = Vec::new();

        for (source_index, source) in self.sources.iter().enumerate() {
            let selected = apply_source_selectors(ctx, source, &self.config.source_selectors)
                .map_err(|err| RenderError::from_selector(source_index, err))?;
            if !selected {
                debug!(source_index, source = source.name(), "source not selected");
                continue;
            }

            let source_objects = self.render_source(source);
            let source_objects = apply_chain(ctx, source_objects, source.post_renderers())
                .map_err(|err| RenderError::from_source_chain(source_index, err))?;

            debug!(
                source_index,
                source = source.name(),
                objects = source_objects.len(),
                "rendered source"
            );
            all_objects.extend(source_objects);
        }

        let chain = build_chain(
            &self.config.filters,
            &self.config.transformers,
            &self.config.post_renderers,
        );
        let merged = all_objects.len();
        let result = apply_chain(ctx, all_objects, &chain).map_err(RenderError::from_render_chain)?;

        debug!(merged, rendered = result.len(), "mem render complete");
        Ok(result)
    }

    /// Copy, annotate, then store the digest. The digest is taken from the
    /// copy before the provenance annotation is added.
    fn render_source(&self, source: &Source) -> Vec<Document> {
        source
            .objects()
            .iter()
            .map(|obj| {
                let mut copy = obj.deep_copy();
                let hash = self.config.content_hash.then(|| content_hash(&copy));
                if self.config.source_annotations {
                    copy.set_annotation(ANNOTATION_SOURCE_TYPE, RENDERER_TYPE);
                }
                if let Some(hash) = hash {
                    copy.set_annotation(ANNOTATION_CONTENT_HASH, hash);
                }
                copy
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        RENDERER_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::post_renderer;
    use crate::options::{with_content_hash, with_source_annotations};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_name() {
        let renderer = MemRenderer::new(vec![Source::default()], []).unwrap();
        assert_eq!(renderer.name(), "mem");
    }

    #[test]
    fn test_fail_fast_on_first_invalid_source() {
        let sources = vec![
            Source::new(vec![doc(json!({"kind": "Pod"}))]),
            Source::new(vec![doc(json!({"kind": "Pod"})), Document::default()]),
            Source::new(vec![Document::default()]),
        ];
        let err = MemRenderer::new(sources, []).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidSource {
                source_index: 1,
                document_index: 1
            }
        ));
    }

    #[test]
    fn test_annotation_preserves_other_keys() {
        let source = Source::new(vec![doc(json!({
            "kind": "Pod",
            "metadata": {"annotations": {"team": "core"}}
        }))]);
        let renderer = MemRenderer::new(
            vec![source],
            [with_source_annotations(true), with_content_hash(false)],
        )
        .unwrap();
        let out = renderer.process(&RenderContext::new(), &Values::new()).unwrap();
        let annotations = out[0].annotations();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations["team"], "core");
        assert_eq!(annotations[ANNOTATION_SOURCE_TYPE], RENDERER_TYPE);
    }

    #[test]
    fn test_annotation_keeps_non_string_values() {
        let source = Source::new(vec![doc(json!({
            "kind": "Pod",
            "metadata": {"annotations": {"replicas": 3, "team": "core"}}
        }))]);
        let renderer = MemRenderer::new(vec![source], [with_source_annotations(true)]).unwrap();
        let out = renderer.process(&RenderContext::new(), &Values::new()).unwrap();
        let annotations = &out[0].get("metadata").unwrap()["annotations"];
        assert_eq!(annotations["replicas"], json!(3));
        assert_eq!(annotations["team"], json!("core"));
        assert_eq!(annotations[ANNOTATION_SOURCE_TYPE], json!(RENDERER_TYPE));
        assert!(annotations[ANNOTATION_CONTENT_HASH].is_string());
    }

    #[test]
    fn test_source_post_renderer_sees_only_its_source() {
        let counting = post_renderer("count", |_, docs: Vec<Document>| {
            if docs.len() != 1 {
                return Err(format!("expected 1 document, got {}", docs.len()).into());
            }
            Ok(docs)
        });
        let sources = vec![
            Source::new(vec![doc(json!({"kind": "Pod"}))]).with_post_renderer(counting),
            Source::new(vec![doc(json!({"kind": "Service"})), doc(json!({"kind": "Secret"}))]),
        ];
        let renderer = MemRenderer::new(sources, []).unwrap();
        let out = renderer.process(&RenderContext::new(), &Values::new()).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_source_post_render_error_names_source() {
        let sources = vec![
            Source::new(vec![doc(json!({"kind": "Pod"}))]),
            Source::new(vec![doc(json!({"kind": "Pod"}))])
                .with_post_renderer(post_renderer("reject", |_, _| Err("nope".into()))),
        ];
        let renderer = MemRenderer::new(sources, []).unwrap();
        let err = renderer.process(&RenderContext::new(), &Values::new()).unwrap_err();
        match err {
            RenderError::SourcePostRender {
                source_index,
                stage_index,
                ref stage,
                ..
            } => {
                assert_eq!(source_index, 1);
                assert_eq!(stage_index, 0);
                assert_eq!(stage, "reject");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("source post-renderer error"));
    }

    #[test]
    fn test_cancelled_context_aborts_render() {
        let renderer = MemRenderer::new(
            vec![Source::new(vec![doc(json!({"kind": "Pod"}))])],
            [crate::options::with_post_renderer(post_renderer("late", |_, d| Ok(d)))],
        )
        .unwrap();
        let ctx = RenderContext::new();
        ctx.cancel();
        let err = renderer.process(&ctx, &Values::new()).unwrap_err();
        assert!(matches!(err, RenderError::Cancelled { .. }));
    }
}
