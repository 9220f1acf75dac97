//! Manifest Render Mem - In-Memory Rendering Stage
//!
//! # Render Order (Fixed)
//! 1. Select sources
//! 2. Copy documents
//! 3. Annotate provenance
//! 4. Fingerprint content
//! 5. Per-source post-renderers
//! 6. Merge, then filters, transformers, post-renderers

pub mod builtin;
pub mod chain;
pub mod context;
pub mod document;
pub mod engine;
pub mod hashing;
pub mod input;
pub mod options;
pub mod pipeline;
pub mod selector;
pub mod validation;

pub use chain::{post_renderer, Filter, PostRenderer, SharedPostRenderer, StageError, Transformer};
pub use context::{RenderContext, Values};
pub use document::{
    Document, ANNOTATION_CONTENT_HASH, ANNOTATION_SOURCE_FILE, ANNOTATION_SOURCE_PATH,
    ANNOTATION_SOURCE_TYPE,
};
pub use engine::{new_engine, Engine, EngineError, Renderer};
pub use hashing::{canonical_json, content_hash, set_content_hash};
pub use options::{
    with_content_hash, with_filters, with_post_renderer, with_source_annotations,
    with_source_selector, with_transformers, RendererConfig, RendererOption, RendererOptions,
};
pub use pipeline::{MemRenderer, RenderError, Source, RENDERER_TYPE};
pub use selector::{source_selector, SharedSourceSelector, SourceSelector};
