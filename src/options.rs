//! Renderer Options - ordered configuration deltas
//!
//! Options are applied in order to a [`RendererConfig`] during construction.
//! Fields do not all merge the same way:
//!
//! | field                | rule    |
//! |----------------------|---------|
//! | filters              | replace |
//! | transformers         | replace |
//! | post-renderers       | append  |
//! | source selectors     | append  |
//! | source annotations   | replace |
//! | content hash         | replace |

use std::fmt;

use crate::chain::{Filter, SharedPostRenderer, Transformer};
use crate::selector::SharedSourceSelector;

/// Resolved, immutable renderer configuration.
#[derive(Clone)]
pub struct RendererConfig {
    pub filters: Vec<Filter>,
    pub transformers: Vec<Transformer>,
    pub post_renderers: Vec<SharedPostRenderer>,
    pub source_selectors: Vec<SharedSourceSelector>,
    /// Tag every document with the renderer type.
    pub source_annotations: bool,
    /// Store a SHA-256 content digest on every document. Default: true.
    pub content_hash: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            transformers: Vec::new(),
            post_renderers: Vec::new(),
            source_selectors: Vec::new(),
            source_annotations: false,
            content_hash: true,
        }
    }
}

impl fmt::Debug for RendererConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfig")
            .field("filters", &self.filters)
            .field("transformers", &self.transformers)
            .field(
                "post_renderers",
                &self.post_renderers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "source_selectors",
                &self.source_selectors.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("source_annotations", &self.source_annotations)
            .field("content_hash", &self.content_hash)
            .finish()
    }
}

/// Several settings at once. `None` leaves a single-valued field untouched;
/// list fields are appended.
#[derive(Clone, Default)]
pub struct RendererOptions {
    pub filters: Option<Vec<Filter>>,
    pub transformers: Option<Vec<Transformer>>,
    pub post_renderers: Vec<SharedPostRenderer>,
    pub source_selectors: Vec<SharedSourceSelector>,
    pub source_annotations: Option<bool>,
    pub content_hash: Option<bool>,
}

/// One configuration delta.
#[derive(Clone)]
pub enum RendererOption {
    Filters(Vec<Filter>),
    Transformers(Vec<Transformer>),
    PostRenderers(Vec<SharedPostRenderer>),
    SourceSelectors(Vec<SharedSourceSelector>),
    SourceAnnotations(bool),
    ContentHash(bool),
    Bulk(RendererOptions),
}

impl RendererOption {
    pub fn apply_to(self, target: &mut RendererConfig) {
        match self {
            Self::Filters(filters) => target.filters = filters,
            Self::Transformers(transformers) => target.transformers = transformers,
            Self::PostRenderers(post) => target.post_renderers.extend(post),
            Self::SourceSelectors(selectors) => target.source_selectors.extend(selectors),
            Self::SourceAnnotations(enabled) => target.source_annotations = enabled,
            Self::ContentHash(enabled) => target.content_hash = enabled,
            Self::Bulk(opts) => {
                if let Some(filters) = opts.filters {
                    target.filters = filters;
                }
                if let Some(transformers) = opts.transformers {
                    target.transformers = transformers;
                }
                target.post_renderers.extend(opts.post_renderers);
                target.source_selectors.extend(opts.source_selectors);
                if let Some(enabled) = opts.source_annotations {
                    target.source_annotations = enabled;
                }
                if let Some(enabled) = opts.content_hash {
                    target.content_hash = enabled;
                }
            }
        }
    }
}

impl From<RendererOptions> for RendererOption {
    fn from(opts: RendererOptions) -> Self {
        Self::Bulk(opts)
    }
}

impl RendererConfig {
    /// Start from defaults and apply `options` in order.
    pub fn resolve(options: impl IntoIterator<Item = RendererOption>) -> Self {
        let mut config = Self::default();
        for option in options {
            option.apply_to(&mut config);
        }
        config
    }
}

/// Replace the renderer-level filters.
pub fn with_filters(filters: impl IntoIterator<Item = Filter>) -> RendererOption {
    RendererOption::Filters(filters.into_iter().collect())
}

/// Replace the renderer-level transformers.
pub fn with_transformers(transformers: impl IntoIterator<Item = Transformer>) -> RendererOption {
    RendererOption::Transformers(transformers.into_iter().collect())
}

/// Append a renderer-level post-renderer.
pub fn with_post_renderer(post_renderer: SharedPostRenderer) -> RendererOption {
    RendererOption::PostRenderers(vec![post_renderer])
}

/// Append a source selector.
pub fn with_source_selector(selector: SharedSourceSelector) -> RendererOption {
    RendererOption::SourceSelectors(vec![selector])
}

pub fn with_source_annotations(enabled: bool) -> RendererOption {
    RendererOption::SourceAnnotations(enabled)
}

pub fn with_content_hash(enabled: bool) -> RendererOption {
    RendererOption::ContentHash(enabled)
}
