//! Engine - runs renderers in sequence
//!
//! A minimal host for [`Renderer`] implementations, plus [`new_engine`] for
//! the common case of one in-memory source.

use thiserror::Error;
use tracing::debug;

use crate::context::{RenderContext, Values};
use crate::document::Document;
use crate::options::RendererOption;
use crate::pipeline::{MemRenderer, RenderError, Source};

/// A pipeline stage that produces documents.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, ctx: &RenderContext, values: &Values) -> Result<Vec<Document>, RenderError>;
}

impl Renderer for MemRenderer {
    fn name(&self) -> &str {
        MemRenderer::name(self)
    }

    fn process(&self, ctx: &RenderContext, values: &Values) -> Result<Vec<Document>, RenderError> {
        MemRenderer::process(self, ctx, values)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine requires at least one renderer")]
    NoRenderers,

    #[error("failed to create mem renderer: {0}")]
    Construction(#[source] RenderError),

    #[error("renderer {name} failed: {cause}")]
    Renderer {
        name: String,
        #[source]
        cause: RenderError,
    },
}

pub struct Engine {
    renderers: Vec<Box<dyn Renderer>>,
}

impl Engine {
    pub fn new(renderers: Vec<Box<dyn Renderer>>) -> Result<Self, EngineError> {
        if renderers.is_empty() {
            return Err(EngineError::NoRenderers);
        }
        Ok(Self { renderers })
    }

    pub fn renderer_names(&self) -> Vec<&str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    pub fn render(&self, ctx: &RenderContext) -> Result<Vec<Document>, EngineError> {
        self.render_with_values(ctx, &Values::new())
    }

    /// Run every renderer in registration order and concatenate the output.
    pub fn render_with_values(
        &self,
        ctx: &RenderContext,
        values: &Values,
    ) -> Result<Vec<Document>, EngineError> {
        let mut objects = Vec::new();
        for renderer in &self.renderers {
            let rendered = renderer
                .process(ctx, values)
                .map_err(|cause| EngineError::Renderer {
                    name: renderer.name().to_string(),
                    cause,
                })?;
            debug!(renderer = renderer.name(), objects = rendered.len(), "renderer finished");
            objects.extend(rendered);
        }
        Ok(objects)
    }
}

/// Build an engine around a single mem renderer for one source.
pub fn new_engine(
    source: Source,
    options: impl IntoIterator<Item = RendererOption>,
) -> Result<Engine, EngineError> {
    let renderer = MemRenderer::new(vec![source], options).map_err(EngineError::Construction)?;
    Engine::new(vec![Box::new(renderer)])
}
