//! Source Selectors - per-render gating of whole source groups.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::chain::StageError;
use crate::context::RenderContext;
use crate::pipeline::Source;

/// Decides whether a source group takes part in a render.
pub trait SourceSelector: Send + Sync {
    fn name(&self) -> &str;

    fn select(&self, ctx: &RenderContext, source: &Source) -> Result<bool, StageError>;
}

pub type SharedSourceSelector = Arc<dyn SourceSelector>;

struct FnSourceSelector<F> {
    name: String,
    f: F,
}

impl<F> SourceSelector for FnSourceSelector<F>
where
    F: Fn(&RenderContext, &Source) -> Result<bool, StageError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn select(&self, ctx: &RenderContext, source: &Source) -> Result<bool, StageError> {
        (self.f)(ctx, source)
    }
}

/// Build a selector from a closure.
pub fn source_selector<F>(name: impl Into<String>, f: F) -> SharedSourceSelector
where
    F: Fn(&RenderContext, &Source) -> Result<bool, StageError> + Send + Sync + 'static,
{
    Arc::new(FnSourceSelector {
        name: name.into(),
        f,
    })
}

/// Accept only sources whose name is in `names`.
pub fn by_name<I, S>(names: I) -> SharedSourceSelector
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
    source_selector("by-name", move |_, source| Ok(names.contains(source.name())))
}

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("cancelled before selector {selector}")]
    Cancelled { selector: String },

    #[error("selector {selector} failed: {cause}")]
    Failed {
        selector: String,
        #[source]
        cause: StageError,
    },
}

/// Evaluate `selectors` in order; the first `false` rejects the source
/// without consulting the rest. An empty list accepts everything.
pub fn apply_source_selectors(
    ctx: &RenderContext,
    source: &Source,
    selectors: &[SharedSourceSelector],
) -> Result<bool, SelectorError> {
    for selector in selectors {
        if ctx.is_cancelled() {
            return Err(SelectorError::Cancelled {
                selector: selector.name().to_string(),
            });
        }

        let selected = selector
            .select(ctx, source)
            .map_err(|cause| SelectorError::Failed {
                selector: selector.name().to_string(),
                cause,
            })?;
        if !selected {
            tracing::trace!(selector = selector.name(), source = source.name(), "source rejected");
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(result: bool, calls: Arc<AtomicUsize>) -> SharedSourceSelector {
        source_selector("counting", move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(result)
        })
    }

    #[test]
    fn test_empty_selectors_accept() {
        let source = Source::default();
        assert!(apply_source_selectors(&RenderContext::new(), &source, &[]).unwrap());
    }

    #[test]
    fn test_first_rejection_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let selectors = vec![
            counting(true, calls.clone()),
            counting(false, calls.clone()),
            counting(true, calls.clone()),
        ];
        let selected =
            apply_source_selectors(&RenderContext::new(), &Source::default(), &selectors).unwrap();
        assert!(!selected);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_by_name() {
        let selector = by_name(["frontend"]);
        let ctx = RenderContext::new();
        assert!(selector.select(&ctx, &Source::new(vec![]).named("frontend")).unwrap());
        assert!(!selector.select(&ctx, &Source::new(vec![]).named("backend")).unwrap());
    }

    #[test]
    fn test_selector_error_is_reported() {
        let failing = source_selector("flaky", |_, _| Err("backend unavailable".into()));
        let err =
            apply_source_selectors(&RenderContext::new(), &Source::default(), &[failing]).unwrap_err();
        assert!(matches!(err, SelectorError::Failed { ref selector, .. } if selector == "flaky"));
    }
}
