//! Source Validation
//!
//! Runs once per source group when a renderer is built, never during a render.

use crate::pipeline::{RenderError, Source};

#[cfg(feature = "test-hooks")]
use std::cell::Cell;

#[cfg(feature = "test-hooks")]
thread_local! {
    static VALIDATION_CALL_COUNT: Cell<u32> = const { Cell::new(0) };
}

/// Number of [`validate_source`] calls made on the current thread.
#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.with(Cell::get)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.with(|count| count.set(0));
}

/// Every document in the group must have non-empty content.
pub fn validate_source(source_index: usize, source: &Source) -> Result<(), RenderError> {
    #[cfg(feature = "test-hooks")]
    VALIDATION_CALL_COUNT.with(|count| count.set(count.get() + 1));

    match source.objects().iter().position(|doc| doc.is_empty()) {
        Some(document_index) => Err(RenderError::InvalidSource {
            source_index,
            document_index,
        }),
        None => Ok(()),
    }
}
