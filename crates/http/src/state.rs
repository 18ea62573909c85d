//! Shared application state: the dispatcher registry and the file-info
//! resolver, threaded through every handler via `axum::extract::State`.

use std::sync::Arc;

use cache::{FileInfoResolver, FileInfoSource};
use dispatcher::Dispatcher;

/// Everything a request handler needs beyond the incoming request itself.
pub struct AppState<S> {
    /// Multi-client registry (`spec.md` §4.D).
    pub dispatcher: Dispatcher,
    /// Coalescing file-info resolver (`spec.md` §4.C).
    pub resolver: FileInfoResolver<S>,
    /// Aligned chunk size passed to every transferrer.
    pub part_size: u32,
}

impl<S: FileInfoSource> AppState<S> {
    /// Builds the shared state wrapped in an `Arc`, ready to hand to
    /// [`crate::router`].
    #[must_use]
    pub fn new(dispatcher: Dispatcher, resolver: FileInfoResolver<S>, part_size: u32) -> Arc<Self> {
        Arc::new(Self { dispatcher, resolver, part_size })
    }
}
