//! Async plumbing shared by collectors, certifiers and sinks

use std::future::Future;
use std::pin::Pin;

use crate::document::Document;
use crate::error::IngestError;

/// Boxed, `Send` future returned by dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Consumer end of the document stream.
///
/// `emit` is called from a single consumer task only, one document at a time.
/// Implementations that share state with other tasks (e.g. a live counter)
/// must still use atomics or locks for that state.
pub trait DocumentEmitter: Send + Sync {
    /// Hands one document to the ingestion sink.
    fn emit(&self, document: Document) -> BoxFuture<'_, Result<(), IngestError>>;
}
