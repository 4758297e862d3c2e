//! Fan-out collection runner
//!
//! [`collect`] runs every registered [`Collector`] concurrently against one
//! target, all writing into the caller's document stream.
//!
//! # Error propagation
//!
//! Workers share one child [`CancellationToken`]. The first worker error
//! cancels it; the runner still joins every worker before returning that
//! error, so no collector outlives the call.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chainwarden_core::metrics as m;
use chainwarden_core::{BoxFuture, Document, Registry};

use crate::error::CollectorError;

/// Capacity of the stream owned by [`collect_documents`].
const DOCUMENT_CHANNEL_CAPACITY: usize = 256;

/// A pluggable document source
///
/// Implementations push zero or more documents for `target` onto `docs` and
/// must never close the stream themselves (dropping their sender clone is
/// fine). They should check `cancel` between external calls and return
/// [`CollectorError::Cancelled`] once it fires.
pub trait Collector: Send + Sync {
    /// Stable name used in logs and metrics.
    fn name(&self) -> &str;

    /// Collects documents for `target`.
    fn collect<'a>(
        &'a self,
        cancel: CancellationToken,
        target: &'a str,
        docs: mpsc::Sender<Document>,
    ) -> BoxFuture<'a, Result<(), CollectorError>>;
}

/// Registry of collector factories.
pub type CollectorRegistry = Registry<dyn Collector>;

/// Runs every registered collector against `target`.
///
/// Returns `Ok(())` immediately when the registry is empty. Producing no
/// documents is not an error. The stream stays open: `docs` belongs to the
/// caller, who closes it after this call returns.
pub async fn collect(
    cancel: &CancellationToken,
    registry: &CollectorRegistry,
    target: &str,
    docs: &mpsc::Sender<Document>,
) -> Result<(), CollectorError> {
    let collectors = registry.instantiate_all();
    if collectors.is_empty() {
        debug!(target, "no collectors registered");
        return Ok(());
    }

    let token = cancel.child_token();
    let target: Arc<str> = Arc::from(target);
    let mut workers = JoinSet::new();

    for (name, collector) in collectors {
        let token = token.clone();
        let target = Arc::clone(&target);
        let tx = docs.clone();
        workers.spawn(async move {
            info!(collector = %name, target = %target, "collecting artifacts");
            let result = collector.collect(token, &target, tx).await;
            (name, result)
        });
    }

    let mut first_error: Option<CollectorError> = None;
    while let Some(joined) = workers.join_next().await {
        let failure = match joined {
            Ok((name, Ok(()))) => {
                debug!(collector = %name, "collector finished");
                None
            }
            Ok((name, Err(err))) => {
                // workers we cancelled ourselves report Cancelled; not news
                if first_error.is_some() && matches!(err, CollectorError::Cancelled) {
                    None
                } else {
                    warn!(collector = %name, target = %target, error = %err, "collector failed");
                    Some(err)
                }
            }
            Err(join_err) => Some(CollectorError::Task(join_err.to_string())),
        };

        if let Some(err) = failure {
            if first_error.is_none() {
                token.cancel();
                first_error = Some(err);
            }
        }
    }

    match first_error {
        Some(err) => {
            metrics::counter!(m::COLLECTOR_PASSES_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            Err(err)
        }
        None => {
            metrics::counter!(m::COLLECTOR_PASSES_TOTAL, m::LABEL_RESULT => "success").increment(1);
            Ok(())
        }
    }
}

/// Runs [`collect`] with an internal stream and returns every document.
///
/// The stream is drained concurrently and closed only after the fan-out has
/// joined all producers.
pub async fn collect_documents(
    cancel: &CancellationToken,
    registry: &CollectorRegistry,
    target: &str,
) -> Result<Vec<Document>, CollectorError> {
    let (tx, mut rx) = mpsc::channel(DOCUMENT_CHANNEL_CAPACITY);

    let drain = tokio::spawn(async move {
        let mut documents = Vec::new();
        while let Some(doc) = rx.recv().await {
            documents.push(doc);
        }
        documents
    });

    let result = collect(cancel, registry, target, &tx).await;
    drop(tx);

    let documents = drain
        .await
        .map_err(|e| CollectorError::Task(e.to_string()))?;
    result.map(|()| documents)
}
