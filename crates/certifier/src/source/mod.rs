//! Component discovery
//!
//! [`SourceQuery`] pages through a [`SourceClient`] and turns the listed
//! source repositories into [`SourceComponent`]s for the certifiers.
//!
//! # Rate limiting
//!
//! - `batch_size`: page size requested from the client
//! - `added_latency`: wait before every page request (cancellable)

mod graphql;

pub use graphql::GraphqlSourceClient;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chainwarden_core::BoxFuture;
use chainwarden_core::metrics as m;

use crate::ComponentQuery;
use crate::config::CertifierRunConfig;
use crate::error::CertifierError;
use crate::throttle;

/// One source repository as listed by the knowledge graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Graph node id of the name entry
    pub id: String,
    /// Source type, e.g. `git`
    pub source_type: String,
    /// Host and owner, e.g. `github.com/acme`
    pub namespace: String,
    /// Repository name
    pub name: String,
    pub tag: Option<String>,
    pub commit: Option<String>,
    /// Whether a scorecard is already attached to this source
    pub has_scorecard: bool,
}

/// One page of sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePage {
    pub sources: Vec<SourceRecord>,
    /// Cursor for the next page; `None` on the last page
    pub next_cursor: Option<String>,
}

/// Paginated source listing
pub trait SourceClient: Send + Sync {
    /// Fetches up to `first` sources after `after`.
    fn fetch_page<'a>(
        &'a self,
        after: Option<&'a str>,
        first: usize,
    ) -> BoxFuture<'a, Result<SourcePage, CertifierError>>;
}

/// A certifiable source repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceComponent {
    pub id: String,
    pub source_type: String,
    pub namespace: String,
    pub name: String,
    pub tag: Option<String>,
    pub commit: Option<String>,
}

impl SourceComponent {
    /// `namespace/name`, e.g. `github.com/acme/app`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Host part of the namespace, e.g. `github.com`
    pub fn host(&self) -> &str {
        self.namespace.split('/').next().unwrap_or_default()
    }

    /// Repository URI with the pinned revision, if any.
    pub fn uri(&self) -> String {
        let base = format!("{}+https://{}", self.source_type, self.repository());
        match (&self.commit, &self.tag) {
            (Some(commit), _) => format!("{base}@{commit}"),
            (None, Some(tag)) => format!("{base}@{tag}"),
            (None, None) => base,
        }
    }
}

impl fmt::Display for SourceComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

impl TryFrom<SourceRecord> for SourceComponent {
    type Error = CertifierError;

    fn try_from(record: SourceRecord) -> Result<Self, Self::Error> {
        if record.namespace.trim().is_empty() || record.name.trim().is_empty() {
            return Err(CertifierError::Resolve(format!(
                "source '{}' has no namespace or name",
                record.id
            )));
        }
        let source_type = if record.source_type.is_empty() {
            "git".to_owned()
        } else {
            record.source_type
        };
        Ok(Self {
            id: record.id,
            source_type,
            namespace: record.namespace,
            name: record.name,
            tag: record.tag.filter(|t| !t.is_empty()),
            commit: record.commit.filter(|c| !c.is_empty()),
        })
    }
}

/// Paginating source query feeding the scorecard certifier
pub struct SourceQuery {
    client: Arc<dyn SourceClient>,
    batch_size: usize,
    added_latency: Option<Duration>,
}

impl SourceQuery {
    pub fn new(client: Arc<dyn SourceClient>, config: &CertifierRunConfig) -> Self {
        Self {
            client,
            batch_size: config.batch_size(),
            added_latency: config.added_latency(),
        }
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<SourceComponent>,
    ) -> Result<(), CertifierError> {
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut sent = 0usize;

        loop {
            if !throttle::pause(cancel, self.added_latency).await {
                debug!(pages, "source query cancelled");
                return Ok(());
            }

            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                page = self.client.fetch_page(cursor.as_deref(), self.batch_size) => page?,
            };
            pages += 1;
            metrics::counter!(m::CERTIFIER_PAGES_FETCHED_TOTAL).increment(1);
            debug!(page = pages, sources = page.sources.len(), "source page fetched");

            for record in page.sources {
                if record.has_scorecard {
                    debug!(source = %record.id, "source already scored, skipping");
                    continue;
                }
                let component = match SourceComponent::try_from(record) {
                    Ok(component) => component,
                    Err(e) => {
                        warn!(error = %e, "skipping unresolvable source");
                        metrics::counter!(m::CERTIFIER_SOURCES_SKIPPED_TOTAL).increment(1);
                        continue;
                    }
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    res = tx.send(component) => {
                        res.map_err(|e| CertifierError::Channel(e.to_string()))?;
                    }
                }
                sent += 1;
            }

            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if cursor.as_deref() == Some(next.as_str()) {
                        return Err(CertifierError::Decode(format!(
                            "page cursor '{next}' did not advance"
                        )));
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        info!(pages, components = sent, "source query finished");
        Ok(())
    }
}

impl ComponentQuery for SourceQuery {
    fn get_components<'a>(
        &'a self,
        cancel: CancellationToken,
        tx: mpsc::Sender<SourceComponent>,
    ) -> BoxFuture<'a, Result<(), CertifierError>> {
        Box::pin(async move { self.run(&cancel, &tx).await })
    }
}
