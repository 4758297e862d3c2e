//! Scorecard certifier
//!
//! Scores GitHub source repositories through a [`ScorecardRunner`] and emits
//! one `Scorecard`/`Json` document per repository.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chainwarden_core::metrics as m;
use chainwarden_core::{BoxFuture, Document, DocumentType, FormatType, SourceInformation};

use crate::Certifier;
use crate::error::CertifierError;
use crate::source::SourceComponent;
use crate::throttle;

/// Collector name recorded on scorecard documents.
pub const SCORECARD_COLLECTOR: &str = "scorecard_certifier";

/// Host the scorecard analysis supports.
const SUPPORTED_HOST: &str = "github.com";

/// Scorecard analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    #[serde(default)]
    pub date: String,
    pub repo: ScorecardRepo,
    #[serde(default)]
    pub scorecard: ScorecardVersion,
    pub score: f64,
    #[serde(default)]
    pub checks: Vec<ScorecardCheck>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorecardRepo {
    pub name: String,
    #[serde(default)]
    pub commit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorecardVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorecardCheck {
    pub name: String,
    pub score: i32,
    #[serde(default)]
    pub reason: String,
}

/// Runs (or looks up) the scorecard analysis for one repository.
pub trait ScorecardRunner: Send + Sync {
    fn score<'a>(
        &'a self,
        component: &'a SourceComponent,
    ) -> BoxFuture<'a, Result<Scorecard, CertifierError>>;
}

/// [`ScorecardRunner`] reading published results from the scorecard REST API
///
/// `GET {base_url}/projects/{host}/{owner}/{repo}`
#[derive(Debug, Clone)]
pub struct ScorecardApiRunner {
    client: reqwest::Client,
    base_url: String,
}

/// Timeout for a single scorecard API request.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

impl ScorecardApiRunner {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Runner with its own client and the default timeout.
    pub fn with_default_client(base_url: impl Into<String>) -> Result<Self, CertifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_API_TIMEOUT_SECS))
            .build()
            .map_err(|e| CertifierError::Transport(e.to_string()))?;
        Ok(Self::new(client, base_url))
    }

    async fn fetch(&self, component: &SourceComponent) -> Result<Scorecard, CertifierError> {
        let mut url = format!("{}/projects/{}", self.base_url, component.repository());
        if let Some(commit) = component.commit.as_deref().filter(|c| is_hex(c)) {
            url.push_str("?commit=");
            url.push_str(commit);
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CertifierError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CertifierError::Transport(format!("{url} answered {status}")));
        }

        response
            .json::<Scorecard>()
            .await
            .map_err(|e| CertifierError::Decode(e.to_string()))
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

impl ScorecardRunner for ScorecardApiRunner {
    fn score<'a>(
        &'a self,
        component: &'a SourceComponent,
    ) -> BoxFuture<'a, Result<Scorecard, CertifierError>> {
        Box::pin(self.fetch(component))
    }
}

/// Certifier producing scorecard documents
pub struct ScorecardCertifier {
    runner: Arc<dyn ScorecardRunner>,
    added_latency: Option<Duration>,
    skipped: Arc<AtomicU64>,
}

impl ScorecardCertifier {
    /// Registration name.
    pub const NAME: &'static str = "scorecard";

    pub fn new(runner: Arc<dyn ScorecardRunner>, added_latency: Option<Duration>) -> Self {
        Self {
            runner,
            added_latency,
            skipped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shares `counter` for repositories skipped after a failed lookup, so
    /// the count survives across per-run instances.
    pub fn with_skip_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.skipped = counter;
        self
    }

    /// Repositories skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::CERTIFIER_ITEMS_SKIPPED_TOTAL, m::LABEL_CERTIFIER => Self::NAME)
            .increment(1);
    }

    async fn certify(
        &self,
        cancel: &CancellationToken,
        component: &SourceComponent,
        docs: &mpsc::Sender<Document>,
    ) -> Result<(), CertifierError> {
        if component.host() != SUPPORTED_HOST {
            debug!(source = %component, "unsupported host, skipping");
            return Ok(());
        }

        if !throttle::pause(cancel, self.added_latency).await {
            return Ok(());
        }

        let scorecard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            res = self.runner.score(component) => res,
        };
        let scorecard = match scorecard {
            Ok(scorecard) => scorecard,
            Err(e) => {
                warn!(certifier = Self::NAME, source = %component, error = %e, "scorecard failed, skipping");
                self.skip();
                return Ok(());
            }
        };

        let payload = match serde_json::to_vec(&scorecard) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(certifier = Self::NAME, source = %component, error = %e, "scorecard not serializable, skipping");
                self.skip();
                return Ok(());
            }
        };

        let doc = Document::new(
            payload,
            DocumentType::Scorecard,
            FormatType::Json,
            SourceInformation::new(SCORECARD_COLLECTOR, component.uri()),
        );
        docs.send(doc)
            .await
            .map_err(|e| CertifierError::Channel(e.to_string()))?;
        debug!(source = %component, score = scorecard.score, "scorecard emitted");
        Ok(())
    }
}

impl Certifier for ScorecardCertifier {
    fn certifier_type(&self) -> &str {
        Self::NAME
    }

    fn certify_component<'a>(
        &'a self,
        cancel: CancellationToken,
        component: &'a SourceComponent,
        docs: mpsc::Sender<Document>,
    ) -> BoxFuture<'a, Result<(), CertifierError>> {
        Box::pin(async move { self.certify(&cancel, component, &docs).await })
    }
}
