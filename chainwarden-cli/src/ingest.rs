//! HTTP ingestion sink
//!
//! Documents are POSTed one per request. Document metadata travels as
//! `x-chainwarden-*` headers, enrichment toggles as query parameters.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info};

use chainwarden_core::config::IngestConfig;
use chainwarden_core::metrics as m;
use chainwarden_core::{BoxFuture, Document, DocumentEmitter, IngestError};

pub const HEADER_DOCUMENT_TYPE: &str = "x-chainwarden-document-type";
pub const HEADER_FORMAT: &str = "x-chainwarden-format";
pub const HEADER_COLLECTOR: &str = "x-chainwarden-collector";
pub const HEADER_SOURCE: &str = "x-chainwarden-source";

/// Enrichment the sink should apply while ingesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    pub query_vulns: bool,
    pub query_licenses: bool,
    pub add_vuln_metadata: bool,
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            query_vulns: config.query_vulns,
            query_licenses: config.query_licenses,
            add_vuln_metadata: config.add_vuln_metadata,
        }
    }

    fn query_string(&self) -> String {
        format!(
            "query_vulns={}&query_licenses={}&add_vuln_metadata={}",
            self.query_vulns, self.query_licenses, self.add_vuln_metadata
        )
    }
}

/// Destination for one document at a time.
pub trait IngestSink: Send + Sync {
    fn ingest<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, Result<(), IngestError>>;
}

/// [`IngestSink`] that POSTs payloads to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpIngestSink {
    client: reqwest::Client,
    url: String,
}

impl HttpIngestSink {
    pub fn new(client: reqwest::Client, endpoint: &str, options: IngestOptions) -> Self {
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Self {
            client,
            url: format!("{endpoint}{separator}{}", options.query_string()),
        }
    }

    /// Full request URL, query string included.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, document: &Document) -> Result<(), IngestError> {
        let info = document.source_information();
        let started = Instant::now();

        let result = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(HEADER_DOCUMENT_TYPE, document.document_type().to_string())
            .header(HEADER_FORMAT, document.format().to_string())
            .header(HEADER_COLLECTOR, info.collector.as_str())
            .header(HEADER_SOURCE, info.source.as_str())
            .body(document.payload().clone())
            .send()
            .await;

        metrics::histogram!(m::INGEST_REQUEST_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let outcome = match result {
            Err(e) => Err(IngestError::Transport(e.to_string())),
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                let status = response.status().as_u16();
                let reason = response.text().await.unwrap_or_default();
                Err(IngestError::Rejected { status, reason })
            }
        };

        let label = if outcome.is_ok() { "ok" } else { "error" };
        metrics::counter!(m::INGEST_REQUESTS_TOTAL, m::LABEL_RESULT => label).increment(1);
        outcome
    }
}

impl IngestSink for HttpIngestSink {
    fn ingest<'a>(&'a self, document: &'a Document) -> BoxFuture<'a, Result<(), IngestError>> {
        Box::pin(self.post(document))
    }
}

/// Parses a header file: one `Name: value` per line, blank lines and
/// `#` comments ignored.
pub fn parse_headers(text: &str) -> Result<HeaderMap, IngestError> {
    let mut headers = HeaderMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = index + 1;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| IngestError::InvalidHeader(format!("line {line_no}: missing ':'")))?;

        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| IngestError::InvalidHeader(format!("line {line_no}: {e}")))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| IngestError::InvalidHeader(format!("line {line_no}: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/// Reads and parses a header file.
pub async fn load_headers(path: &Path) -> Result<HeaderMap, IngestError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        IngestError::InvalidHeader(format!("cannot read {}: {e}", path.display()))
    })?;
    let headers = parse_headers(&text)?;
    debug!(path = %path.display(), count = headers.len(), "loaded header file");
    Ok(headers)
}

/// Builds the shared HTTP client with the extra headers as defaults.
pub fn http_client(headers: HeaderMap) -> Result<reqwest::Client, IngestError> {
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| IngestError::Transport(e.to_string()))
}

/// [`DocumentEmitter`] over an [`IngestSink`], counting what it delivers
pub struct IngestEmitter {
    sink: Arc<dyn IngestSink>,
    emitted: AtomicU64,
}

impl IngestEmitter {
    pub fn new(sink: Arc<dyn IngestSink>) -> Self {
        Self {
            sink,
            emitted: AtomicU64::new(0),
        }
    }

    /// Documents delivered so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl DocumentEmitter for IngestEmitter {
    fn emit(&self, document: Document) -> BoxFuture<'_, Result<(), IngestError>> {
        Box::pin(async move {
            self.sink.ingest(&document).await?;
            let total = self.emitted.fetch_add(1, Ordering::Relaxed) + 1;
            info!(
                document_type = %document.document_type(),
                source = %document.source_information().source,
                total,
                "document ingested"
            );
            Ok(())
        })
    }
}
