//! `chainwarden scorecard` -- score every source known to the graph
//!
//! Wires the GraphQL source query, the scorecard certifier and the HTTP
//! ingestion sink into a [`CertifyOrchestrator`] and runs it under the
//! [`ShutdownController`].

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::HeaderMap;
use tracing::{info, warn};

use chainwarden_certifier::{
    AbortOnError, Certifier, CertifierRegistry, CertifierRunConfig, ContinueOnError,
    CertifyOrchestrator, ErrorHandler, GraphqlSourceClient, ScorecardApiRunner,
    ScorecardCertifier, SourceQuery,
};
use chainwarden_core::{ChainwardenConfig, RegistryBuilder};

use crate::cli::ScorecardArgs;
use crate::error::CliError;
use crate::ingest::{HttpIngestSink, IngestEmitter, IngestOptions, http_client, load_headers};
use crate::shutdown::ShutdownController;

/// What a finished (or interrupted) run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u64,
    pub documents: u64,
    /// Repositories skipped after a failed scorecard lookup.
    pub skipped: u64,
    /// `true` when a termination signal ended the run.
    pub interrupted: bool,
}

/// Folds the subcommand flags into `config`. Absent flags change nothing.
pub fn apply_overrides(config: &mut ChainwardenConfig, args: &ScorecardArgs) {
    if let Some(addr) = &args.gql_addr {
        config.ingest.endpoint = addr.clone();
    }
    if let Some(path) = &args.header_file {
        config.ingest.header_file = path.display().to_string();
    }
    if let Some(v) = args.query_vulns {
        config.ingest.query_vulns = v;
    }
    if let Some(v) = args.query_licenses {
        config.ingest.query_licenses = v;
    }
    if let Some(v) = args.add_vuln_metadata {
        config.ingest.add_vuln_metadata = v;
    }
    if let Some(poll) = args.poll {
        config.certifier.poll = poll;
    }
    if let Some(interval) = &args.interval {
        config.certifier.interval = interval.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.certifier.batch_size = batch_size;
    }
    if let Some(latency) = &args.latency {
        config.certifier.latency = latency.clone();
    }
    if let Some(fail_fast) = args.fail_fast {
        config.certifier.fail_fast = fail_fast;
    }
}

/// Runs the scorecard certifier until it finishes or `termination` fires.
///
/// `config` must already be validated. Recorded errors surface as
/// [`CliError::Degraded`], a run stopped by the error policy as
/// [`CliError::Aborted`].
pub async fn execute<S>(config: &ChainwardenConfig, termination: S) -> Result<RunSummary, CliError>
where
    S: Future<Output = ()>,
{
    let run_config = CertifierRunConfig::builder_from(&config.certifier)?.build()?;

    let headers = if config.ingest.header_file.is_empty() {
        HeaderMap::new()
    } else {
        load_headers(Path::new(&config.ingest.header_file))
            .await
            .map_err(|e| CliError::Config(e.to_string()))?
    };
    let client = http_client(headers)?;

    let graph = GraphqlSourceClient::new(client.clone(), config.ingest.endpoint.clone());
    let query = SourceQuery::new(Arc::new(graph), &run_config);

    let runner = Arc::new(
        ScorecardApiRunner::with_default_client(config.certifier.scorecard_api_url.clone())
            .map_err(|e| CliError::Setup(e.to_string()))?,
    );
    let skipped = Arc::new(AtomicU64::new(0));
    let registry = certifier_registry(runner, run_config.added_latency(), skipped.clone())?;

    let sink = HttpIngestSink::new(
        client,
        &config.ingest.endpoint,
        IngestOptions::from_config(&config.ingest),
    );
    let emitter = Arc::new(IngestEmitter::new(Arc::new(sink)));

    let handler: Arc<dyn ErrorHandler> = if config.certifier.fail_fast {
        Arc::new(AbortOnError)
    } else {
        Arc::new(ContinueOnError::new())
    };

    let orchestrator = CertifyOrchestrator::builder()
        .query(Arc::new(query))
        .registry(Arc::new(registry))
        .emitter(emitter.clone())
        .error_handler(handler)
        .config(run_config)
        .build()?;

    info!(
        endpoint = %config.ingest.endpoint,
        poll = config.certifier.poll,
        batch_size = config.certifier.batch_size,
        fail_fast = config.certifier.fail_fast,
        "starting scorecard certifier"
    );

    let controller = ShutdownController::new();
    let outcome = controller
        .run(|token| orchestrator.run(token), termination)
        .await?;

    let report = outcome.output?;
    let skipped = skipped.load(Ordering::Relaxed);
    if report.had_errors() {
        warn!(
            errors = report.errors,
            documents = emitter.emitted(),
            skipped,
            "completed ingestion with errors"
        );
        return Err(CliError::Degraded {
            errors: report.errors,
        });
    }

    info!(
        documents = emitter.emitted(),
        passes = report.passes,
        skipped,
        "completed ingesting {} documents",
        emitter.emitted()
    );
    Ok(RunSummary {
        passes: report.passes,
        documents: report.documents,
        skipped,
        interrupted: outcome.signal,
    })
}

fn certifier_registry(
    runner: Arc<ScorecardApiRunner>,
    added_latency: Option<std::time::Duration>,
    skipped: Arc<AtomicU64>,
) -> Result<CertifierRegistry, CliError> {
    let mut builder = RegistryBuilder::<dyn Certifier>::new();
    builder
        .register(ScorecardCertifier::NAME, move || {
            Arc::new(
                ScorecardCertifier::new(runner.clone(), added_latency)
                    .with_skip_counter(skipped.clone()),
            ) as Arc<dyn Certifier>
        })
        .map_err(|e| CliError::Setup(e.to_string()))?;
    Ok(builder.build())
}
