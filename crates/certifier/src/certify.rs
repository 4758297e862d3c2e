//! Certify orchestrator -- drives query, certifiers and emit sink
//!
//! # Pass structure
//!
//! ```text
//! ComponentQuery task --mpsc<SourceComponent>--> driver
//!                                                  | one component at a time
//!                                                  v
//!                              [Certifier; N] workers (JoinSet)
//!                                                  |
//!                                    mpsc<Document> (driver holds the last sender)
//!                                                  v
//!                                      driver --> DocumentEmitter::emit
//! ```
//!
//! The driver is the only consumer of the document stream and drops its own
//! sender once the query is exhausted and every worker has been joined, so
//! the stream closes exactly when no producer is left.
//!
//! # States
//!
//! `Idle -> Running -> Idle` on completion or abort,
//! `Idle -> Running -> Terminating` when the governing token is cancelled.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chainwarden_core::metrics as m;
use chainwarden_core::{Document, DocumentEmitter};

use crate::config::{CertifierRunConfig, CertifierRunConfigBuilder};
use crate::error::CertifierError;
use crate::policy::{ContinueOnError, ErrorHandler};
use crate::source::SourceComponent;
use crate::{CertifierRegistry, ComponentQuery};

/// Default capacity of the component and document streams.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Orchestrator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Not running
    Idle,
    /// A pass is in progress or the next one is scheduled
    Running,
    /// Cancellation observed; winding down
    Terminating,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertifyReport {
    /// Passes started
    pub passes: u64,
    /// Documents accepted by the emit sink
    pub documents: u64,
    /// Errors the handler chose to continue past
    pub errors: u64,
    /// Whether the run ended because of cancellation
    pub cancelled: bool,
}

impl CertifyReport {
    pub fn had_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Per-pass task handles, wound down together on abort.
struct Pass {
    token: CancellationToken,
    producer: Option<JoinHandle<Result<(), CertifierError>>>,
    workers: JoinSet<(String, Result<(), CertifierError>)>,
}

impl Pass {
    /// Cancels the pass and joins every task. A worker in the middle of an
    /// external call finishes that call before it observes the token.
    ///
    /// The component and document receivers are already dropped, so a task
    /// still sending sees a closed stream.
    async fn tear_down(&mut self) {
        self.token.cancel();
        while let Some(joined) = self.workers.join_next().await {
            if let Ok((name, Err(err))) = joined {
                debug!(certifier = %name, error = %err, "certifier stopped during abort");
            }
        }
        if let Some(producer) = self.producer.take() {
            let _ = producer.await;
        }
    }
}

/// Runs certification passes until done, aborted or cancelled
pub struct CertifyOrchestrator {
    query: Arc<dyn ComponentQuery>,
    registry: Arc<CertifierRegistry>,
    emitter: Arc<dyn DocumentEmitter>,
    handler: Arc<dyn ErrorHandler>,
    config: CertifierRunConfig,
    channel_capacity: usize,
    state: watch::Sender<OrchestratorState>,
}

impl CertifyOrchestrator {
    pub fn builder() -> CertifyOrchestratorBuilder {
        CertifyOrchestratorBuilder::new()
    }

    /// Current state.
    pub fn state(&self) -> OrchestratorState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    /// Runs until the last pass finishes, the handler aborts, or `cancel` fires.
    ///
    /// Without polling exactly one pass runs. With polling, passes start on
    /// a fixed `interval` (the first immediately) and never overlap.
    pub async fn run(self, cancel: CancellationToken) -> Result<CertifyReport, CertifierError> {
        self.state.send_replace(OrchestratorState::Running);
        info!(
            certifiers = ?self.registry.names(),
            poll = self.config.poll(),
            interval = ?self.config.interval(),
            batch_size = self.config.batch_size(),
            "certify orchestrator started"
        );
        if self.registry.is_empty() {
            warn!("no certifiers registered");
        }

        let mut report = CertifyReport::default();
        let mut ticker = self.config.poll().then(|| {
            let mut ticker = tokio::time::interval(self.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            if let Some(ticker) = ticker.as_mut() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = ticker.tick() => {}
                }
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            report.passes += 1;
            metrics::counter!(m::CERTIFIER_PASSES_TOTAL).increment(1);
            debug!(pass = report.passes, "certify pass started");

            if let Err(err) = self.run_pass(&cancel, &mut report).await {
                self.state.send_replace(OrchestratorState::Idle);
                warn!(pass = report.passes, error = %err, "certify run aborted");
                return Err(err);
            }

            info!(
                pass = report.passes,
                documents = report.documents,
                errors = report.errors,
                "certify pass finished"
            );

            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if ticker.is_none() {
                break;
            }
        }

        let final_state = if report.cancelled {
            OrchestratorState::Terminating
        } else {
            OrchestratorState::Idle
        };
        self.state.send_replace(final_state);
        info!(?report, "certify orchestrator stopped");
        Ok(report)
    }

    async fn run_pass(
        &self,
        cancel: &CancellationToken,
        report: &mut CertifyReport,
    ) -> Result<(), CertifierError> {
        let token = cancel.child_token();
        let (component_tx, component_rx) = mpsc::channel(self.channel_capacity);

        let query = Arc::clone(&self.query);
        let query_token = token.clone();
        let producer =
            tokio::spawn(async move { query.get_components(query_token, component_tx).await });

        let mut pass = Pass {
            token,
            producer: Some(producer),
            workers: JoinSet::new(),
        };

        let result = self.drive(&mut pass, component_rx, report).await;
        if result.is_err() {
            pass.tear_down().await;
        }
        result
    }

    async fn drive(
        &self,
        pass: &mut Pass,
        mut components: mpsc::Receiver<SourceComponent>,
        report: &mut CertifyReport,
    ) -> Result<(), CertifierError> {
        let certifiers = self.registry.instantiate_all();
        let (doc_tx, mut doc_rx) = mpsc::channel::<Document>(self.channel_capacity);
        let mut doc_tx = Some(doc_tx);
        let mut components_open = true;
        let mut emitting = true;

        loop {
            if !components_open && pass.workers.is_empty() {
                // last sender; the stream closes once buffered documents drain
                doc_tx = None;
            }

            tokio::select! {
                biased;

                maybe_doc = doc_rx.recv() => {
                    let Some(doc) = maybe_doc else { break };
                    if !emitting {
                        continue;
                    }
                    // an in-flight emit is never raced against cancellation
                    match self.emitter.emit(doc).await {
                        Ok(()) => {
                            report.documents += 1;
                            metrics::counter!(m::CERTIFIER_DOCUMENTS_EMITTED_TOTAL).increment(1);
                        }
                        Err(e) => {
                            emitting = false;
                            pass.token.cancel();
                            self.route(report, "emit", CertifierError::Emit(e))?;
                        }
                    }
                }

                Some(joined) = pass.workers.join_next(), if !pass.workers.is_empty() => {
                    match joined {
                        Ok((name, Ok(()))) => debug!(certifier = %name, "certifier finished"),
                        Ok((_, Err(CertifierError::Channel(_)))) if pass.token.is_cancelled() => {}
                        Ok((name, Err(err))) => self.route(report, &name, err)?,
                        Err(join_err) => {
                            self.route(report, "task", CertifierError::Task(join_err.to_string()))?;
                        }
                    }
                }

                _ = pass.token.cancelled(), if components_open => {
                    // stop taking components; a query still sending sees a closed stream
                    components_open = false;
                    components.close();
                }

                maybe_component = components.recv(), if components_open && pass.workers.is_empty() => {
                    match maybe_component {
                        Some(component) => {
                            if let Some(tx) = doc_tx.as_ref() {
                                spawn_certifiers(pass, &certifiers, component, tx);
                            }
                        }
                        None => {
                            components_open = false;
                            self.finish_query(pass, report).await?;
                        }
                    }
                }
            }
        }

        self.finish_query(pass, report).await
    }

    /// Joins the query task (once) and routes its failure.
    async fn finish_query(
        &self,
        pass: &mut Pass,
        report: &mut CertifyReport,
    ) -> Result<(), CertifierError> {
        let Some(producer) = pass.producer.take() else {
            return Ok(());
        };
        match producer.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(CertifierError::Channel(_))) if pass.token.is_cancelled() => Ok(()),
            Ok(Err(err)) => self.route(report, "query", err),
            Err(join_err) => self.route(report, "query", CertifierError::Task(join_err.to_string())),
        }
    }

    /// Hands `err` to the error policy; `Err` means abort.
    fn route(
        &self,
        report: &mut CertifyReport,
        origin: &str,
        err: CertifierError,
    ) -> Result<(), CertifierError> {
        metrics::counter!(m::CERTIFIER_ERRORS_TOTAL, m::LABEL_CERTIFIER => origin.to_owned())
            .increment(1);
        if self.handler.handle(&err) {
            report.errors += 1;
            Ok(())
        } else {
            Err(err)
        }
    }
}

fn spawn_certifiers(
    pass: &mut Pass,
    certifiers: &[(String, Arc<dyn crate::Certifier>)],
    component: SourceComponent,
    docs: &mpsc::Sender<Document>,
) {
    debug!(source = %component, certifiers = certifiers.len(), "certifying component");
    let component = Arc::new(component);
    for (name, certifier) in certifiers {
        let name = name.clone();
        let certifier = Arc::clone(certifier);
        let component = Arc::clone(&component);
        let token = pass.token.clone();
        let tx = docs.clone();
        pass.workers.spawn(async move {
            let result = certifier.certify_component(token, &component, tx).await;
            (name, result)
        });
    }
}

/// Builder for [`CertifyOrchestrator`]
pub struct CertifyOrchestratorBuilder {
    query: Option<Arc<dyn ComponentQuery>>,
    registry: Option<Arc<CertifierRegistry>>,
    emitter: Option<Arc<dyn DocumentEmitter>>,
    handler: Option<Arc<dyn ErrorHandler>>,
    config: Option<CertifierRunConfig>,
    channel_capacity: usize,
}

impl CertifyOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            query: None,
            registry: None,
            emitter: None,
            handler: None,
            config: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn query(mut self, query: Arc<dyn ComponentQuery>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn registry(mut self, registry: Arc<CertifierRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn emitter(mut self, emitter: Arc<dyn DocumentEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Error policy; defaults to [`ContinueOnError`].
    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn config(mut self, config: CertifierRunConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<CertifyOrchestrator, CertifierError> {
        let query = self.query.ok_or_else(|| CertifierError::Config {
            field: "query".to_owned(),
            reason: "a component query is required".to_owned(),
        })?;
        let emitter = self.emitter.ok_or_else(|| CertifierError::Config {
            field: "emitter".to_owned(),
            reason: "a document emitter is required".to_owned(),
        })?;
        if self.channel_capacity == 0 {
            return Err(CertifierError::Config {
                field: "channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        let config = match self.config {
            Some(config) => config,
            None => CertifierRunConfigBuilder::new().build()?,
        };
        let (state, _) = watch::channel(OrchestratorState::Idle);

        Ok(CertifyOrchestrator {
            query,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(CertifierRegistry::empty())),
            emitter,
            handler: self
                .handler
                .unwrap_or_else(|| Arc::new(ContinueOnError::new())),
            config,
            channel_capacity: self.channel_capacity,
            state,
        })
    }
}

impl Default for CertifyOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
