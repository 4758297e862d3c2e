//! chainwarden certifiers
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`CertifierError`)
//! - [`config`]: Run configuration (`CertifierRunConfig`, builder)
//! - [`source`]: Component discovery (`ComponentQuery`, paginating `SourceQuery`, GraphQL client)
//! - [`scorecard`]: Scorecard certifier and its runner seam
//! - [`policy`]: Error policies (`ErrorHandler`, `ContinueOnError`, `AbortOnError`)
//! - [`certify`]: Orchestrator (`CertifyOrchestrator`, builder, `CertifyReport`)
//!
//! # Architecture
//!
//! ```text
//!  SourceQuery (producer task)           CertifierRegistry
//!        |  mpsc<SourceComponent>               |
//!        v                                      v
//!   driver --- per component ---> [Certifier; N] (JoinSet)
//!        ^                                      |
//!        +---------- mpsc<Document> ------------+
//!        |
//!        v
//!   DocumentEmitter::emit  (single consumer)
//! ```

pub mod certify;
pub mod config;
pub mod error;
pub mod policy;
pub mod scorecard;
pub mod source;

mod throttle;

use chainwarden_core::{BoxFuture, Document, Registry};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// --- Public API Re-exports ---

pub use certify::{CertifyOrchestrator, CertifyOrchestratorBuilder, CertifyReport, OrchestratorState};
pub use config::{CertifierRunConfig, CertifierRunConfigBuilder};
pub use error::CertifierError;
pub use policy::{AbortOnError, ContinueOnError, ErrorHandler};
pub use scorecard::{ScorecardApiRunner, ScorecardCertifier, ScorecardRunner};
pub use source::{GraphqlSourceClient, SourceClient, SourceComponent, SourcePage, SourceQuery};

/// Produces documents about one component
///
/// A certifier sends its documents on `docs` and returns. When the consumer
/// is gone the send fails and the certifier stops with
/// [`CertifierError::Channel`]. Observing `cancel` is not an error: the
/// certifier returns `Ok(())` early.
pub trait Certifier: Send + Sync {
    /// Certifier type, used in logs and metrics.
    fn certifier_type(&self) -> &str;

    /// Certifies `component`.
    fn certify_component<'a>(
        &'a self,
        cancel: CancellationToken,
        component: &'a SourceComponent,
        docs: mpsc::Sender<Document>,
    ) -> BoxFuture<'a, Result<(), CertifierError>>;
}

/// Discovers the components to certify
///
/// Sends every component on `tx` and returns once exhausted, or early with
/// `Ok(())` when `cancel` fires.
pub trait ComponentQuery: Send + Sync {
    fn get_components<'a>(
        &'a self,
        cancel: CancellationToken,
        tx: mpsc::Sender<SourceComponent>,
    ) -> BoxFuture<'a, Result<(), CertifierError>>;
}

/// Registry of certifier factories.
pub type CertifierRegistry = Registry<dyn Certifier>;
