//! chainwarden core -- types shared by every chainwarden crate.
//!
//! # Module Structure
//!
//! - [`document`]: the normalized unit of work (`Document`, `DocumentType`, `FormatType`)
//! - [`error`]: top-level error type and domain errors
//! - [`registry`]: name -> factory registries for pluggable capabilities
//! - [`pipeline`]: async plumbing shared across crates (`BoxFuture`, `DocumentEmitter`)
//! - [`config`]: `chainwarden.toml` loading, env overrides and validation
//! - [`duration`]: duration strings such as `"5m"` or `"1h30m"`
//! - [`metrics`]: metric name constants

pub mod config;
pub mod document;
pub mod duration;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod registry;

// --- re-exports ---

pub use error::{
    CertifyError, ChainwardenError, CollectError, ConfigError, IngestError, RegistryError,
};

pub use config::ChainwardenConfig;

pub use document::{Document, DocumentType, FormatType, SourceInformation};

pub use pipeline::{BoxFuture, DocumentEmitter};

pub use registry::{Factory, Registry, RegistryBuilder};
