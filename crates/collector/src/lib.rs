//! chainwarden collectors
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`CollectorError`)
//! - [`runner`]: `Collector` trait and the fan-out runner (`collect`, `collect_documents`)
//! - [`oci`]: OCI artifact collectors over a pluggable `RegistryClient`
//!
//! # Architecture
//!
//! ```text
//! CollectorRegistry --instantiate_all--> [Collector; N]
//!                                            |  (one JoinSet worker each,
//!                                            |   shared child CancellationToken)
//!                                            v
//!                                 mpsc::Sender<Document> --> single consumer
//! ```

pub mod error;
pub mod oci;
pub mod runner;

// --- Public API Re-exports ---

pub use error::CollectorError;

pub use runner::{Collector, CollectorRegistry, collect, collect_documents};

pub use oci::{
    CosignTagCollector, Image, ImageReference, Layer, ReferrersCollector, RegistryClient,
};
