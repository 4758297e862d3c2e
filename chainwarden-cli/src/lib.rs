//! chainwarden command-line front end
//!
//! # Module Structure
//!
//! - [`cli`]: clap argument definitions
//! - [`commands`]: subcommand handlers and config resolution
//! - [`ingest`]: HTTP ingestion sink and the emitter over it
//! - [`shutdown`]: signal handling and the shutdown controller
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: `CliError` and exit codes

pub mod cli;
pub mod commands;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod shutdown;

pub use error::CliError;
