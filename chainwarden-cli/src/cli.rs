//! CLI argument parsing using clap derive API
//!
//! Purely declarative. Every run flag is optional so that an absent flag
//! leaves the value from `chainwarden.toml` (or its env override) in place.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// chainwarden -- collects and certifies software supply-chain documents.
///
/// Use `chainwarden <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "chainwarden", version, about, long_about = None)]
pub struct Cli {
    /// Path to the chainwarden.toml configuration file.
    #[arg(short, long, default_value = "chainwarden.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every known source repository and ingest the results.
    Scorecard(ScorecardArgs),
}

// ---- scorecard ----

/// Runs the scorecard certifier over the sources known to the graph.
#[derive(Args, Debug, Default)]
pub struct ScorecardArgs {
    /// GraphQL endpoint of the knowledge graph.
    #[arg(long = "gql-addr")]
    pub gql_addr: Option<String>,

    /// File of extra HTTP headers (`Name: value` per line).
    #[arg(long)]
    pub header_file: Option<PathBuf>,

    /// Keep re-running on the configured interval.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub poll: Option<bool>,

    /// Time between polling pass starts, e.g. `5m` or `1h30m`.
    #[arg(short, long)]
    pub interval: Option<String>,

    /// Sources requested per page.
    #[arg(long = "certifier-batch-size")]
    pub batch_size: Option<usize>,

    /// Delay added before each page and each scorecard lookup, e.g. `250ms`.
    #[arg(long = "certifier-latency")]
    pub latency: Option<String>,

    /// Ask the sink to query vulnerabilities on ingest.
    #[arg(long = "add-vuln-on-ingest", num_args = 0..=1, default_missing_value = "true")]
    pub query_vulns: Option<bool>,

    /// Ask the sink to query licenses on ingest.
    #[arg(long = "add-license-on-ingest", num_args = 0..=1, default_missing_value = "true")]
    pub query_licenses: Option<bool>,

    /// Ask the sink to attach vulnerability metadata.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub add_vuln_metadata: Option<bool>,

    /// Abort on the first error instead of logging and continuing.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub fail_fast: Option<bool>,
}
