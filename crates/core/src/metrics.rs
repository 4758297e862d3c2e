//! Metric name constants
//!
//! Every metric emitted through the `metrics` facade is named here.
//! No exporter is installed by the library crates; the binary decides.
//!
//! # Naming convention
//!
//! - prefix: `chainwarden_`
//! - component: `collector_`, `certifier_`, `ingest_`
//! - suffix: `_total` (counter), `_seconds` (histogram), none (gauge)
//!
//! # Example
//!
//! ```ignore
//! metrics::counter!(chainwarden_core::metrics::CERTIFIER_DOCUMENTS_EMITTED_TOTAL).increment(1);
//! ```

// ─── label keys ────────────────────────────────────────────────────

/// Collector name label
pub const LABEL_COLLECTOR: &str = "collector";

/// Certifier name label
pub const LABEL_CERTIFIER: &str = "certifier";

/// Result label (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── collector ─────────────────────────────────────────────────────

/// Documents pushed onto the stream by collectors (counter, label: collector)
pub const COLLECTOR_DOCUMENTS_TOTAL: &str = "chainwarden_collector_documents_total";

/// Fan-out passes (counter, label: result)
pub const COLLECTOR_PASSES_TOTAL: &str = "chainwarden_collector_passes_total";

// ─── certifier ─────────────────────────────────────────────────────

/// Orchestrator passes started (counter)
pub const CERTIFIER_PASSES_TOTAL: &str = "chainwarden_certifier_passes_total";

/// Documents handed to the emit sink (counter)
pub const CERTIFIER_DOCUMENTS_EMITTED_TOTAL: &str = "chainwarden_certifier_documents_emitted_total";

/// Errors routed to the error policy (counter, label: certifier)
pub const CERTIFIER_ERRORS_TOTAL: &str = "chainwarden_certifier_errors_total";

/// Sources skipped because they could not be resolved (counter)
pub const CERTIFIER_SOURCES_SKIPPED_TOTAL: &str = "chainwarden_certifier_sources_skipped_total";

/// Components skipped by a certifier after a recoverable lookup failure (counter, label: certifier)
pub const CERTIFIER_ITEMS_SKIPPED_TOTAL: &str = "chainwarden_certifier_items_skipped_total";

/// Pages fetched from the component source (counter)
pub const CERTIFIER_PAGES_FETCHED_TOTAL: &str = "chainwarden_certifier_pages_fetched_total";

// ─── ingest ────────────────────────────────────────────────────────

/// Ingestion requests (counter, label: result)
pub const INGEST_REQUESTS_TOTAL: &str = "chainwarden_ingest_requests_total";

/// Ingestion request latency (histogram, seconds)
pub const INGEST_REQUEST_DURATION_SECONDS: &str = "chainwarden_ingest_request_duration_seconds";

// ─── descriptions ──────────────────────────────────────────────────

/// Registers HELP text for every metric.
///
/// Call once after a recorder is installed. Harmless without one.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        COLLECTOR_DOCUMENTS_TOTAL,
        "Documents pushed onto the stream by collectors"
    );
    describe_counter!(COLLECTOR_PASSES_TOTAL, "Collection fan-out passes");
    describe_counter!(CERTIFIER_PASSES_TOTAL, "Certifier orchestration passes started");
    describe_counter!(
        CERTIFIER_DOCUMENTS_EMITTED_TOTAL,
        "Documents handed to the ingestion sink"
    );
    describe_counter!(
        CERTIFIER_ERRORS_TOTAL,
        "Errors routed to the certifier error policy"
    );
    describe_counter!(
        CERTIFIER_SOURCES_SKIPPED_TOTAL,
        "Sources skipped because they could not be resolved into a component"
    );
    describe_counter!(
        CERTIFIER_ITEMS_SKIPPED_TOTAL,
        "Components a certifier skipped after a recoverable lookup failure"
    );
    describe_counter!(
        CERTIFIER_PAGES_FETCHED_TOTAL,
        "Pages fetched from the component source"
    );
    describe_counter!(INGEST_REQUESTS_TOTAL, "Ingestion requests sent to the sink");
    describe_histogram!(
        INGEST_REQUEST_DURATION_SECONDS,
        "Ingestion request latency in seconds"
    );
}
