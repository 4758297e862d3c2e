//! Document model -- the normalized unit of work
//!
//! A [`Document`] is produced by a collector or certifier, moved through a
//! stream and consumed exactly once by the emit sink. Its fields are set in
//! the constructor and are read-only afterwards.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Content kind of a document payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Kind could not be determined
    #[default]
    Unknown,
    /// OpenSSF scorecard result
    Scorecard,
    /// SPDX SBOM
    Spdx,
    /// CycloneDX SBOM
    CycloneDx,
    /// in-toto statement (ITE-6)
    InToto,
    /// DSSE envelope
    Dsse,
    /// OpenVEX statement
    OpenVex,
    /// CSAF advisory
    Csaf,
    /// Syft native SBOM
    Syft,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Scorecard => "scorecard",
            Self::Spdx => "spdx",
            Self::CycloneDx => "cyclonedx",
            Self::InToto => "in-toto",
            Self::Dsse => "dsse",
            Self::OpenVex => "openvex",
            Self::Csaf => "csaf",
            Self::Syft => "syft",
        };
        f.write_str(name)
    }
}

/// Encoding of a document payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    /// Encoding could not be determined
    #[default]
    Unknown,
    /// A single JSON value
    Json,
    /// Newline-delimited JSON
    JsonLines,
    /// XML
    Xml,
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Json => "json",
            Self::JsonLines => "json-lines",
            Self::Xml => "xml",
        };
        f.write_str(name)
    }
}

/// Where a document came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInformation {
    /// Name of the producing collector or certifier (e.g. `"OCICollector"`)
    pub collector: String,
    /// Target the document was produced for (image reference, repository URI)
    pub source: String,
}

impl SourceInformation {
    /// Creates source information.
    pub fn new(collector: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            collector: collector.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for SourceInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collector, self.source)
    }
}

/// A collected or certified artifact, ready for ingestion
///
/// Deliberately not `Clone`: a document has exactly one consumer.
#[derive(Debug, PartialEq, Eq)]
pub struct Document {
    payload: Bytes,
    document_type: DocumentType,
    format: FormatType,
    source_information: SourceInformation,
}

impl Document {
    /// Creates a document with explicit type and format tags.
    pub fn new(
        payload: impl Into<Bytes>,
        document_type: DocumentType,
        format: FormatType,
        source_information: SourceInformation,
    ) -> Self {
        Self {
            payload: payload.into(),
            document_type,
            format,
            source_information,
        }
    }

    /// Creates a document whose type and format are unknown.
    pub fn untyped(payload: impl Into<Bytes>, source_information: SourceInformation) -> Self {
        Self::new(
            payload,
            DocumentType::Unknown,
            FormatType::Unknown,
            source_information,
        )
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Content kind.
    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    /// Payload encoding.
    pub fn format(&self) -> FormatType {
        self.format
    }

    /// Provenance of the document.
    pub fn source_information(&self) -> &SourceInformation {
        &self.source_information
    }

    /// Consumes the document, returning its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
