//! OCI artifact collectors
//!
//! Supply-chain artifacts (SBOMs, attestations, signatures) live next to an
//! image in its registry. Two discovery strategies are provided:
//!
//! - [`ReferrersCollector`]: artifacts whose manifest names the image as its subject
//! - [`CosignTagCollector`]: artifacts pushed under cosign's `sha256-<hex>.{att,sbom}` tags
//!
//! Both talk to the registry through the [`RegistryClient`] seam. Every
//! layer of a discovered artifact becomes one [`Document`].

mod cosign;
mod reference;
mod referrers;

pub use cosign::CosignTagCollector;
pub use reference::{DEFAULT_REGISTRY, DEFAULT_TAG, ImageReference};
pub use referrers::ReferrersCollector;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use chainwarden_core::metrics as m;
use chainwarden_core::{BoxFuture, Document, DocumentType, FormatType, SourceInformation};

use crate::error::CollectorError;

/// Collector name recorded in every OCI document's source information.
pub const OCI_COLLECTOR: &str = "OCICollector";

/// Artifact type used when neither manifest nor layer names one.
const UNKNOWN_ARTIFACT_TYPE: &str = "unknown";

/// One layer of a fetched artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    /// Layer media type; empty when the manifest leaves it out
    pub media_type: String,
    /// Layer content
    pub blob: Bytes,
}

/// A fetched image or artifact manifest with its layers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    /// `config.mediaType` of the manifest; empty when absent
    pub config_media_type: String,
    /// Layers in manifest order
    pub layers: Vec<Layer>,
}

/// Wire client for an OCI registry
///
/// Authentication and transport are the implementation's business.
pub trait RegistryClient: Send + Sync {
    /// Resolves `reference` to its manifest digest (`sha256:<hex>`).
    fn resolve_digest<'a>(
        &'a self,
        reference: &'a ImageReference,
    ) -> BoxFuture<'a, Result<String, CollectorError>>;

    /// Fetches the manifest and layers at `reference`; `None` when it does not exist.
    fn fetch_image<'a>(
        &'a self,
        reference: &'a ImageReference,
    ) -> BoxFuture<'a, Result<Option<Image>, CollectorError>>;

    /// Lists artifacts whose subject is `subject` (a digest reference).
    fn referrers<'a>(
        &'a self,
        subject: &'a ImageReference,
    ) -> BoxFuture<'a, Result<Vec<ImageReference>, CollectorError>>;
}

/// Maps an artifact media type to the document type and format it carries.
///
/// Unknown media types map to `(Unknown, Unknown)`.
pub fn artifact_kind(media_type: &str) -> (DocumentType, FormatType) {
    // parameters such as `;version=1.0` do not change the kind
    let base = media_type.split(';').next().unwrap_or_default().trim();
    match base {
        "application/spdx+json" | "text/spdx+json" => (DocumentType::Spdx, FormatType::Json),
        "text/spdx" | "text/spdx+xml" => (DocumentType::Spdx, FormatType::Xml),
        "application/vnd.cyclonedx+json" => (DocumentType::CycloneDx, FormatType::Json),
        "application/vnd.cyclonedx+xml" | "application/vnd.cyclonedx" => {
            (DocumentType::CycloneDx, FormatType::Xml)
        }
        "application/vnd.in-toto+json" => (DocumentType::InToto, FormatType::Json),
        "application/vnd.dsse.envelope.v1+json" | "application/vnd.dev.cosign.attestation.v1+json" => {
            (DocumentType::Dsse, FormatType::Json)
        }
        "application/vnd.openvex+json" | "application/openvex+json" => {
            (DocumentType::OpenVex, FormatType::Json)
        }
        "application/csaf+json" | "application/vnd.csaf+json" => {
            (DocumentType::Csaf, FormatType::Json)
        }
        "application/vnd.syft+json" => (DocumentType::Syft, FormatType::Json),
        _ => (DocumentType::Unknown, FormatType::Unknown),
    }
}

/// Pushes every layer of `image` as a document attributed to `reference`.
///
/// The manifest's config media type is the default artifact type; a non-empty
/// layer media type overrides it. Layers are sent in manifest order.
pub(crate) async fn push_layers(
    collector: &str,
    reference: &ImageReference,
    image: Image,
    docs: &mpsc::Sender<Document>,
) -> Result<usize, CollectorError> {
    let default_type = if image.config_media_type.is_empty() {
        UNKNOWN_ARTIFACT_TYPE
    } else {
        image.config_media_type.as_str()
    };

    let source = reference.to_string();
    let mut pushed = 0;
    for layer in image.layers {
        let artifact_type = if layer.media_type.is_empty() {
            default_type
        } else {
            layer.media_type.as_str()
        };
        let (document_type, format) = artifact_kind(artifact_type);
        debug!(
            collector,
            source = %source,
            artifact_type,
            %document_type,
            "pushing artifact layer"
        );

        let doc = Document::new(
            layer.blob,
            document_type,
            format,
            SourceInformation::new(OCI_COLLECTOR, source.clone()),
        );
        docs.send(doc)
            .await
            .map_err(|e| CollectorError::Channel(e.to_string()))?;
        pushed += 1;
    }

    metrics::counter!(m::COLLECTOR_DOCUMENTS_TOTAL, m::LABEL_COLLECTOR => collector.to_owned())
        .increment(pushed as u64);
    Ok(pushed)
}

/// Returns `Err(Cancelled)` once `cancel` has fired.
pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), CollectorError> {
    if cancel.is_cancelled() {
        Err(CollectorError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory registry keyed by the reference's display form.
    #[derive(Default)]
    pub(crate) struct MemoryRegistry {
        pub digests: HashMap<String, String>,
        pub images: HashMap<String, Image>,
        pub referrers: HashMap<String, Vec<ImageReference>>,
        pub fetched: Mutex<Vec<String>>,
    }

    impl RegistryClient for MemoryRegistry {
        fn resolve_digest<'a>(
            &'a self,
            reference: &'a ImageReference,
        ) -> BoxFuture<'a, Result<String, CollectorError>> {
            Box::pin(async move {
                self.digests
                    .get(&reference.to_string())
                    .cloned()
                    .ok_or_else(|| CollectorError::Registry {
                        reference: reference.to_string(),
                        reason: "manifest unknown".to_owned(),
                    })
            })
        }

        fn fetch_image<'a>(
            &'a self,
            reference: &'a ImageReference,
        ) -> BoxFuture<'a, Result<Option<Image>, CollectorError>> {
            Box::pin(async move {
                let key = reference.to_string();
                if let Ok(mut fetched) = self.fetched.lock() {
                    fetched.push(key.clone());
                }
                Ok(self.images.get(&key).cloned())
            })
        }

        fn referrers<'a>(
            &'a self,
            subject: &'a ImageReference,
        ) -> BoxFuture<'a, Result<Vec<ImageReference>, CollectorError>> {
            Box::pin(async move {
                Ok(self
                    .referrers
                    .get(&subject.to_string())
                    .cloned()
                    .unwrap_or_default())
            })
        }
    }

    pub(crate) fn layer(media_type: &str, blob: &'static str) -> Layer {
        Layer {
            media_type: media_type.to_owned(),
            blob: Bytes::from_static(blob.as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::layer;
    use super::*;

    #[test]
    fn well_known_types_map_to_document_kinds() {
        assert_eq!(
            artifact_kind("application/spdx+json"),
            (DocumentType::Spdx, FormatType::Json)
        );
        assert_eq!(
            artifact_kind("application/vnd.cyclonedx+xml"),
            (DocumentType::CycloneDx, FormatType::Xml)
        );
        assert_eq!(
            artifact_kind("application/vnd.in-toto+json"),
            (DocumentType::InToto, FormatType::Json)
        );
        assert_eq!(
            artifact_kind("application/vnd.cyclonedx+json; version=1.5"),
            (DocumentType::CycloneDx, FormatType::Json)
        );
    }

    #[test]
    fn unknown_type_maps_to_unknown() {
        assert_eq!(
            artifact_kind("application/vnd.oci.image.layer.v1.tar+gzip"),
            (DocumentType::Unknown, FormatType::Unknown)
        );
        assert_eq!(
            artifact_kind(UNKNOWN_ARTIFACT_TYPE),
            (DocumentType::Unknown, FormatType::Unknown)
        );
    }

    #[tokio::test]
    async fn layer_media_type_overrides_config_media_type() {
        // Given: a manifest typed as SPDX with one untyped and one CycloneDX layer
        let reference = ImageReference::parse("ghcr.io/acme/app:sha256-abc.sbom").unwrap();
        let image = Image {
            config_media_type: "application/spdx+json".to_owned(),
            layers: vec![
                layer("", "{\"spdxVersion\":\"SPDX-2.3\"}"),
                layer("application/vnd.cyclonedx+json", "{\"bomFormat\":\"CycloneDX\"}"),
            ],
        };
        let (tx, mut rx) = mpsc::channel(4);

        // When
        let pushed = push_layers("test", &reference, image, &tx).await.unwrap();
        drop(tx);

        // Then: layer order kept, override applied, provenance set
        assert_eq!(pushed, 2);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.document_type(), DocumentType::Spdx);
        assert_eq!(first.source_information().collector, OCI_COLLECTOR);
        assert_eq!(
            first.source_information().source,
            "ghcr.io/acme/app:sha256-abc.sbom"
        );
        let second = rx.recv().await.unwrap();
        assert_eq!(second.document_type(), DocumentType::CycloneDx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn untyped_manifest_and_layers_become_unknown_documents() {
        let reference = ImageReference::parse("ghcr.io/acme/app:1.0").unwrap();
        let image = Image {
            config_media_type: String::new(),
            layers: vec![layer("", "opaque")],
        };
        let (tx, mut rx) = mpsc::channel(1);
        push_layers("test", &reference, image, &tx).await.unwrap();

        let doc = rx.recv().await.unwrap();
        assert_eq!(doc.document_type(), DocumentType::Unknown);
        assert_eq!(doc.format(), FormatType::Unknown);
        assert_eq!(&doc.payload()[..], b"opaque");
    }

    #[tokio::test]
    async fn closed_stream_is_a_channel_error() {
        let reference = ImageReference::parse("ghcr.io/acme/app:1.0").unwrap();
        let image = Image {
            config_media_type: String::new(),
            layers: vec![layer("", "x")],
        };
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = push_layers("test", &reference, image, &tx).await.unwrap_err();
        assert!(matches!(err, CollectorError::Channel(_)));
    }
}
