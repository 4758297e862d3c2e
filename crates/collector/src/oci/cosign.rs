//! Cosign tag-convention discovery
//!
//! cosign stores attestations and SBOMs for `image@sha256:<hex>` under the
//! tags `sha256-<hex>.att` and `sha256-<hex>.sbom` in the same repository.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use chainwarden_core::{BoxFuture, Document};

use super::{ImageReference, RegistryClient, check_cancelled, push_layers};
use crate::error::CollectorError;
use crate::runner::Collector;

const COSIGN_SUFFIXES: [&str; 2] = ["att", "sbom"];

/// Collects cosign attestations and SBOMs stored under derived tags.
pub struct CosignTagCollector {
    client: Arc<dyn RegistryClient>,
}

impl CosignTagCollector {
    /// Registration name.
    pub const NAME: &'static str = "oci-cosign";

    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self { client }
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        target: &str,
        docs: &mpsc::Sender<Document>,
    ) -> Result<(), CollectorError> {
        let reference = ImageReference::parse(target)?;

        check_cancelled(cancel)?;
        let digest = self.client.resolve_digest(&reference).await?;

        let mut total = 0;
        for suffix in COSIGN_SUFFIXES {
            check_cancelled(cancel)?;
            let tagged = reference.with_tag(cosign_tag(&digest, suffix));
            match self.client.fetch_image(&tagged).await? {
                Some(image) => total += push_layers(Self::NAME, &tagged, image, docs).await?,
                None => debug!(reference = %tagged, "no cosign artifact under tag"),
            }
        }

        info!(collector = Self::NAME, target = %reference, documents = total, "cosign artifacts collected");
        Ok(())
    }
}

/// `sha256:<hex>` + `att` -> `sha256-<hex>.att`
fn cosign_tag(digest: &str, suffix: &str) -> String {
    format!("{}.{suffix}", digest.replacen(':', "-", 1))
}

impl Collector for CosignTagCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collect<'a>(
        &'a self,
        cancel: CancellationToken,
        target: &'a str,
        docs: mpsc::Sender<Document>,
    ) -> BoxFuture<'a, Result<(), CollectorError>> {
        Box::pin(async move { self.run(&cancel, target, &docs).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::Image;
    use crate::oci::test_support::{MemoryRegistry, layer};
    use chainwarden_core::DocumentType;

    const HEX: &str = "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";

    #[test]
    fn tag_is_derived_from_digest() {
        assert_eq!(
            cosign_tag(&format!("sha256:{HEX}"), "att"),
            format!("sha256-{HEX}.att")
        );
    }

    #[tokio::test]
    async fn probes_both_tags_and_skips_missing() {
        // Given: only the .sbom tag exists
        let mut reg = MemoryRegistry::default();
        reg.digests
            .insert("docker.io/library/nginx:1.25".to_owned(), format!("sha256:{HEX}"));
        reg.images.insert(
            format!("docker.io/library/nginx:sha256-{HEX}.sbom"),
            Image {
                config_media_type: String::new(),
                layers: vec![layer("text/spdx+json", "{}")],
            },
        );
        let reg = Arc::new(reg);
        let collector = CosignTagCollector::new(reg.clone());
        let (tx, mut rx) = mpsc::channel(4);

        // When
        collector
            .collect(CancellationToken::new(), "nginx:1.25", tx)
            .await
            .unwrap();

        // Then: both tags probed, one document produced
        let fetched = reg.fetched.lock().unwrap().clone();
        assert_eq!(
            fetched,
            vec![
                format!("docker.io/library/nginx:sha256-{HEX}.att"),
                format!("docker.io/library/nginx:sha256-{HEX}.sbom"),
            ]
        );
        let doc = rx.recv().await.unwrap();
        assert_eq!(doc.document_type(), DocumentType::Spdx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn invalid_target_is_rejected() {
        let collector = CosignTagCollector::new(Arc::new(MemoryRegistry::default()));
        let (tx, _rx) = mpsc::channel(1);
        let err = collector
            .collect(CancellationToken::new(), "Not A Reference", tx)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::InvalidReference { .. }));
    }
}
