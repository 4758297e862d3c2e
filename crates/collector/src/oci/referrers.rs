//! Referrers-API discovery

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use chainwarden_core::{BoxFuture, Document};

use super::{ImageReference, RegistryClient, check_cancelled, push_layers};
use crate::error::CollectorError;
use crate::runner::Collector;

/// Collects artifacts that name the target image as their subject.
pub struct ReferrersCollector {
    client: Arc<dyn RegistryClient>,
}

impl ReferrersCollector {
    /// Registration name.
    pub const NAME: &'static str = "oci-referrers";

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
        let subject = reference.with_digest(digest);

        check_cancelled(cancel)?;
        let artifacts = self.client.referrers(&subject).await?;
        debug!(subject = %subject, count = artifacts.len(), "referrers listed");

        let mut total = 0;
        for artifact in artifacts {
            check_cancelled(cancel)?;
            match self.client.fetch_image(&artifact).await? {
                Some(image) => total += push_layers(Self::NAME, &artifact, image, docs).await?,
                None => debug!(artifact = %artifact, "referrer vanished, skipping"),
            }
        }

        info!(collector = Self::NAME, subject = %subject, documents = total, "referrers collected");
        Ok(())
    }
}

impl Collector for ReferrersCollector {
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
