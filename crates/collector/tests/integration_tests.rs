//! Collector integration tests
//!
//! Both OCI collectors registered together and run through the fan-out runner
//! against an in-memory registry client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use chainwarden_collector::oci::OCI_COLLECTOR;
use chainwarden_collector::{
    Collector, CollectorError, CosignTagCollector, Image, ImageReference, Layer,
    ReferrersCollector, RegistryClient, collect, collect_documents,
};
use chainwarden_core::{BoxFuture, Document, DocumentType, RegistryBuilder};

const HEX: &str = "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";
const REFERRER_HEX: &str = "fcde2b2edba56bf408601fb721fe9b5c338d10ee429ea04fae5511b68fbf8fb9";
const TARGET: &str = "ghcr.io/acme/app:1.0";

struct FakeRegistry {
    images: HashMap<String, Image>,
}

impl FakeRegistry {
    fn populated() -> Self {
        let mut images = HashMap::new();
        images.insert(
            format!("ghcr.io/acme/app@sha256:{REFERRER_HEX}"),
            Image {
                config_media_type: "application/vnd.cyclonedx+json".to_owned(),
                layers: vec![layer("", "cyclonedx")],
            },
        );
        images.insert(
            format!("ghcr.io/acme/app:sha256-{HEX}.att"),
            Image {
                config_media_type: String::new(),
                layers: vec![
                    layer("application/vnd.dsse.envelope.v1+json", "dsse-1"),
                    layer("application/vnd.dsse.envelope.v1+json", "dsse-2"),
                ],
            },
        );
        Self { images }
    }
}

fn layer(media_type: &str, blob: &'static str) -> Layer {
    Layer {
        media_type: media_type.to_owned(),
        blob: Bytes::from_static(blob.as_bytes()),
    }
}

impl RegistryClient for FakeRegistry {
    fn resolve_digest<'a>(
        &'a self,
        reference: &'a ImageReference,
    ) -> BoxFuture<'a, Result<String, CollectorError>> {
        Box::pin(async move {
            if reference.to_string() == TARGET {
                Ok(format!("sha256:{HEX}"))
            } else {
                Err(CollectorError::Registry {
                    reference: reference.to_string(),
                    reason: "manifest unknown".to_owned(),
                })
            }
        })
    }

    fn fetch_image<'a>(
        &'a self,
        reference: &'a ImageReference,
    ) -> BoxFuture<'a, Result<Option<Image>, CollectorError>> {
        Box::pin(async move { Ok(self.images.get(&reference.to_string()).cloned()) })
    }

    fn referrers<'a>(
        &'a self,
        _subject: &'a ImageReference,
    ) -> BoxFuture<'a, Result<Vec<ImageReference>, CollectorError>> {
        Box::pin(async move {
            Ok(vec![ImageReference::parse(&format!(
                "ghcr.io/acme/app@sha256:{REFERRER_HEX}"
            ))?])
        })
    }
}

/// Blocks until cancelled, then records that it stopped.
struct Slow {
    stopped: Arc<AtomicBool>,
}

impl Collector for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    fn collect<'a>(
        &'a self,
        cancel: CancellationToken,
        _target: &'a str,
        _docs: mpsc::Sender<Document>,
    ) -> BoxFuture<'a, Result<(), CollectorError>> {
        Box::pin(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(3600)) => {}
            }
            self.stopped.store(true, Ordering::SeqCst);
            Err(CollectorError::Cancelled)
        })
    }
}

fn oci_registry(client: Arc<dyn RegistryClient>) -> RegistryBuilder<dyn Collector> {
    let mut builder = RegistryBuilder::<dyn Collector>::new();
    let referrers_client = Arc::clone(&client);
    builder
        .register(ReferrersCollector::NAME, move || {
            Arc::new(ReferrersCollector::new(Arc::clone(&referrers_client))) as Arc<dyn Collector>
        })
        .unwrap();
    builder
        .register(CosignTagCollector::NAME, move || {
            Arc::new(CosignTagCollector::new(Arc::clone(&client))) as Arc<dyn Collector>
        })
        .unwrap();
    builder
}

#[tokio::test]
async fn both_oci_collectors_contribute_documents() {
    let registry = oci_registry(Arc::new(FakeRegistry::populated())).build();

    let docs = collect_documents(&CancellationToken::new(), &registry, TARGET)
        .await
        .unwrap();

    assert_eq!(docs.len(), 3);
    assert!(
        docs.iter()
            .all(|d| d.source_information().collector == OCI_COLLECTOR)
    );
    let cyclonedx = docs
        .iter()
        .filter(|d| d.document_type() == DocumentType::CycloneDx)
        .count();
    let dsse = docs
        .iter()
        .filter(|d| d.document_type() == DocumentType::Dsse)
        .count();
    assert_eq!((cyclonedx, dsse), (1, 2));

    // cosign layers keep manifest order within their collector
    let dsse_payloads: Vec<_> = docs
        .iter()
        .filter(|d| d.document_type() == DocumentType::Dsse)
        .map(|d| d.payload().clone())
        .collect();
    assert_eq!(
        dsse_payloads,
        vec![Bytes::from_static(b"dsse-1"), Bytes::from_static(b"dsse-2")]
    );
}

#[tokio::test]
async fn registry_failure_cancels_siblings_and_is_returned() {
    // Given: the target cannot be resolved, and a slow sibling is registered
    let stopped = Arc::new(AtomicBool::new(false));
    let mut builder = oci_registry(Arc::new(FakeRegistry::populated()));
    let flag = Arc::clone(&stopped);
    builder
        .register("slow", move || {
            Arc::new(Slow {
                stopped: Arc::clone(&flag),
            }) as Arc<dyn Collector>
        })
        .unwrap();
    let registry = builder.build();

    // When
    let (tx, _rx) = mpsc::channel(8);
    let err = collect(
        &CancellationToken::new(),
        &registry,
        "ghcr.io/acme/unknown:2.0",
        &tx,
    )
    .await
    .unwrap_err();

    // Then: the first error comes back only after the slow sibling stopped
    assert!(matches!(err, CollectorError::Registry { .. }));
    assert!(stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn duplicate_collector_registration_is_rejected() {
    let mut builder = oci_registry(Arc::new(FakeRegistry::populated()));
    let client: Arc<dyn RegistryClient> = Arc::new(FakeRegistry::populated());
    let err = builder
        .register(ReferrersCollector::NAME, move || {
            Arc::new(ReferrersCollector::new(Arc::clone(&client))) as Arc<dyn Collector>
        })
        .unwrap_err();
    assert!(err.to_string().contains(ReferrersCollector::NAME));
    assert_eq!(builder.build().len(), 2);
}
