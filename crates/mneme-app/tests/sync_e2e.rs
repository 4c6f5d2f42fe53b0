//! End-to-end sync over an in-memory store and a wiremock indexing endpoint.

mod support;

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mneme_app::ingestion::{self, IndexClient, Selector, SyncOptions};
use mneme_app::pipeline::fallback_source_url;
use mneme_app::store::{SnapshotStore, Source};

use support::{MemoryStore, mhtml_with_location, mhtml_without_location};

fn options() -> SyncOptions {
    SyncOptions::builder()
        .concurrency(2)
        .inter_item_delay(Duration::ZERO)
        .submit_timeout(Duration::from_secs(5))
        .max_retries(1)
        .build()
}

#[tokio::test]
async fn sync_submits_snapshots_and_uses_fallback_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store: Arc<dyn SnapshotStore> = Arc::new(
        MemoryStore::new()
            .with_object(
                Source::Qast,
                "a.mhtml",
                mhtml_with_location("https://example.com/articles/42"),
            )
            .with_object(Source::Qast, "b.mhtml", mhtml_without_location()),
    );
    let client = Arc::new(IndexClient::new(&format!("{}/index", server.uri()), 10).unwrap());

    let report = ingestion::run(Selector::One(Source::Qast), store, client, &options())
        .await
        .unwrap();

    assert_eq!(report.reports.len(), 1);
    let qast = &report.reports[0];
    assert_eq!((qast.total, qast.success, qast.failed), (2, 2, 0));
    assert_eq!(qast.total, qast.success + qast.failed);
    assert_eq!(qast.total, qast.results.len());
    assert!(qast.results.iter().all(|result| result.status == Some(200)));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let bodies: Vec<String> = requests
        .iter()
        .map(|request| String::from_utf8_lossy(&request.body).to_string())
        .collect();

    let body_a = bodies
        .iter()
        .find(|body| body.contains("filename=\"a.mhtml\""))
        .expect("a.mhtml was submitted");
    assert!(body_a.contains("name=\"index_type\""));
    assert!(body_a.contains("qast"));
    assert!(body_a.contains("name=\"blob_url\""));
    assert!(body_a.contains("https://snapshots.test/qast/a.mhtml"));
    assert!(body_a.contains("name=\"source_url\""));
    assert!(body_a.contains("https://example.com/articles/42"));

    // The snapshot without a location header falls back to the name-derived
    // URL.
    let body_b = bodies
        .iter()
        .find(|body| body.contains("filename=\"b.mhtml\""))
        .expect("b.mhtml was submitted");
    assert!(body_b.contains(&fallback_source_url(Source::Qast, "b.mhtml")));
}

#[tokio::test]
async fn failed_downloads_are_recorded_without_aborting_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // "ghost.mhtml" is listed but cannot be fetched.
    let store = MemoryStore::new().with_object(
        Source::Qast,
        "real.mhtml",
        mhtml_with_location("https://example.com/r"),
    );
    let listed_but_missing = support::sample_ref(Source::Qast, "ghost.mhtml");
    let store: Arc<dyn SnapshotStore> = Arc::new(PhantomListing {
        inner: store,
        extra: listed_but_missing,
    });
    let client = Arc::new(IndexClient::new(&server.uri(), 10).unwrap());

    let report = ingestion::run(Selector::One(Source::Qast), store, client, &options())
        .await
        .unwrap();

    let qast = &report.reports[0];
    assert_eq!((qast.total, qast.success, qast.failed), (2, 1, 1));
    let ghost = qast
        .results
        .iter()
        .find(|result| result.object == "ghost.mhtml")
        .unwrap();
    assert!(!ghost.success);
    assert!(ghost.error.as_deref().unwrap().contains("download failed"));
}

#[tokio::test]
async fn non_snapshot_objects_are_filtered_out_of_the_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store: Arc<dyn SnapshotStore> = Arc::new(
        MemoryStore::new()
            .with_object(
                Source::Stock,
                "acme.mhtml",
                mhtml_with_location("https://example.com/acme"),
            )
            .with_object(Source::Stock, "manifest.json", b"{}".as_slice()),
    );
    let client = Arc::new(IndexClient::new(&server.uri(), 10).unwrap());

    let report = ingestion::run(Selector::One(Source::Stock), store, client, &options())
        .await
        .unwrap();

    assert_eq!(report.reports[0].total, 1);
    assert_eq!(report.reports[0].results[0].object, "acme.mhtml");
}

/// Wraps a [`MemoryStore`] and appends one unfetchable reference to listings.
struct PhantomListing {
    inner: MemoryStore,
    extra: mneme_app::store::SnapshotRef,
}

#[async_trait::async_trait]
impl SnapshotStore for PhantomListing {
    async fn list(
        &self,
        source: Source,
    ) -> Result<Vec<mneme_app::store::SnapshotRef>, mneme_app::store::StoreError> {
        let mut listed = self.inner.list(source).await?;
        if source == self.extra.source {
            listed.push(self.extra.clone());
        }
        Ok(listed)
    }

    async fn fetch(
        &self,
        snapshot: &mneme_app::store::SnapshotRef,
    ) -> Result<bytes::Bytes, mneme_app::store::StoreError> {
        self.inner.fetch(snapshot).await
    }

    async fn check_access(&self) -> Result<(), mneme_app::store::StoreError> {
        self.inner.check_access().await
    }

    fn public_url(&self, snapshot: &mneme_app::store::SnapshotRef) -> String {
        self.inner.public_url(snapshot)
    }
}
