//! Shared doubles and fixtures for ingestion tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use mneme_app::store::{SnapshotRef, SnapshotStore, Source, StoreError};

/// In-memory snapshot store. Records the start instant of every `fetch` so
/// tests can assert on grouping and pacing.
#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<Source, Vec<(String, Bytes)>>,
    fetch_log: Mutex<Vec<(String, Instant)>>,
    failing_listing: Option<Source>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, source: Source, name: &str, payload: impl Into<Bytes>) -> Self {
        self.objects
            .entry(source)
            .or_default()
            .push((name.to_string(), payload.into()));
        self
    }

    pub fn with_failing_listing(mut self, source: Source) -> Self {
        self.failing_listing = Some(source);
        self
    }

    /// Fetch start instants in chronological order.
    pub fn fetch_starts(&self) -> Vec<(String, Instant)> {
        self.fetch_log.lock().expect("fetch log lock").clone()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn list(&self, source: Source) -> Result<Vec<SnapshotRef>, StoreError> {
        if self.failing_listing == Some(source) {
            return Err(StoreError::backend("list", "container unreachable"));
        }
        Ok(self
            .objects
            .get(&source)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(name, payload)| SnapshotRef {
                        source,
                        name: name.clone(),
                        size: payload.len() as u64,
                        last_modified: Utc::now(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch(&self, snapshot: &SnapshotRef) -> Result<Bytes, StoreError> {
        self.fetch_log
            .lock()
            .expect("fetch log lock")
            .push((snapshot.name.clone(), Instant::now()));
        self.objects
            .get(&snapshot.source)
            .and_then(|objects| {
                objects
                    .iter()
                    .find(|(name, _)| *name == snapshot.name)
                    .map(|(_, payload)| payload.clone())
            })
            .ok_or_else(|| StoreError::NotFound(snapshot.name.clone()))
    }

    async fn check_access(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn public_url(&self, snapshot: &SnapshotRef) -> String {
        format!(
            "https://snapshots.test/{}/{}",
            snapshot.source.container(),
            snapshot.name
        )
    }
}

/// A snapshot reference for client-level tests that bypass listing.
pub fn sample_ref(source: Source, name: &str) -> SnapshotRef {
    SnapshotRef {
        source,
        name: name.to_string(),
        size: 64,
        last_modified: Utc::now(),
    }
}

/// MHTML payload carrying a snapshot-level location header.
pub fn mhtml_with_location(url: &str) -> Vec<u8> {
    format!(
        "From: <Saved by Blink>\r\n\
Snapshot-Content-Location: {url}\r\n\
Subject: Archived page\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"----MultipartBoundary--q\"\r\n\
\r\n\
------MultipartBoundary--q\r\n\
Content-Type: text/html\r\n\
\r\n\
<html><body>archived</body></html>\r\n"
    )
    .into_bytes()
}

/// MHTML payload with no usable location header at all.
pub fn mhtml_without_location() -> Vec<u8> {
    b"MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"----MultipartBoundary--q\"\r\n\
\r\n\
------MultipartBoundary--q\r\n\
Content-Type: text/html\r\n\
\r\n\
<html><body>no header</body></html>\r\n"
        .to_vec()
}
