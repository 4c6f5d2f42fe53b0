//! Snapshot storage abstractions.
//!
//! The ingestion pipeline only ever talks to storage through the
//! [`SnapshotStore`] trait so batch orchestration stays independent of the
//! backing service. The production implementation lives in [`azure`].

pub mod azure;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use strum::{AsRefStr, EnumIter, EnumString};
use thiserror::Error;

pub use azure::AzureSnapshotStore;

/// Object extension recognized as an archived snapshot.
pub const SNAPSHOT_EXT: &str = ".mhtml";

/// Enumeration of snapshot collections, each backed by its own container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Source {
    Qast,
    Stock,
}

impl Source {
    pub fn slug(self) -> &'static str {
        match self {
            Source::Qast => "qast",
            Source::Stock => "stock",
        }
    }

    /// Blob container holding this collection's snapshots.
    pub fn container(self) -> &'static str {
        match self {
            Source::Qast => "qast",
            Source::Stock => "stock",
        }
    }
}

/// Identifier of one stored snapshot, immutable once listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub source: Source,
    /// Object name within the collection's container.
    pub name: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Errors emitted by snapshot storage operations.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("object `{0}` has no readable body")]
    NotAvailable(String),
    #[error("storage backend error during `{stage}`: {message}")]
    Backend {
        stage: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(stage: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Backend {
            stage,
            message: error.to_string(),
        }
    }
}

/// Trait abstracting over snapshot storage backends.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// List every object stored in the `source` collection's container.
    async fn list(&self, source: Source) -> Result<Vec<SnapshotRef>, StoreError>;

    /// Download the full payload of one snapshot.
    async fn fetch(&self, snapshot: &SnapshotRef) -> Result<Bytes, StoreError>;

    /// Cheap connectivity probe against the backing store.
    async fn check_access(&self) -> Result<(), StoreError>;

    /// Public URL of the stored object, derived deterministically from the
    /// snapshot identity. Never performs IO.
    fn public_url(&self, snapshot: &SnapshotRef) -> String;
}
