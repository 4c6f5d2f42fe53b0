//! Azure blob container implementation of [`SnapshotStore`].

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use object_store::ObjectStore;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path as ObjectPath;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::config::StorageConfig;

use super::{SnapshotRef, SnapshotStore, Source, StoreError};

/// Snapshot store backed by one Azure blob container per source.
pub struct AzureSnapshotStore {
    account: String,
    containers: HashMap<Source, Arc<dyn ObjectStore>>,
}

impl AzureSnapshotStore {
    pub fn from_config(cfg: &StorageConfig) -> Result<Self, StoreError> {
        let mut containers = HashMap::new();
        for source in Source::iter() {
            let store = MicrosoftAzureBuilder::new()
                .with_account(cfg.account.as_str())
                .with_access_key(cfg.access_key.as_str())
                .with_container_name(source.container())
                .build()
                .map_err(|err| StoreError::backend("client_build", err))?;
            containers.insert(source, Arc::new(store) as Arc<dyn ObjectStore>);
        }
        Ok(Self {
            account: cfg.account.clone(),
            containers,
        })
    }

    fn container(&self, source: Source) -> &Arc<dyn ObjectStore> {
        self.containers
            .get(&source)
            .expect("a container handle exists for every source")
    }
}

#[async_trait::async_trait]
impl SnapshotStore for AzureSnapshotStore {
    async fn list(&self, source: Source) -> Result<Vec<SnapshotRef>, StoreError> {
        let mut listing = self.container(source).list(None);
        let mut refs = Vec::new();
        while let Some(entry) = listing.next().await {
            let meta = entry.map_err(|err| StoreError::backend("list", err))?;
            refs.push(SnapshotRef {
                source,
                name: meta.location.to_string(),
                size: meta.size as u64,
                last_modified: meta.last_modified,
            });
        }
        debug!(
            source = source.slug(),
            objects = refs.len(),
            "listed container"
        );
        Ok(refs)
    }

    async fn fetch(&self, snapshot: &SnapshotRef) -> Result<Bytes, StoreError> {
        let path = ObjectPath::from(snapshot.name.as_str());
        let result = self
            .container(snapshot.source)
            .get(&path)
            .await
            .map_err(|err| match err {
                object_store::Error::NotFound { .. } => StoreError::NotFound(snapshot.name.clone()),
                other => StoreError::backend("download", other),
            })?;
        result
            .bytes()
            .await
            .map_err(|_| StoreError::NotAvailable(snapshot.name.clone()))
    }

    async fn check_access(&self) -> Result<(), StoreError> {
        // One authenticated round trip per container: pull the first listing
        // entry and discard it.
        for source in Source::iter() {
            let mut listing = self.container(source).list(None);
            if let Some(entry) = listing.next().await {
                entry.map_err(|err| StoreError::backend("check_access", err))?;
            }
        }
        Ok(())
    }

    fn public_url(&self, snapshot: &SnapshotRef) -> String {
        format!(
            "https://{}.blob.core.windows.net/{}/{}",
            self.account,
            snapshot.source.container(),
            snapshot.name
        )
    }
}
