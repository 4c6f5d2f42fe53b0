//! Application-level error type shared across the binary's entry points.

use thiserror::Error;

use crate::config::AppConfigError;
use crate::ingestion::IngestError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ConfigLoad(#[from] AppConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("sync aborted for every selected source; first failure: {0}")]
    AllSourcesFailed(String),
}
