//! Configuration loading.
//!
//! Settings resolve in layers: built-in defaults, then the optional
//! `config/settings` file, then `MNEME__`-prefixed environment variables.
//! Per-invocation CLI overrides are applied later by
//! [`crate::ingestion::SyncOptions::resolve`] so business logic never reads
//! the ambient environment itself.

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "config/settings";

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_DELAY_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_MAX_CONSECUTIVE_TIMEOUTS: u32 = 10;

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub indexer: IndexerConfig,
    pub sync: SyncConfig,
}

/// Blob storage credentials. Required; there is no anonymous fallback.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub account: String,
    pub access_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexerConfig {
    /// Submission endpoint of the RAG indexing service.
    pub endpoint: String,
}

/// Configured defaults for sync runs, overridable per invocation.
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    pub concurrency: usize,
    pub delay_ms: u64,
    pub timeout_ms: u64,
    pub max_retries: usize,
    pub max_consecutive_timeouts: u32,
}

pub fn load() -> Result<AppConfig, AppConfigError> {
    let builder = Config::builder()
        .set_default("sync.concurrency", DEFAULT_CONCURRENCY as i64)?
        .set_default("sync.delay_ms", DEFAULT_DELAY_MS as i64)?
        .set_default("sync.timeout_ms", DEFAULT_TIMEOUT_MS as i64)?
        .set_default("sync.max_retries", DEFAULT_MAX_RETRIES as i64)?
        .set_default(
            "sync.max_consecutive_timeouts",
            DEFAULT_MAX_CONSECUTIVE_TIMEOUTS as i64,
        )?
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix("MNEME").separator("__"));

    let cfg = builder.build()?.try_deserialize()?;
    Ok(cfg)
}
