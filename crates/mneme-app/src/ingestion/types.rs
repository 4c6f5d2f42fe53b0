use std::time::Duration;

use bon::Builder;
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::config::SyncConfig;
use crate::store::{SnapshotRef, Source, StoreError};

/// Options governing one sync run.
#[derive(Debug, Clone, Builder)]
pub struct SyncOptions {
    /// Snapshots submitted concurrently within one group.
    #[builder(default = 3)]
    pub concurrency: usize,
    /// Discover snapshots without submitting anything.
    #[builder(default = false)]
    pub dry_run: bool,
    /// Stagger applied to downloads inside a group.
    #[builder(default = Duration::from_millis(500))]
    pub inter_item_delay: Duration,
    /// Budget for one submission attempt.
    #[builder(default = Duration::from_secs(30))]
    pub submit_timeout: Duration,
    /// Total submission attempts per snapshot, first attempt included.
    #[builder(default = 3)]
    pub max_retries: usize,
    /// Consecutive submission timeouts tolerated before the run aborts.
    #[builder(default = 10)]
    pub max_consecutive_timeouts: u32,
}

/// Explicit per-invocation overrides layered over configured defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOverrides {
    pub concurrency: Option<usize>,
    pub dry_run: bool,
    pub delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<usize>,
    pub max_consecutive_timeouts: Option<u32>,
}

impl SyncOptions {
    /// Layered resolution: explicit override, then configured value (which
    /// itself already folded in the built-in defaults).
    pub fn resolve(overrides: &SyncOverrides, cfg: &SyncConfig) -> Result<Self, IngestError> {
        let concurrency = overrides.concurrency.unwrap_or(cfg.concurrency);
        if concurrency == 0 {
            return Err(IngestError::InvalidOptions(
                "concurrency must be at least 1".to_string(),
            ));
        }
        let timeout_ms = overrides.timeout_ms.unwrap_or(cfg.timeout_ms);
        if timeout_ms == 0 {
            return Err(IngestError::InvalidOptions(
                "timeout must be positive".to_string(),
            ));
        }
        let max_retries = overrides.max_retries.unwrap_or(cfg.max_retries);
        if max_retries == 0 {
            return Err(IngestError::InvalidOptions(
                "max retries must allow at least one attempt".to_string(),
            ));
        }
        let max_consecutive_timeouts = overrides
            .max_consecutive_timeouts
            .unwrap_or(cfg.max_consecutive_timeouts);
        if max_consecutive_timeouts == 0 {
            return Err(IngestError::InvalidOptions(
                "max consecutive timeouts must be at least 1".to_string(),
            ));
        }

        Ok(SyncOptions::builder()
            .concurrency(concurrency)
            .dry_run(overrides.dry_run)
            .inter_item_delay(Duration::from_millis(
                overrides.delay_ms.unwrap_or(cfg.delay_ms),
            ))
            .submit_timeout(Duration::from_millis(timeout_ms))
            .max_retries(max_retries)
            .max_consecutive_timeouts(max_consecutive_timeouts)
            .build())
    }
}

/// Which snapshot collections one invocation processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    One(Source),
    All,
}

impl Selector {
    /// Sources in their fixed processing order.
    pub fn sources(self) -> Vec<Source> {
        match self {
            Selector::One(source) => vec![source],
            Selector::All => Source::iter().collect(),
        }
    }
}

/// Outcome of one snapshot's submission, recorded exactly once per run.
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub source: Source,
    pub object: String,
    pub success: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl SubmissionResult {
    pub fn accepted(snapshot: &SnapshotRef, status: u16) -> Self {
        Self {
            source: snapshot.source,
            object: snapshot.name.clone(),
            success: true,
            status: Some(status),
            error: None,
        }
    }

    pub fn rejected(snapshot: &SnapshotRef, status: Option<u16>, detail: String) -> Self {
        Self {
            source: snapshot.source,
            object: snapshot.name.clone(),
            success: false,
            status,
            error: Some(detail),
        }
    }
}

/// Aggregate over one source's run.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: Source,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<SubmissionResult>,
}

impl SourceReport {
    pub fn empty(source: Source) -> Self {
        Self {
            source,
            total: 0,
            success: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    /// Dry-run report: discovery count only, nothing submitted.
    pub fn discovered(source: Source, total: usize) -> Self {
        Self {
            source,
            total,
            success: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    pub fn from_results(source: Source, total: usize, results: Vec<SubmissionResult>) -> Self {
        let success = results.iter().filter(|result| result.success).count();
        let failed = results.len() - success;
        Self {
            source,
            total,
            success,
            failed,
            results,
        }
    }
}

/// One source's listing or connectivity failure inside a combined run.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub source: Source,
    pub detail: String,
}

/// Aggregate over all sources processed in one invocation.
#[derive(Debug, Default)]
pub struct RunReport {
    pub reports: Vec<SourceReport>,
    pub failures: Vec<SourceFailure>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.reports.iter().map(|report| report.total).sum()
    }

    pub fn success(&self) -> usize {
        self.reports.iter().map(|report| report.success).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(|report| report.failed).sum()
    }
}

/// Error type shared across the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid indexer endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("invalid sync option: {0}")]
    InvalidOptions(String),
    #[error("request error during `{stage}`: {source}")]
    Request {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("store error during `{stage}`: {source}")]
    Store {
        stage: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("submission task failed to complete: {0}")]
    TaskJoin(String),
    #[error("aborting after {count} consecutive submission timeouts")]
    CircuitBreaker { count: u32 },
}

impl IngestError {
    pub fn request(stage: &'static str, source: reqwest::Error) -> Self {
        Self::Request { stage, source }
    }

    pub fn store(stage: &'static str, source: StoreError) -> Self {
        Self::Store { stage, source }
    }
}
