//! Sequential fan-out of the batch orchestrator across snapshot sources.

use std::sync::Arc;

use tracing::{info, warn};

use crate::store::SnapshotStore;

use super::batch::run_source;
use super::submit::IndexClient;
use super::types::{IngestError, RunReport, Selector, SourceFailure, SyncOptions};

/// Run every selected source in its fixed order and combine the reports.
///
/// Sources never run concurrently with each other. A source whose listing or
/// connectivity check fails is recorded and skipped so the remaining sources
/// still run; only the circuit breaker aborts the whole run.
pub async fn run(
    selector: Selector,
    store: Arc<dyn SnapshotStore>,
    client: Arc<IndexClient>,
    options: &SyncOptions,
) -> Result<RunReport, IngestError> {
    let mut report = RunReport::default();

    for source in selector.sources() {
        match run_source(source, Arc::clone(&store), Arc::clone(&client), options).await {
            Ok(source_report) => {
                info!(
                    source = source.slug(),
                    total = source_report.total,
                    success = source_report.success,
                    failed = source_report.failed,
                    "source sync finished"
                );
                report.reports.push(source_report);
            }
            Err(fatal @ IngestError::CircuitBreaker { .. }) => return Err(fatal),
            Err(err) => {
                warn!(
                    source = source.slug(),
                    error = %err,
                    "source sync aborted; continuing with remaining sources"
                );
                report.failures.push(SourceFailure {
                    source,
                    detail: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}
