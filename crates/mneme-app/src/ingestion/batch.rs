//! Batched download → extract → submit processing for one source.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::pipeline::{extract_source_url, extract_title, fallback_source_url};
use crate::store::{SNAPSHOT_EXT, SnapshotRef, SnapshotStore, Source};

use super::submit::{IndexClient, SubmitPolicy};
use super::types::{IngestError, SourceReport, SubmissionResult, SyncOptions};

/// Fixed pause between consecutive submission groups, independent of the
/// configured inter-item delay.
const GROUP_PAUSE: Duration = Duration::from_secs(1);

/// Process one source end to end under the configured concurrency and pacing
/// limits.
///
/// Per-snapshot failures are recorded in the report and never abort the
/// batch; the only early exit is the consecutive-timeout circuit breaker,
/// which propagates as [`IngestError::CircuitBreaker`].
pub async fn run_source(
    source: Source,
    store: Arc<dyn SnapshotStore>,
    client: Arc<IndexClient>,
    options: &SyncOptions,
) -> Result<SourceReport, IngestError> {
    assert!(options.concurrency > 0, "concurrency must be positive");

    if !options.dry_run {
        store
            .check_access()
            .await
            .map_err(|err| IngestError::store("check_access", err))?;
    }

    let listed = store
        .list(source)
        .await
        .map_err(|err| IngestError::store("list", err))?;
    let snapshots: Vec<SnapshotRef> = listed
        .into_iter()
        .filter(|snapshot| snapshot.name.ends_with(SNAPSHOT_EXT))
        .collect();

    info!(
        source = source.slug(),
        discovered = snapshots.len(),
        dry_run = options.dry_run,
        "listed archived snapshots"
    );

    if snapshots.is_empty() {
        return Ok(SourceReport::empty(source));
    }
    if options.dry_run {
        return Ok(SourceReport::discovered(source, snapshots.len()));
    }

    let policy = SubmitPolicy {
        timeout: options.submit_timeout,
        max_retries: options.max_retries,
    };
    let total = snapshots.len();
    let mut results: Vec<SubmissionResult> = Vec::with_capacity(total);

    for (group_idx, group) in snapshots.chunks(options.concurrency).enumerate() {
        if group_idx > 0 {
            sleep(GROUP_PAUSE).await;
        }
        debug!(
            source = source.slug(),
            group = group_idx + 1,
            size = group.len(),
            "starting submission group"
        );

        let mut join_set = JoinSet::new();
        for (offset, snapshot) in group.iter().cloned().enumerate() {
            let store = Arc::clone(&store);
            let client = Arc::clone(&client);
            let stagger = options.inter_item_delay * offset as u32;
            join_set.spawn(async move {
                if !stagger.is_zero() {
                    sleep(stagger).await;
                }
                let outcome = process_snapshot(store, client, &snapshot, &policy).await;
                (offset, outcome)
            });
        }

        // Every member settles before the next group starts; the breaker is
        // the only exit that leaves siblings behind (dropping the JoinSet
        // aborts them).
        let mut settled: Vec<(usize, SubmissionResult)> = Vec::with_capacity(group.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((offset, Ok(result))) => settled.push((offset, result)),
                Ok((_, Err(fatal))) => return Err(fatal),
                Err(join_err) => return Err(IngestError::TaskJoin(join_err.to_string())),
            }
        }
        settled.sort_by_key(|(offset, _)| *offset);
        results.extend(settled.into_iter().map(|(_, result)| result));
    }

    Ok(SourceReport::from_results(source, total, results))
}

async fn process_snapshot(
    store: Arc<dyn SnapshotStore>,
    client: Arc<IndexClient>,
    snapshot: &SnapshotRef,
    policy: &SubmitPolicy,
) -> Result<SubmissionResult, IngestError> {
    let payload = match store.fetch(snapshot).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(
                source = snapshot.source.slug(),
                object = %snapshot.name,
                error = %err,
                "snapshot download failed"
            );
            return Ok(SubmissionResult::rejected(
                snapshot,
                None,
                format!("download failed: {err}"),
            ));
        }
    };

    let source_url = extract_source_url(&payload)
        .unwrap_or_else(|| fallback_source_url(snapshot.source, &snapshot.name));
    if let Some(title) = extract_title(&payload) {
        debug!(
            source = snapshot.source.slug(),
            object = %snapshot.name,
            title = %title,
            "snapshot metadata extracted"
        );
    }

    let blob_url = store.public_url(snapshot);
    client
        .submit(snapshot, &payload, &blob_url, Some(&source_url), policy)
        .await
}
