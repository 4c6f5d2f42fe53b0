//! Delivery of snapshot payloads to the indexing endpoint.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Url, multipart};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::store::SnapshotRef;

use super::types::{IngestError, SubmissionResult};

/// Linear backoff step between attempts after a timeout.
const TIMEOUT_BACKOFF_STEP: Duration = Duration::from_millis(2000);
/// Linear backoff step between attempts after other transport failures.
const TRANSPORT_BACKOFF_STEP: Duration = Duration::from_millis(1000);
/// Longest response-body excerpt carried on a rejected submission.
const BODY_EXCERPT_LEN: usize = 200;

/// Per-call budget for one [`IndexClient::submit`] invocation.
#[derive(Debug, Clone, Copy)]
pub struct SubmitPolicy {
    /// Budget for one attempt; expiry cancels the in-flight call.
    pub timeout: Duration,
    /// Total attempts, first one included.
    pub max_retries: usize,
}

/// Consecutive-timeout kill switch shared by every submission in a run.
///
/// Any timeout-classified failure increments the counter; any accepted
/// submission resets it. Reaching the ceiling is fatal for the whole run,
/// not a per-document failure.
#[derive(Debug)]
pub struct TimeoutBreaker {
    ceiling: u32,
    consecutive: AtomicU32,
}

impl TimeoutBreaker {
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            consecutive: AtomicU32::new(0),
        }
    }

    fn record_success(&self) {
        self.consecutive.store(0, Ordering::SeqCst);
    }

    fn record_timeout(&self) -> Result<u32, IngestError> {
        let count = self.consecutive.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.ceiling {
            Err(IngestError::CircuitBreaker { count })
        } else {
            Ok(count)
        }
    }
}

/// HTTP client for the RAG indexing endpoint.
pub struct IndexClient {
    endpoint: Url,
    http: Client,
    breaker: TimeoutBreaker,
}

impl IndexClient {
    pub fn new(endpoint: &str, max_consecutive_timeouts: u32) -> Result<Self, IngestError> {
        let endpoint =
            Url::parse(endpoint).map_err(|_| IngestError::InvalidEndpoint(endpoint.to_string()))?;
        let http = Client::builder()
            .user_agent(concat!("mneme/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| IngestError::request("build_client", err))?;

        Ok(Self {
            endpoint,
            http,
            breaker: TimeoutBreaker::new(max_consecutive_timeouts),
        })
    }

    /// Deliver one snapshot to the indexing endpoint.
    ///
    /// Every outcome short of the circuit breaker tripping is reported through
    /// the returned [`SubmissionResult`]; `Err` is reserved for the fatal
    /// path. HTTP-level rejections are terminal for the document (the endpoint
    /// was reachable and said no), while timeouts and transport failures are
    /// retried on a linear backoff until the attempt budget runs out.
    pub async fn submit(
        &self,
        snapshot: &SnapshotRef,
        payload: &Bytes,
        blob_url: &str,
        source_url: Option<&str>,
        policy: &SubmitPolicy,
    ) -> Result<SubmissionResult, IngestError> {
        debug_assert!(policy.max_retries >= 1, "at least one attempt is required");
        debug_assert!(!policy.timeout.is_zero(), "attempt timeout must be positive");

        let mut last_error = String::new();
        for attempt in 1..=policy.max_retries {
            let form = build_form(snapshot, payload, blob_url, source_url);
            let outcome = self
                .http
                .post(self.endpoint.clone())
                .multipart(form)
                .timeout(policy.timeout)
                .send()
                .await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        self.breaker.record_success();
                        debug!(
                            source = snapshot.source.slug(),
                            object = %snapshot.name,
                            status = status.as_u16(),
                            attempt,
                            "snapshot accepted by indexer"
                        );
                        return Ok(SubmissionResult::accepted(snapshot, status.as_u16()));
                    }

                    // The endpoint is reachable and refused the document;
                    // retrying the same payload cannot change its mind.
                    let body = response.text().await.unwrap_or_default();
                    let detail =
                        format!("indexer returned {}: {}", status.as_u16(), excerpt(&body));
                    warn!(
                        source = snapshot.source.slug(),
                        object = %snapshot.name,
                        status = status.as_u16(),
                        "indexer rejected snapshot"
                    );
                    return Ok(SubmissionResult::rejected(
                        snapshot,
                        Some(status.as_u16()),
                        detail,
                    ));
                }
                Err(err) if err.is_timeout() => {
                    let consecutive = self.breaker.record_timeout()?;
                    last_error = format!(
                        "attempt {attempt} timed out after {}ms",
                        policy.timeout.as_millis()
                    );
                    warn!(
                        source = snapshot.source.slug(),
                        object = %snapshot.name,
                        attempt,
                        consecutive,
                        "submission attempt timed out"
                    );
                    if attempt < policy.max_retries {
                        sleep(TIMEOUT_BACKOFF_STEP * attempt as u32).await;
                    }
                }
                Err(err) => {
                    last_error = format!("attempt {attempt} failed: {err}");
                    warn!(
                        source = snapshot.source.slug(),
                        object = %snapshot.name,
                        attempt,
                        error = %err,
                        "submission attempt failed in transit"
                    );
                    if attempt < policy.max_retries {
                        sleep(TRANSPORT_BACKOFF_STEP * attempt as u32).await;
                    }
                }
            }
        }

        Ok(SubmissionResult::rejected(snapshot, None, last_error))
    }

    /// Probe the endpoint; any HTTP response counts as reachable.
    pub async fn check_endpoint(&self, timeout: Duration) -> Result<(), IngestError> {
        self.http
            .head(self.endpoint.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| IngestError::request("endpoint_probe", err))?;
        Ok(())
    }
}

fn build_form(
    snapshot: &SnapshotRef,
    payload: &Bytes,
    blob_url: &str,
    source_url: Option<&str>,
) -> multipart::Form {
    let file = multipart::Part::bytes(payload.to_vec()).file_name(snapshot.name.clone());
    let mut form = multipart::Form::new()
        .part("file", file)
        .text("index_type", snapshot.source.slug().to_string())
        .text("blob_url", blob_url.to_string());
    if let Some(url) = source_url {
        form = form.text("source_url", url.to_string());
    }
    form
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
