//! Background removal of remote media.
//!
//! Assets are scheduled here whenever the catalog stops referencing them:
//! after an entry or listing is deleted, after an update swaps the avatar set,
//! and when a partially failed upload batch is rolled back. Each URL is retried
//! with exponential backoff; URLs that still fail are recorded as dead letters
//! and logged under the `mart::dead_letter` target for out-of-band cleanup.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use mart_media::{DeleteOutcome, MediaUploader};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

const TRACING_TARGET: &str = "mart::janitor";
const DEAD_LETTER_TARGET: &str = "mart::dead_letter";

/// Retry policy for remote deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Total delete attempts per URL, at least 1
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub backoff: Duration,
}

impl CleanupPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(200))
    }
}

/// A URL the janitor gave up on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub url: String,
    pub reason: String,
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Schedules remote deletes off the request path.
///
/// Cloning is cheap; clones share the task set and the dead-letter list.
#[derive(Clone)]
pub struct MediaJanitor {
    media: Arc<dyn MediaUploader>,
    policy: CleanupPolicy,
    tracker: TaskTracker,
    /// Serializes `wait_idle` so one caller cannot reopen the tracker while
    /// another is still waiting on it.
    idle: Arc<tokio::sync::Mutex<()>>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl MediaJanitor {
    pub fn new(media: Arc<dyn MediaUploader>, policy: CleanupPolicy) -> Self {
        Self {
            media,
            policy,
            tracker: TaskTracker::new(),
            idle: Arc::new(tokio::sync::Mutex::new(())),
            dead_letters: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn policy(&self) -> &CleanupPolicy {
        &self.policy
    }

    /// Queue `urls` for deletion and return how many were scheduled.
    ///
    /// Never blocks and never fails. Without a Tokio runtime the URLs go
    /// straight to the dead-letter list.
    pub fn schedule(&self, reason: &str, urls: Vec<String>) -> usize {
        if urls.is_empty() {
            return 0;
        }
        let count = urls.len();

        let Ok(handle) = Handle::try_current() else {
            for url in urls {
                self.bury(url, reason, 0, "no async runtime available".to_string());
            }
            return count;
        };

        tracing::debug!(target: TRACING_TARGET, reason, count, "media cleanup scheduled");

        let janitor = self.clone();
        let reason = reason.to_string();
        self.tracker.spawn_on(
            async move {
                join_all(urls.into_iter().map(|url| janitor.delete_with_retry(url, &reason))).await;
            },
            &handle,
        );
        count
    }

    /// Wait until every scheduled delete has finished or been dead-lettered.
    ///
    /// Safe to call from several tasks at once; callers take turns.
    pub async fn wait_idle(&self) {
        let _turn = self.idle.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Number of cleanup batches still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Snapshot of the URLs that could not be deleted.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().clone()
    }

    async fn delete_with_retry(&self, url: String, reason: &str) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.media.delete(&url).await {
                Ok(DeleteOutcome::Deleted) => {
                    tracing::debug!(target: TRACING_TARGET, %url, reason, attempt, "asset deleted");
                    return;
                }
                Ok(DeleteOutcome::NotFound) => {
                    tracing::debug!(target: TRACING_TARGET, %url, reason, "asset already gone");
                    return;
                }
                Err(err) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        target: TRACING_TARGET,
                        %url,
                        reason,
                        attempt,
                        error = %err,
                        "asset delete failed, will retry in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.bury(url, reason, attempt, err.to_string());
                    return;
                }
            }
        }
    }

    fn bury(&self, url: String, reason: &str, attempts: u32, error: String) {
        tracing::error!(
            target: DEAD_LETTER_TARGET,
            %url,
            reason,
            attempts,
            backend = self.media.backend_name(),
            error = %error,
            "asset delete failed permanently"
        );
        self.dead_letters.lock().push(DeadLetter {
            url,
            reason: reason.to_string(),
            attempts,
            error,
            failed_at: Utc::now(),
        });
    }
}
