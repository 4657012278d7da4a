use std::path::{Path, PathBuf};

use futures::future::join_all;
use mart_core::{MartError, MartResult};
use mart_media::MediaUploader;
use serde_json::json;

use crate::janitor::MediaJanitor;

/// Remote assets uploaded for one request that are not yet owned by a stored
/// listing.
///
/// Dropping the batch without calling [`commit`](Self::commit) hands every
/// URL to the janitor, so any early return after a successful upload rolls
/// the assets back.
#[must_use = "an uncommitted batch is rolled back on drop"]
pub(crate) struct UploadedBatch {
    urls: Vec<String>,
    janitor: MediaJanitor,
    committed: bool,
}

impl UploadedBatch {
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// The listing now references these URLs; keep them.
    pub fn commit(mut self) -> Vec<String> {
        self.committed = true;
        std::mem::take(&mut self.urls)
    }
}

impl Drop for UploadedBatch {
    fn drop(&mut self) {
        if !self.committed && !self.urls.is_empty() {
            tracing::warn!(count = self.urls.len(), "rolling back uploaded avatars");
            self.janitor
                .schedule("upload-rollback", std::mem::take(&mut self.urls));
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Upload every file concurrently. All succeed or none are kept.
///
/// On partial failure the assets that did make it are scheduled for removal
/// and an `UploadFailure` names the files that did not.
pub(crate) async fn upload_all(
    media: &dyn MediaUploader,
    janitor: &MediaJanitor,
    paths: &[PathBuf],
) -> MartResult<UploadedBatch> {
    let results = join_all(paths.iter().map(|path| media.upload(path))).await;

    let mut batch = UploadedBatch {
        urls: Vec::with_capacity(paths.len()),
        janitor: janitor.clone(),
        committed: false,
    };
    let mut failures = Vec::new();

    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(url) => batch.urls.push(url),
            Err(err) => {
                tracing::warn!(
                    file = %path.display(),
                    backend = media.backend_name(),
                    error = %err,
                    "avatar upload failed"
                );
                failures.push(json!({ "file": display_name(path), "error": err.to_string() }));
            }
        }
    }

    if failures.is_empty() {
        return Ok(batch);
    }

    let message = format!("{} of {} images failed to upload", failures.len(), paths.len());
    drop(batch);
    Err(MartError::upload_failure(message)
        .with_errors(json!({ "avatar": failures }))
        .into_anyhow())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mart_core::ErrorKind;
    use mart_media::MemoryMediaUploader;

    use super::*;
    use crate::janitor::CleanupPolicy;

    async fn files(dir: &tempfile::TempDir, names: &[&str]) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for name in names {
            let path = dir.path().join(name);
            tokio::fs::write(&path, b"img").await.unwrap();
            out.push(path);
        }
        out
    }

    fn setup() -> (MemoryMediaUploader, MediaJanitor) {
        let media = MemoryMediaUploader::default();
        let janitor = MediaJanitor::new(
            Arc::new(media.clone()),
            CleanupPolicy::new(1, Duration::from_millis(1)),
        );
        (media, janitor)
    }

    #[tokio::test]
    async fn committed_batch_keeps_assets() {
        let dir = tempfile::tempdir().unwrap();
        let (media, janitor) = setup();
        let paths = files(&dir, &["a.jpg", "b.png"]).await;

        let batch = upload_all(&media, &janitor, &paths).await.unwrap();
        let urls = batch.commit();
        janitor.wait_idle().await;

        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| media.contains(u)));
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn dropped_batch_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let (media, janitor) = setup();
        let paths = files(&dir, &["a.jpg"]).await;

        let batch = upload_all(&media, &janitor, &paths).await.unwrap();
        assert_eq!(media.len(), 1);
        drop(batch);
        janitor.wait_idle().await;

        assert!(media.is_empty());
    }

    #[tokio::test]
    async fn partial_failure_keeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (media, janitor) = setup();
        media.reject_file_name("bad.jpg");
        let paths = files(&dir, &["ok1.jpg", "bad.jpg", "ok2.jpg"]).await;

        let err = upload_all(&media, &janitor, &paths).await.err().unwrap();
        janitor.wait_idle().await;

        let mart = MartError::from_anyhow(&err).unwrap();
        assert_eq!(mart.kind, ErrorKind::UploadFailure);
        assert_eq!(mart.message, "1 of 3 images failed to upload");
        let failed = &mart.errors.as_ref().unwrap()["avatar"];
        assert_eq!(failed[0]["file"], "bad.jpg");
        assert!(media.is_empty());
    }
}
