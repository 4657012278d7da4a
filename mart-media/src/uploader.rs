use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::MediaResult;

/// Media storage operations the catalog depends on.
///
/// `upload` pushes a local temporary file to remote storage and returns a
/// durable URL. On success the local file has been removed. On failure it is
/// left in place for the caller to dispose of.
///
/// `delete` is idempotent: removing an asset that is already gone reports
/// [`DeleteOutcome::NotFound`] instead of an error.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload a local file and return its durable URL
    async fn upload(&self, local_path: &Path) -> MediaResult<String>;

    /// Delete the asset a durable URL points at
    async fn delete(&self, url: &str) -> MediaResult<DeleteOutcome>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// What a delete call found on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Generate a fresh asset id.
pub fn new_asset_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Derive the remote asset id from a durable URL: the last path segment with
/// its extension (and any query/fragment) removed.
///
/// ```rust
/// use mart_media::asset_id_from_url;
/// assert_eq!(
///     asset_id_from_url("https://cdn.example.com/avatars/abc123.jpg"),
///     Some("abc123".to_string())
/// );
/// ```
pub fn asset_id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = match segment.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => segment,
    };

    if stem.is_empty() || stem.contains(':') {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Content type inferred from a file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("heic") => "image/heic",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Remove an uploaded temp file. Called once, after the remote put succeeded.
pub(crate) async fn discard_local_file(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::warn!(
            path = %path.display(),
            error = %err,
            "uploaded temp file could not be removed"
        );
    }
}
