use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::uploader::{content_type_for, discard_local_file, new_asset_id};
use crate::{asset_id_from_url, DeleteOutcome, MediaConfig, MediaError, MediaResult, MediaUploader};

/// An asset held by [`MemoryMediaUploader`]
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub content_type: &'static str,
    pub data: Bytes,
}

/// In-memory media backend for development and testing.
///
/// Remote failures can be simulated: uploads of files whose name was passed
/// to [`reject_file_name`](Self::reject_file_name) fail, and
/// [`fail_next_deletes`](Self::fail_next_deletes) makes the following delete
/// calls return an error.
#[derive(Clone)]
pub struct MemoryMediaUploader {
    config: MediaConfig,
    assets: Arc<RwLock<HashMap<String, StoredAsset>>>,
    rejected: Arc<RwLock<HashSet<String>>>,
    delete_failures: Arc<AtomicUsize>,
}

impl MemoryMediaUploader {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            config,
            assets: Arc::new(RwLock::new(HashMap::new())),
            rejected: Arc::new(RwLock::new(HashSet::new())),
            delete_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every upload of a file with this name fail
    pub fn reject_file_name<S: Into<String>>(&self, file_name: S) {
        self.rejected.write().insert(file_name.into());
    }

    /// Make the next `count` delete calls fail
    pub fn fail_next_deletes(&self, count: usize) {
        self.delete_failures.store(count, Ordering::SeqCst);
    }

    /// Whether the asset behind `url` is currently stored
    pub fn contains(&self, url: &str) -> bool {
        asset_id_from_url(url)
            .map(|id| self.assets.read().contains_key(&id))
            .unwrap_or(false)
    }

    /// Fetch a stored asset by its durable URL
    pub fn asset(&self, url: &str) -> Option<StoredAsset> {
        let id = asset_id_from_url(url)?;
        self.assets.read().get(&id).cloned()
    }

    /// Number of stored assets
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    fn take_delete_failure(&self) -> bool {
        self.delete_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MemoryMediaUploader {
    fn default() -> Self {
        Self::new(MediaConfig::default())
    }
}

#[async_trait]
impl MediaUploader for MemoryMediaUploader {
    async fn upload(&self, local_path: &Path) -> MediaResult<String> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        if self.rejected.read().contains(&file_name) {
            return Err(MediaError::upload_failed(format!(
                "remote store rejected '{file_name}'"
            )));
        }

        let data = tokio::fs::read(local_path).await?;
        if data.len() as u64 > self.config.max_asset_bytes {
            return Err(MediaError::invalid(format!(
                "Asset size {} exceeds maximum {}",
                data.len(),
                self.config.max_asset_bytes
            )));
        }

        let asset_id = new_asset_id();
        let asset = StoredAsset {
            content_type: content_type_for(local_path),
            data: Bytes::from(data),
        };
        self.assets.write().insert(asset_id.clone(), asset);

        discard_local_file(local_path).await;
        Ok(self.config.public_url(&asset_id))
    }

    async fn delete(&self, url: &str) -> MediaResult<DeleteOutcome> {
        let asset_id = asset_id_from_url(url)
            .ok_or_else(|| MediaError::invalid(format!("No asset id in url '{url}'")))?;

        if self.take_delete_failure() {
            return Err(MediaError::delete_failed(format!(
                "simulated failure deleting '{asset_id}'"
            )));
        }

        match self.assets.write().remove(&asset_id) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
