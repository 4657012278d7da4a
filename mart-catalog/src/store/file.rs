use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::state::{CatalogDocument, CatalogState};
use super::{CatalogStore, StoreResult};
use crate::model::{EntryId, ListingId, LocationEntry, LocationKey, SellerListing};

/// Catalog store persisted as a single JSON document.
///
/// Every mutation is applied to a copy of the state, written to a sibling
/// temp file, renamed over the document and only then made visible. A failed
/// write leaves both the file and the in-memory state untouched.
pub struct JsonFileCatalogStore {
    path: PathBuf,
    state: Mutex<CatalogState>,
}

impl JsonFileCatalogStore {
    /// Open the document at `path`, starting empty if it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let doc: CatalogDocument = serde_json::from_slice(&bytes)?;
                CatalogState::from_document(doc)?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CatalogState::default(),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(path = %path.display(), "catalog document opened");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &CatalogState) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&state.to_document())?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn mutate<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&mut CatalogState) -> StoreResult<T>,
    {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = op(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(out)
    }
}

#[async_trait]
impl CatalogStore for JsonFileCatalogStore {
    async fn find_by_key(&self, key: &LocationKey) -> StoreResult<Option<LocationEntry>> {
        Ok(self.state.lock().await.find_by_key(key))
    }

    async fn find_by_id(&self, id: &EntryId) -> StoreResult<Option<LocationEntry>> {
        Ok(self.state.lock().await.find_by_id(id))
    }

    async fn insert(&self, entry: LocationEntry) -> StoreResult<LocationEntry> {
        self.mutate(|state| state.insert(entry)).await
    }

    async fn append_listing(&self, id: &EntryId, listing: SellerListing) -> StoreResult<LocationEntry> {
        self.mutate(|state| state.append_listing(id, listing)).await
    }

    async fn replace_listing(&self, id: &EntryId, listing: SellerListing) -> StoreResult<SellerListing> {
        self.mutate(|state| state.replace_listing(id, listing)).await
    }

    async fn remove_listing(&self, id: &EntryId, listing_id: &ListingId) -> StoreResult<SellerListing> {
        self.mutate(|state| state.remove_listing(id, listing_id)).await
    }

    async fn save(&self, entry: LocationEntry) -> StoreResult<LocationEntry> {
        self.mutate(|state| state.save(entry)).await
    }

    async fn delete_by_id(&self, id: &EntryId) -> StoreResult<Option<LocationEntry>> {
        self.mutate(|state| Ok(state.delete_by_id(id))).await
    }

    async fn list_all_sorted_by_creation(&self) -> StoreResult<Vec<LocationEntry>> {
        Ok(self.state.lock().await.sorted_by_creation())
    }
}
