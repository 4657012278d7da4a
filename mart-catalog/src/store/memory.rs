use async_trait::async_trait;
use parking_lot::RwLock;

use super::state::CatalogState;
use super::{CatalogStore, StoreResult};
use crate::model::{EntryId, ListingId, LocationEntry, LocationKey, SellerListing};

/// In-memory catalog store for development and testing.
#[derive(Default)]
pub struct MemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn find_by_key(&self, key: &LocationKey) -> StoreResult<Option<LocationEntry>> {
        Ok(self.state.read().find_by_key(key))
    }

    async fn find_by_id(&self, id: &EntryId) -> StoreResult<Option<LocationEntry>> {
        Ok(self.state.read().find_by_id(id))
    }

    async fn insert(&self, entry: LocationEntry) -> StoreResult<LocationEntry> {
        self.state.write().insert(entry)
    }

    async fn append_listing(&self, id: &EntryId, listing: SellerListing) -> StoreResult<LocationEntry> {
        self.state.write().append_listing(id, listing)
    }

    async fn replace_listing(&self, id: &EntryId, listing: SellerListing) -> StoreResult<SellerListing> {
        self.state.write().replace_listing(id, listing)
    }

    async fn remove_listing(&self, id: &EntryId, listing_id: &ListingId) -> StoreResult<SellerListing> {
        self.state.write().remove_listing(id, listing_id)
    }

    async fn save(&self, entry: LocationEntry) -> StoreResult<LocationEntry> {
        self.state.write().save(entry)
    }

    async fn delete_by_id(&self, id: &EntryId) -> StoreResult<Option<LocationEntry>> {
        Ok(self.state.write().delete_by_id(id))
    }

    async fn list_all_sorted_by_creation(&self) -> StoreResult<Vec<LocationEntry>> {
        Ok(self.state.read().sorted_by_creation())
    }
}

#[cfg(test)]
mod tests {
    use super::super::conformance;
    use super::*;

    #[tokio::test]
    async fn insert_enforces_unique_location() {
        conformance::insert_enforces_unique_location(&MemoryCatalogStore::new()).await;
    }

    #[tokio::test]
    async fn append_keeps_prior_listings() {
        conformance::append_keeps_prior_listings(&MemoryCatalogStore::new()).await;
    }

    #[tokio::test]
    async fn delete_frees_the_location() {
        conformance::delete_frees_the_location(&MemoryCatalogStore::new()).await;
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        conformance::listing_is_newest_first(&MemoryCatalogStore::new()).await;
    }

    #[tokio::test]
    async fn listings_are_replaced_and_removed_in_place() {
        conformance::listings_are_replaced_and_removed_in_place(&MemoryCatalogStore::new()).await;
    }

    #[tokio::test]
    async fn save_requires_existing_entry() {
        conformance::save_requires_existing_entry(&MemoryCatalogStore::new()).await;
    }
}
