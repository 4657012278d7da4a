use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};
use crate::model::{EntryId, ListingId, LocationEntry, LocationKey, SellerListing};

/// The collection plus its unique location index.
///
/// Backends wrap this in a lock; every method here runs under that lock, so
/// each one is a single atomic step from the caller's point of view.
#[derive(Debug, Default, Clone)]
pub(crate) struct CatalogState {
    entries: HashMap<EntryId, LocationEntry>,
    by_key: HashMap<LocationKey, EntryId>,
}

/// On-disk shape: the collection as one ordered array.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CatalogDocument {
    pub entries: Vec<LocationEntry>,
}

impl CatalogState {
    pub fn from_document(doc: CatalogDocument) -> StoreResult<Self> {
        let mut state = Self::default();
        for entry in doc.entries {
            state.insert(entry)?;
        }
        Ok(state)
    }

    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            entries: self.sorted_by_creation(),
        }
    }

    pub fn find_by_key(&self, key: &LocationKey) -> Option<LocationEntry> {
        self.by_key
            .get(key)
            .and_then(|id| self.entries.get(id))
            .cloned()
    }

    pub fn find_by_id(&self, id: &EntryId) -> Option<LocationEntry> {
        self.entries.get(id).cloned()
    }

    pub fn insert(&mut self, entry: LocationEntry) -> StoreResult<LocationEntry> {
        let key = entry.key();
        if self.by_key.contains_key(&key) {
            return Err(StoreError::duplicate_key(&key));
        }
        self.by_key.insert(key, entry.id);
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    pub fn append_listing(&mut self, id: &EntryId, listing: SellerListing) -> StoreResult<LocationEntry> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id))?;
        entry.listings.push(listing);
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    pub fn replace_listing(&mut self, id: &EntryId, listing: SellerListing) -> StoreResult<SellerListing> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id))?;
        let slot = entry
            .listing_mut(&listing.id)
            .ok_or_else(|| StoreError::listing_not_found(id, &listing.id))?;
        let previous = std::mem::replace(slot, listing);
        entry.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn remove_listing(&mut self, id: &EntryId, listing_id: &ListingId) -> StoreResult<SellerListing> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id))?;
        let pos = entry
            .listings
            .iter()
            .position(|l| &l.id == listing_id)
            .ok_or_else(|| StoreError::listing_not_found(id, listing_id))?;
        let removed = entry.listings.remove(pos);
        entry.updated_at = Utc::now();
        Ok(removed)
    }

    pub fn save(&mut self, entry: LocationEntry) -> StoreResult<LocationEntry> {
        let Some(existing) = self.entries.get(&entry.id) else {
            return Err(StoreError::not_found(&entry.id));
        };

        let old_key = existing.key();
        let new_key = entry.key();
        if old_key != new_key {
            if self.by_key.contains_key(&new_key) {
                return Err(StoreError::duplicate_key(&new_key));
            }
            self.by_key.remove(&old_key);
            self.by_key.insert(new_key, entry.id);
        }

        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    pub fn delete_by_id(&mut self, id: &EntryId) -> Option<LocationEntry> {
        let entry = self.entries.remove(id)?;
        self.by_key.remove(&entry.key());
        Some(entry)
    }

    pub fn sorted_by_creation(&self) -> Vec<LocationEntry> {
        let mut all: Vec<LocationEntry> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }
}
