//! Catalog persistence.
//!
//! A store holds one collection of [`LocationEntry`] documents. It enforces
//! the (institution, city) uniqueness constraint itself: [`CatalogStore::insert`]
//! refuses a second entry for a key that is already taken, and
//! [`CatalogStore::append_listing`] pushes onto an existing entry atomically.
//! Services never rely on check-then-act for uniqueness.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{EntryId, ListingId, LocationEntry, LocationKey, SellerListing};

mod file;
mod memory;
mod state;

pub use file::JsonFileCatalogStore;
pub use memory::MemoryCatalogStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by catalog stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entry not found: {id}")]
    NotFound { id: String },

    #[error("Listing {listing} not found in entry {entry}")]
    ListingNotFound { entry: String, listing: String },

    #[error("An entry for {key} already exists")]
    DuplicateKey { key: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn not_found(id: &EntryId) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn listing_not_found(entry: &EntryId, listing: &ListingId) -> Self {
        Self::ListingNotFound {
            entry: entry.to_string(),
            listing: listing.to_string(),
        }
    }

    pub fn duplicate_key(key: &LocationKey) -> Self {
        Self::DuplicateKey {
            key: key.to_string(),
        }
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up the entry for a location key.
    async fn find_by_key(&self, key: &LocationKey) -> StoreResult<Option<LocationEntry>>;

    /// Look up an entry by id.
    async fn find_by_id(&self, id: &EntryId) -> StoreResult<Option<LocationEntry>>;

    /// Insert a new entry. Fails with `DuplicateKey` if its location is taken.
    async fn insert(&self, entry: LocationEntry) -> StoreResult<LocationEntry>;

    /// Append a listing to an existing entry in one step.
    async fn append_listing(&self, id: &EntryId, listing: SellerListing) -> StoreResult<LocationEntry>;

    /// Swap a listing (matched by id) inside an entry, returning the old one.
    async fn replace_listing(&self, id: &EntryId, listing: SellerListing) -> StoreResult<SellerListing>;

    /// Take a single listing out of an entry, returning it.
    async fn remove_listing(&self, id: &EntryId, listing_id: &ListingId) -> StoreResult<SellerListing>;

    /// Replace a stored entry. Fails with `NotFound` if it does not exist.
    async fn save(&self, entry: LocationEntry) -> StoreResult<LocationEntry>;

    /// Remove an entry, returning it if it existed.
    async fn delete_by_id(&self, id: &EntryId) -> StoreResult<Option<LocationEntry>>;

    /// Every entry, most recently created first.
    async fn list_all_sorted_by_creation(&self) -> StoreResult<Vec<LocationEntry>>;
}
