//! # mart-catalog
//!
//! Seller listings grouped into one entry per (institution, city).
//!
//! ```text
//!  HTTP boundary ──► CatalogService ──► dyn CatalogStore   (memory | JSON file)
//!                          │
//!                          ├──────────► dyn MediaUploader  (upload, all-or-nothing)
//!                          └──────────► MediaJanitor       (background deletes)
//! ```
//!
//! Registration validates and normalizes input, uploads every avatar, then
//! upserts by location key. The store owns the uniqueness constraint; the
//! service retries on a duplicate-key conflict so concurrent first
//! registrations for one location end up in a single entry.

pub mod config;
pub mod janitor;
pub mod model;
pub mod normalize;
pub mod service;
pub mod store;
mod uploads;

pub use config::CatalogSettings;
pub use janitor::{CleanupPolicy, DeadLetter, MediaJanitor};
pub use model::{Category, EntryId, ListingId, LocationEntry, LocationKey, SellerListing};
pub use normalize::{normalize_text, ListingFields, LocationFields, RegisterListing, UpdateListing, MAX_AVATARS};
pub use service::{CatalogService, DeleteReceipt, Disposition, RegisterOutcome};
pub use store::{CatalogStore, JsonFileCatalogStore, MemoryCatalogStore, StoreError, StoreResult};

pub mod prelude {
    pub use crate::{
        CatalogService, CatalogSettings, CatalogStore, EntryId, ListingFields, ListingId,
        LocationFields, MemoryCatalogStore, RegisterListing, UpdateListing,
    };
}
