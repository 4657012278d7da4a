use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use mart_core::{MartError, MartResult, RequestContext};
use mart_media::MediaUploader;
use serde::Serialize;

use crate::config::CatalogSettings;
use crate::janitor::MediaJanitor;
use crate::model::{EntryId, ListingId, LocationEntry, LocationKey, SellerListing};
use crate::normalize::{ListingDetails, RegisterListing, UpdateListing};
use crate::store::{CatalogStore, StoreError};
use crate::uploads::{upload_all, UploadedBatch};

/// How a registration landed in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Created,
    Appended,
}

impl Disposition {
    pub fn message(&self) -> &'static str {
        match self {
            Disposition::Created => "new entry created",
            Disposition::Appended => "appended to existing entry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutcome {
    pub entry_id: EntryId,
    pub listing_id: ListingId,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReceipt {
    pub entry_id: EntryId,
    pub listings_removed: usize,
    pub assets_scheduled: usize,
}

/// Store failures as client-facing errors.
fn classify(err: StoreError) -> anyhow::Error {
    match err {
        StoreError::NotFound { id } => MartError::not_found(format!("No entry with id {id}")).into_anyhow(),
        StoreError::ListingNotFound { entry, listing } => {
            MartError::not_found(format!("No listing {listing} in entry {entry}")).into_anyhow()
        }
        StoreError::DuplicateKey { key } => {
            MartError::conflict(format!("An entry for {key} already exists")).into_anyhow()
        }
        other => MartError::internal("Catalog storage failed")
            .with_source(other.into())
            .into_anyhow(),
    }
}

/// The location catalog: registration, lookup, update and removal of seller
/// listings grouped by (institution, city).
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    media: Arc<dyn MediaUploader>,
    janitor: MediaJanitor,
    settings: CatalogSettings,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, media: Arc<dyn MediaUploader>, settings: CatalogSettings) -> Self {
        let janitor = MediaJanitor::new(media.clone(), settings.cleanup.clone());
        Self {
            store,
            media,
            janitor,
            settings,
        }
    }

    pub fn janitor(&self) -> &MediaJanitor {
        &self.janitor
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    /// Register a seller listing under its (institution, city) entry,
    /// creating the entry if this is the first listing there.
    pub async fn register(&self, ctx: &RequestContext, req: RegisterListing) -> MartResult<RegisterOutcome> {
        let (key, details, avatars) = req.validate(self.settings.max_avatars)?;
        let batch = self.upload(&avatars).await?;

        let now = Utc::now();
        let listing = SellerListing {
            id: ListingId::new(),
            name: details.name,
            price: details.price,
            description: details.description,
            categories: details.categories,
            address: details.address,
            contact: details.contact,
            avatars: batch.urls().to_vec(),
            owner: ctx.owner.clone(),
            created_at: now,
            updated_at: now,
        };

        // An error here drops the batch, which rolls the uploads back.
        let outcome = self.upsert(&key, listing).await?;
        batch.commit();

        tracing::info!(
            request_id = %ctx.request_id,
            owner = %ctx.owner,
            entry_id = %outcome.entry_id,
            listing_id = %outcome.listing_id,
            location = %key,
            disposition = outcome.disposition.message(),
            "listing registered"
        );
        Ok(outcome)
    }

    async fn upsert(&self, key: &LocationKey, listing: SellerListing) -> MartResult<RegisterOutcome> {
        let listing_id = listing.id;

        for attempt in 1..=self.settings.upsert_attempts {
            if let Some(entry) = self.store.find_by_key(key).await.map_err(classify)? {
                match self.store.append_listing(&entry.id, listing.clone()).await {
                    Ok(entry) => {
                        return Ok(RegisterOutcome {
                            entry_id: entry.id,
                            listing_id,
                            disposition: Disposition::Appended,
                        })
                    }
                    Err(StoreError::NotFound { .. }) => {
                        tracing::debug!(location = %key, attempt, "entry removed before append, retrying");
                        continue;
                    }
                    Err(err) => return Err(classify(err)),
                }
            }

            match self
                .store
                .insert(LocationEntry::with_listing(key.clone(), listing.clone()))
                .await
            {
                Ok(entry) => {
                    return Ok(RegisterOutcome {
                        entry_id: entry.id,
                        listing_id,
                        disposition: Disposition::Created,
                    })
                }
                Err(StoreError::DuplicateKey { .. }) => {
                    tracing::debug!(location = %key, attempt, "location claimed concurrently, retrying");
                }
                Err(err) => return Err(classify(err)),
            }
        }

        Err(MartError::internal(format!(
            "Could not place listing under {key} after {} attempts",
            self.settings.upsert_attempts
        ))
        .into_anyhow())
    }

    pub async fn get_entry(&self, entry_id: &EntryId) -> MartResult<LocationEntry> {
        self.store
            .find_by_id(entry_id)
            .await
            .map_err(classify)?
            .ok_or_else(|| MartError::not_found(format!("No entry with id {entry_id}")).into_anyhow())
    }

    pub async fn get_listing(&self, entry_id: &EntryId, listing_id: &ListingId) -> MartResult<SellerListing> {
        let entry = self.get_entry(entry_id).await?;
        entry.listing(listing_id).cloned().ok_or_else(|| {
            MartError::not_found(format!("No listing {listing_id} in entry {entry_id}")).into_anyhow()
        })
    }

    /// Every entry, newest first.
    pub async fn list_all(&self) -> MartResult<Vec<LocationEntry>> {
        let entries = self.store.list_all_sorted_by_creation().await.map_err(classify)?;
        if entries.is_empty() {
            mart_core::bail_mart!(empty_result, "No products found");
        }
        Ok(entries)
    }

    /// Replace a listing's editable fields and its whole avatar set.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        entry_id: &EntryId,
        listing_id: &ListingId,
        req: UpdateListing,
    ) -> MartResult<SellerListing> {
        let (details, avatars) = req.validate(self.settings.max_avatars)?;
        let current = self.get_listing(entry_id, listing_id).await?;

        let batch = self.upload(&avatars).await?;
        let updated = apply_update(current, details, batch.urls().to_vec());

        let previous = self
            .store
            .replace_listing(entry_id, updated.clone())
            .await
            .map_err(classify)?;
        batch.commit();

        let scheduled = self.janitor.schedule("avatars-replaced", previous.avatars);
        tracing::info!(
            request_id = %ctx.request_id,
            owner = %ctx.owner,
            entry_id = %entry_id,
            listing_id = %listing_id,
            assets_scheduled = scheduled,
            "listing updated"
        );
        Ok(updated)
    }

    /// Remove an entry with all its listings. Remote media is cleaned up in the
    /// background; the receipt does not wait for it.
    pub async fn delete_entry(&self, ctx: &RequestContext, entry_id: &EntryId) -> MartResult<DeleteReceipt> {
        let entry = self
            .store
            .delete_by_id(entry_id)
            .await
            .map_err(classify)?
            .ok_or_else(|| MartError::not_found(format!("No entry with id {entry_id}")).into_anyhow())?;

        let assets_scheduled = self.janitor.schedule("entry-deleted", entry.avatar_urls());
        let receipt = DeleteReceipt {
            entry_id: entry.id,
            listings_removed: entry.listings.len(),
            assets_scheduled,
        };

        tracing::info!(
            request_id = %ctx.request_id,
            owner = %ctx.owner,
            entry_id = %entry_id,
            listings_removed = receipt.listings_removed,
            assets_scheduled,
            "entry deleted"
        );
        Ok(receipt)
    }

    /// Remove one listing. The entry stays, even when left empty.
    pub async fn remove_listing(
        &self,
        ctx: &RequestContext,
        entry_id: &EntryId,
        listing_id: &ListingId,
    ) -> MartResult<SellerListing> {
        let removed = self
            .store
            .remove_listing(entry_id, listing_id)
            .await
            .map_err(classify)?;

        let scheduled = self.janitor.schedule("listing-removed", removed.avatars.clone());
        tracing::info!(
            request_id = %ctx.request_id,
            owner = %ctx.owner,
            entry_id = %entry_id,
            listing_id = %listing_id,
            assets_scheduled = scheduled,
            "listing removed"
        );
        Ok(removed)
    }

    async fn upload(&self, avatars: &[PathBuf]) -> MartResult<UploadedBatch> {
        upload_all(self.media.as_ref(), &self.janitor, avatars).await
    }
}

fn apply_update(current: SellerListing, details: ListingDetails, avatars: Vec<String>) -> SellerListing {
    SellerListing {
        name: details.name,
        price: details.price,
        description: details.description,
        categories: details.categories,
        address: details.address,
        contact: details.contact,
        avatars,
        updated_at: Utc::now(),
        ..current
    }
}
