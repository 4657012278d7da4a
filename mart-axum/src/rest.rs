use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing, Json, Router,
};
use mart_catalog::{ListingFields, LocationFields, RegisterListing, UpdateListing};
use serde_json::json;

use crate::{
    middlewares::multipart::{read_listing_form, ListingForm},
    params::{entry_id, listing_id, Caller},
    MartAxumError, MartAxumState,
};

/// Map form field names (including the legacy spellings) onto listing fields.
fn listing_fields(form: &ListingForm) -> ListingFields {
    ListingFields {
        name: form.text(&["name"]),
        price: form.text(&["price"]),
        description: form.text(&["description"]),
        contact: form.text(&["contactDetails", "contact"]),
        address: form.text(&["address", "Address"]),
        category: form.text(&["category"]),
    }
}

fn location_fields(form: &ListingForm) -> LocationFields {
    LocationFields {
        institution: form.text(&["collegeName", "collageName"]),
        city: form.text(&["city"]),
    }
}

pub fn product_router(state: MartAxumState) -> Router<()> {
    Router::new()
        .route(
            "/",
            routing::get(|State(state): State<MartAxumState>| async move {
                let entries = state.catalog.list_all().await?;
                Ok::<_, MartAxumError>(Json(entries))
            }),
        )
        .route(
            "/register",
            routing::post(
                |State(state): State<MartAxumState>,
                 Caller(ctx): Caller,
                 headers: HeaderMap,
                 body: Body| async move {
                    let form = read_listing_form(&headers, body, &state.intake).await?;
                    let req = RegisterListing {
                        location: location_fields(&form),
                        listing: listing_fields(&form),
                        avatars: form.files.paths().to_vec(),
                    };

                    // `form` still owns the temp files; anything the service
                    // did not consume is removed when it drops.
                    let outcome = state.catalog.register(&ctx, req).await?;
                    drop(form);

                    let body = json!({
                        "message": outcome.disposition.message(),
                        "entryId": outcome.entry_id,
                        "listingId": outcome.listing_id,
                        "disposition": outcome.disposition,
                    });
                    Ok::<_, MartAxumError>((StatusCode::CREATED, Json(body)))
                },
            ),
        )
        .route(
            "/{entry_id}",
            routing::get(
                |State(state): State<MartAxumState>, Path(raw): Path<String>| async move {
                    let id = entry_id(&raw)?;
                    let entry = state.catalog.get_entry(&id).await?;
                    Ok::<_, MartAxumError>(Json(entry))
                },
            )
            .delete(
                |State(state): State<MartAxumState>,
                 Caller(ctx): Caller,
                 Path(raw): Path<String>| async move {
                    let id = entry_id(&raw)?;
                    let receipt = state.catalog.delete_entry(&ctx, &id).await?;
                    Ok::<_, MartAxumError>(Json(json!({
                        "message": "entry deleted",
                        "entryId": receipt.entry_id,
                        "listingsRemoved": receipt.listings_removed,
                        "assetsScheduled": receipt.assets_scheduled,
                    })))
                },
            ),
        )
        .route(
            "/{entry_id}/sellers/{listing_id}",
            routing::get(
                |State(state): State<MartAxumState>,
                 Path((raw_entry, raw_listing)): Path<(String, String)>| async move {
                    let entry = entry_id(&raw_entry)?;
                    let listing = listing_id(&raw_listing)?;
                    let found = state.catalog.get_listing(&entry, &listing).await?;
                    Ok::<_, MartAxumError>(Json(found))
                },
            )
            .put(
                |State(state): State<MartAxumState>,
                 Caller(ctx): Caller,
                 Path((raw_entry, raw_listing)): Path<(String, String)>,
                 headers: HeaderMap,
                 body: Body| async move {
                    let entry = entry_id(&raw_entry)?;
                    let listing = listing_id(&raw_listing)?;

                    let form = read_listing_form(&headers, body, &state.intake).await?;
                    let req = UpdateListing {
                        listing: listing_fields(&form),
                        avatars: form.files.paths().to_vec(),
                    };
                    let updated = state.catalog.update(&ctx, &entry, &listing, req).await?;
                    drop(form);

                    Ok::<_, MartAxumError>(Json(updated))
                },
            )
            .delete(
                |State(state): State<MartAxumState>,
                 Caller(ctx): Caller,
                 Path((raw_entry, raw_listing)): Path<(String, String)>| async move {
                    let entry = entry_id(&raw_entry)?;
                    let listing = listing_id(&raw_listing)?;
                    let removed = state.catalog.remove_listing(&ctx, &entry, &listing).await?;
                    Ok::<_, MartAxumError>(Json(removed))
                },
            ),
        )
        .with_state(state)
}
