use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mart_catalog::prelude::*;
use mart_catalog::{CleanupPolicy, Disposition, JsonFileCatalogStore};
use mart_core::{ErrorKind, MartError, RequestContext};
use mart_media::MemoryMediaUploader;

struct Harness {
    dir: tempfile::TempDir,
    media: MemoryMediaUploader,
    service: CatalogService,
}

impl Harness {
    fn new() -> Self {
        Self::with_store(Arc::new(MemoryCatalogStore::new()))
    }

    fn with_store(store: Arc<dyn CatalogStore>) -> Self {
        let media = MemoryMediaUploader::default();
        let settings = CatalogSettings {
            cleanup: CleanupPolicy::new(2, Duration::from_millis(1)),
            ..CatalogSettings::default()
        };
        let service = CatalogService::new(store, Arc::new(media.clone()), settings);
        Self {
            dir: tempfile::tempdir().unwrap(),
            media,
            service,
        }
    }

    async fn avatars(&self, names: &[&str]) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for name in names {
            let path = self.dir.path().join(name);
            tokio::fs::write(&path, format!("image {name}")).await.unwrap();
            out.push(path);
        }
        out
    }

    async fn settle(&self) {
        self.service.janitor().wait_idle().await;
    }
}

fn ctx() -> RequestContext {
    RequestContext::new("seller-1")
}

fn fields(name: &str) -> ListingFields {
    ListingFields {
        name: name.to_string(),
        price: "120".to_string(),
        description: "Home Cooked Meals".to_string(),
        contact: "9876543210".to_string(),
        address: "Hostel Road".to_string(),
        category: "food".to_string(),
    }
}

fn register_req(name: &str, institution: &str, city: &str, avatars: Vec<PathBuf>) -> RegisterListing {
    RegisterListing {
        location: LocationFields {
            institution: institution.to_string(),
            city: city.to_string(),
        },
        listing: fields(name),
        avatars,
    }
}

#[tokio::test]
async fn first_registration_creates_an_entry_then_appends() {
    let h = Harness::new();

    let first = h
        .service
        .register(&ctx(), register_req("Tiffin Box", "TechU", "Metro", h.avatars(&["a.jpg", "b.jpg"]).await))
        .await
        .unwrap();
    assert_eq!(first.disposition, Disposition::Created);

    let entry = h.service.get_entry(&first.entry_id).await.unwrap();
    assert_eq!(entry.institution, "techu");
    assert_eq!(entry.city, "metro");
    assert_eq!(entry.listings.len(), 1);
    assert_eq!(entry.listings[0].avatars.len(), 2);

    let second = h
        .service
        .register(&ctx(), register_req("SNACK Shack", " techu ", "METRO", h.avatars(&["c.jpg"]).await))
        .await
        .unwrap();
    assert_eq!(second.disposition, Disposition::Appended);
    assert_eq!(second.entry_id, first.entry_id);

    let entry = h.service.get_entry(&first.entry_id).await.unwrap();
    assert_eq!(entry.listings.len(), 2);
    assert_eq!(entry.listings[0].name, "tiffin box");
    assert_eq!(entry.listings[1].name, "snack shack");
    assert_eq!(h.media.len(), 3);

    let listing = h
        .service
        .get_listing(&first.entry_id, &second.listing_id)
        .await
        .unwrap();
    assert_eq!(listing.owner.as_str(), "seller-1");
}

#[tokio::test]
async fn invalid_input_has_no_side_effects() {
    let h = Harness::new();
    let mut req = register_req("Stall", "TechU", "Metro", h.avatars(&["a.jpg"]).await);
    req.listing.price = "cheap".to_string();

    let err = h.service.register(&ctx(), req).await.unwrap_err();
    assert_eq!(MartError::kind_of(&err), ErrorKind::Validation);
    assert!(h.media.is_empty());
    assert_eq!(MartError::kind_of(&h.service.list_all().await.unwrap_err()), ErrorKind::EmptyResult);
}

#[tokio::test]
async fn listings_never_hold_more_than_three_avatars() {
    let media = MemoryMediaUploader::default();
    let settings = CatalogSettings {
        max_avatars: 5,
        ..CatalogSettings::default()
    };
    let service = CatalogService::new(Arc::new(MemoryCatalogStore::new()), Arc::new(media.clone()), settings);
    let h = Harness::new();

    let files = h.avatars(&["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"]).await;
    let err = service
        .register(&ctx(), register_req("Stall", "TechU", "Metro", files))
        .await
        .unwrap_err();

    assert_eq!(MartError::kind_of(&err), ErrorKind::Validation);
    assert!(media.is_empty());
}

#[tokio::test]
async fn failed_upload_leaves_catalog_untouched_and_rolls_back() {
    let h = Harness::new();
    h.media.reject_file_name("broken.jpg");

    let req = register_req("Stall", "TechU", "Metro", h.avatars(&["fine.jpg", "broken.jpg"]).await);
    let err = h.service.register(&ctx(), req).await.unwrap_err();
    h.settle().await;

    assert_eq!(MartError::kind_of(&err), ErrorKind::UploadFailure);
    assert!(h.media.is_empty());
    assert_eq!(MartError::kind_of(&h.service.list_all().await.unwrap_err()), ErrorKind::EmptyResult);
}

#[tokio::test]
async fn store_failure_rolls_back_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    let store = JsonFileCatalogStore::open(&path).await.unwrap();
    // A directory in the document's place makes every write fail.
    std::fs::create_dir(&path).unwrap();

    let h = Harness::with_store(Arc::new(store));
    let req = register_req("Stall", "TechU", "Metro", h.avatars(&["a.jpg", "b.jpg"]).await);
    let err = h.service.register(&ctx(), req).await.unwrap_err();
    h.settle().await;

    assert_eq!(MartError::kind_of(&err), ErrorKind::Internal);
    assert!(h.media.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_registrations_share_one_entry() {
    let h = Harness::new();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let file = format!("{i}.jpg");
        let avatars = h.avatars(&[file.as_str()]).await;
        let service = h.service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .register(&ctx(), register_req(&format!("seller {i}"), "TechU", "Metro", avatars))
                .await
                .unwrap()
        }));
    }

    let mut entry_ids = Vec::new();
    for task in tasks {
        entry_ids.push(task.await.unwrap().entry_id);
    }
    entry_ids.dedup();
    assert_eq!(entry_ids.len(), 1);

    let all = h.service.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].listings.len(), 8);
}

#[tokio::test]
async fn list_all_is_newest_first() {
    let h = Harness::new();
    for city in ["alpha", "beta", "gamma"] {
        let file = format!("{city}.jpg");
        h.service
            .register(&ctx(), register_req("Stall", "TechU", city, h.avatars(&[file.as_str()]).await))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let all = h.service.list_all().await.unwrap();
    let cities: Vec<_> = all.iter().map(|e| e.city.as_str()).collect();
    assert_eq!(cities, vec!["gamma", "beta", "alpha"]);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let h = Harness::new();
    let outcome = h
        .service
        .register(&ctx(), register_req("Stall", "TechU", "Metro", h.avatars(&["a.jpg"]).await))
        .await
        .unwrap();

    let err = h.service.get_entry(&EntryId::new()).await.unwrap_err();
    assert_eq!(MartError::kind_of(&err), ErrorKind::NotFound);

    let err = h
        .service
        .get_listing(&outcome.entry_id, &ListingId::new())
        .await
        .unwrap_err();
    assert_eq!(MartError::kind_of(&err), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_replaces_fields_and_avatars() {
    let h = Harness::new();
    let outcome = h
        .service
        .register(&ctx(), register_req("Stall", "TechU", "Metro", h.avatars(&["old1.jpg", "old2.jpg"]).await))
        .await
        .unwrap();
    let before = h
        .service
        .get_listing(&outcome.entry_id, &outcome.listing_id)
        .await
        .unwrap();

    let req = UpdateListing {
        listing: ListingFields {
            price: "99.5".to_string(),
            category: "Food, PG".to_string(),
            ..fields("Renamed STALL")
        },
        avatars: h.avatars(&["new.jpg"]).await,
    };
    let updated = h
        .service
        .update(&ctx(), &outcome.entry_id, &outcome.listing_id, req)
        .await
        .unwrap();
    h.settle().await;

    assert_eq!(updated.id, before.id);
    assert_eq!(updated.name, "renamed stall");
    assert_eq!(updated.price, 99.5);
    assert_eq!(updated.created_at, before.created_at);
    assert!(updated.updated_at >= before.updated_at);
    assert_eq!(updated.avatars.len(), 1);

    assert!(before.avatars.iter().all(|u| !h.media.contains(u)));
    assert!(h.media.contains(&updated.avatars[0]));

    let stored = h
        .service
        .get_listing(&outcome.entry_id, &outcome.listing_id)
        .await
        .unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn update_with_failed_upload_keeps_listing() {
    let h = Harness::new();
    let outcome = h
        .service
        .register(&ctx(), register_req("Stall", "TechU", "Metro", h.avatars(&["a.jpg"]).await))
        .await
        .unwrap();
    let before = h
        .service
        .get_listing(&outcome.entry_id, &outcome.listing_id)
        .await
        .unwrap();

    h.media.reject_file_name("bad.png");
    let req = UpdateListing {
        listing: fields("Renamed"),
        avatars: h.avatars(&["good.png", "bad.png"]).await,
    };
    let err = h
        .service
        .update(&ctx(), &outcome.entry_id, &outcome.listing_id, req)
        .await
        .unwrap_err();
    h.settle().await;

    assert_eq!(MartError::kind_of(&err), ErrorKind::UploadFailure);
    let after = h
        .service
        .get_listing(&outcome.entry_id, &outcome.listing_id)
        .await
        .unwrap();
    assert_eq!(after, before);
    assert_eq!(h.media.len(), 1);
}

#[tokio::test]
async fn update_of_missing_listing_uploads_nothing() {
    let h = Harness::new();
    let req = UpdateListing {
        listing: fields("Ghost"),
        avatars: h.avatars(&["a.jpg"]).await,
    };
    let err = h
        .service
        .update(&ctx(), &EntryId::new(), &ListingId::new(), req)
        .await
        .unwrap_err();

    assert_eq!(MartError::kind_of(&err), ErrorKind::NotFound);
    assert!(h.media.is_empty());
}

#[tokio::test]
async fn delete_entry_removes_it_and_its_assets() {
    let h = Harness::new();
    let first = h
        .service
        .register(&ctx(), register_req("One", "TechU", "Metro", h.avatars(&["a.jpg", "b.jpg"]).await))
        .await
        .unwrap();
    h.service
        .register(&ctx(), register_req("Two", "TechU", "Metro", h.avatars(&["c.jpg"]).await))
        .await
        .unwrap();

    let receipt = h.service.delete_entry(&ctx(), &first.entry_id).await.unwrap();
    assert_eq!(receipt.listings_removed, 2);
    assert_eq!(receipt.assets_scheduled, 3);
    h.settle().await;

    assert!(h.media.is_empty());
    let err = h.service.get_entry(&first.entry_id).await.unwrap_err();
    assert_eq!(MartError::kind_of(&err), ErrorKind::NotFound);

    let err = h.service.delete_entry(&ctx(), &first.entry_id).await.unwrap_err();
    assert_eq!(MartError::kind_of(&err), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_succeeds_even_when_remote_cleanup_fails() {
    let h = Harness::new();
    let outcome = h
        .service
        .register(&ctx(), register_req("One", "TechU", "Metro", h.avatars(&["a.jpg"]).await))
        .await
        .unwrap();
    let url = h
        .service
        .get_listing(&outcome.entry_id, &outcome.listing_id)
        .await
        .unwrap()
        .avatars[0]
        .clone();

    h.media.fail_next_deletes(10);
    h.service.delete_entry(&ctx(), &outcome.entry_id).await.unwrap();
    h.settle().await;

    let dead = h.service.janitor().dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].url, url);
    assert_eq!(dead[0].attempts, 2);
    assert!(h.media.contains(&url));
}

#[tokio::test]
async fn remove_listing_keeps_the_entry() {
    let h = Harness::new();
    let outcome = h
        .service
        .register(&ctx(), register_req("Only", "TechU", "Metro", h.avatars(&["a.jpg"]).await))
        .await
        .unwrap();

    let removed = h
        .service
        .remove_listing(&ctx(), &outcome.entry_id, &outcome.listing_id)
        .await
        .unwrap();
    h.settle().await;

    assert_eq!(removed.id, outcome.listing_id);
    assert!(h.media.is_empty());
    let entry = h.service.get_entry(&outcome.entry_id).await.unwrap();
    assert!(entry.listings.is_empty());

    let err = h
        .service
        .remove_listing(&ctx(), &outcome.entry_id, &outcome.listing_id)
        .await
        .unwrap_err();
    assert_eq!(MartError::kind_of(&err), ErrorKind::NotFound);
}
