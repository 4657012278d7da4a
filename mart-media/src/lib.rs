//! # mart-media: seller image storage for campus-mart
//!
//! `mart-media` moves uploaded files from the local temp area to external
//! object storage and hands back durable URLs. It also removes those assets
//! again when the catalog drops the listings that reference them.
//!
//! ## Contract
//!
//! - `upload(path)` returns a durable URL and removes the local file exactly
//!   once, after the remote put succeeded.
//! - `delete(url)` derives the asset id from the URL (last path segment minus
//!   extension) and is idempotent: an absent asset is `DeleteOutcome::NotFound`.
//!
//! ## Quick Start
//!
//! ```rust
//! use mart_media::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> MediaResult<()> {
//! let dir = std::env::temp_dir().join(format!("mart-media-doc-{}", std::process::id()));
//! tokio::fs::create_dir_all(&dir).await?;
//! let path = dir.join("cover.jpg");
//! tokio::fs::write(&path, b"jpeg").await?;
//!
//! let media = MemoryMediaUploader::new(MediaConfig::default());
//! let url = media.upload(&path).await?;
//! assert!(!path.exists());
//!
//! assert_eq!(media.delete(&url).await?, DeleteOutcome::Deleted);
//! assert_eq!(media.delete(&url).await?, DeleteOutcome::NotFound);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backends
//!
//! ```text
//! ┌──────────────────────┐
//! │   CatalogService     │  ← decides what to upload / delete
//! ├──────────────────────┤
//! │ dyn MediaUploader    │  ← this crate's contract
//! ├──────────────┬───────┤
//! │ S3 (aws-sdk) │ memory│
//! └──────────────┴───────┘
//! ```

mod config;
mod error;
mod memory;
mod s3;
mod uploader;

pub use config::MediaConfig;
pub use error::{MediaError, MediaResult};
pub use memory::{MemoryMediaUploader, StoredAsset};
pub use s3::{S3MediaUploader, S3Settings};
pub use uploader::{asset_id_from_url, content_type_for, new_asset_id, DeleteOutcome, MediaUploader};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        DeleteOutcome, MediaConfig, MediaError, MediaResult, MediaUploader, MemoryMediaUploader,
    };
}
