use std::env;
use std::path::Path;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};

use crate::uploader::{content_type_for, discard_local_file, new_asset_id};
use crate::{asset_id_from_url, DeleteOutcome, MediaConfig, MediaError, MediaResult, MediaUploader};

/// S3 connection settings, read from `MEDIA_S3_*` environment variables
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub bucket: String,
}

impl S3Settings {
    pub fn from_env() -> MediaResult<Self> {
        fn get_env(key: &str) -> MediaResult<String> {
            env::var(key)
                .map_err(|_| MediaError::invalid(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: get_env("MEDIA_S3_REGION")?,
            access_key_id: get_env("MEDIA_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("MEDIA_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: get_env("MEDIA_S3_ENDPOINT_URL")?,
            bucket: env::var("MEDIA_S3_BUCKET").unwrap_or_else(|_| "campus-mart".to_string()),
        })
    }
}

/// Media uploader backed by an S3-compatible object store
#[derive(Clone)]
pub struct S3MediaUploader {
    client: Client,
    bucket: String,
    config: MediaConfig,
}

impl S3MediaUploader {
    pub async fn new(settings: S3Settings, config: MediaConfig) -> Self {
        let bucket = settings.bucket.clone();
        let client = Self::create_client(settings).await;
        Self {
            client,
            bucket,
            config,
        }
    }

    pub async fn from_env(config: MediaConfig) -> MediaResult<Self> {
        let settings = S3Settings::from_env()?;
        Ok(Self::new(settings, config).await)
    }

    async fn create_client(settings: S3Settings) -> Client {
        let credentials = Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "campus-mart",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region))
            .credentials_provider(credentials)
            .endpoint_url(settings.endpoint_url)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true) // MinIO / RustFS style endpoints
                .build(),
        )
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> MediaError {
        MediaError::backend(err)
    }
}

#[async_trait]
impl MediaUploader for S3MediaUploader {
    async fn upload(&self, local_path: &Path) -> MediaResult<String> {
        let size = tokio::fs::metadata(local_path).await?.len();
        if size > self.config.max_asset_bytes {
            return Err(MediaError::invalid(format!(
                "Asset size {} exceeds maximum {}",
                size, self.config.max_asset_bytes
            )));
        }

        let asset_id = new_asset_id();
        let key = self.config.object_key(&asset_id);
        let body = AwsByteStream::from_path(local_path)
            .await
            .map_err(Self::map_aws_error)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type_for(local_path))
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(|err| MediaError::upload_failed(format!("put '{key}': {err}")))?;

        tracing::debug!(bucket = %self.bucket, key = %key, size, "asset uploaded");

        discard_local_file(local_path).await;
        Ok(self.config.public_url(&asset_id))
    }

    async fn delete(&self, url: &str) -> MediaResult<DeleteOutcome> {
        let asset_id = asset_id_from_url(url)
            .ok_or_else(|| MediaError::invalid(format!("No asset id in url '{url}'")))?;
        let key = self.config.object_key(&asset_id);

        // S3 deletes succeed for absent keys, so probe first to report the difference.
        if let Err(err) = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            let missing = err
                .as_service_error()
                .map(|e| e.is_not_found())
                .unwrap_or(false);
            if missing {
                return Ok(DeleteOutcome::NotFound);
            }
            return Err(Self::map_aws_error(err));
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| MediaError::delete_failed(format!("delete '{key}': {err}")))?;

        tracing::debug!(bucket = %self.bucket, key = %key, "asset deleted");
        Ok(DeleteOutcome::Deleted)
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
