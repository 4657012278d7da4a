use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use mart_catalog::{CatalogService, CatalogSettings, CatalogStore, JsonFileCatalogStore, MemoryCatalogStore};
use mart_core::MartConfig;
use mart_media::{MediaConfig, MediaUploader, MemoryMediaUploader, S3MediaUploader};
use serde_json::json;
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::middlewares::multipart::IntakeConfig;
use crate::middlewares::observability;
use crate::rest;
use crate::MartAxumState;

/// The assembled HTTP application: config, shared state and router.
#[derive(Clone)]
pub struct MartApp {
    pub config: MartConfig,
    pub state: MartAxumState,
    pub router: Router<()>,
}

impl MartApp {
    /// Wire routes and layers around an already built catalog.
    pub fn new(mut config: MartConfig, catalog: CatalogService) -> Self {
        apply_defaults(&mut config);
        let intake = IntakeConfig::from_config(&config.snapshot());
        let state = MartAxumState::new(catalog, intake);

        let router = Router::new()
            .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
            .nest("/products", rest::product_router(state.clone()));

        Self {
            config,
            state,
            router: observability::instrument(router),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(str::to_string)
    }

    /// `http.host:http.port`
    pub fn addr(&self) -> String {
        let host = self.get("http.host").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = self.get("http.port").unwrap_or_else(|| "3030".to_string());
        format!("{host}:{port}")
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "campus-mart listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Let scheduled media cleanups finish before the process exits.
        let janitor = self.state.catalog.janitor();
        tracing::info!(pending = janitor.pending(), "draining media cleanup");
        janitor.wait_idle().await;
        Ok(())
    }
}

fn apply_defaults(config: &mut MartConfig) {
    config.set_default("http.host", "127.0.0.1");
    config.set_default("http.port", "3030");
    config.set_default("media.backend", "memory");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

fn media_config(config: &MartConfig) -> MediaConfig {
    let snapshot = config.snapshot();
    let mut media = MediaConfig::default();
    if let Some(url) = snapshot.get_string("media.public_base_url") {
        media = media.with_public_base_url(url);
    }
    if let Some(prefix) = snapshot.get_string("media.key_prefix") {
        media = media.with_key_prefix(prefix);
    }
    if let Some(bytes) = snapshot.get_u64("media.max_asset_bytes") {
        media = media.with_max_asset_bytes(bytes);
    }
    media
}

async fn media_uploader(config: &MartConfig) -> anyhow::Result<Arc<dyn MediaUploader>> {
    let media = media_config(config);
    match config.get("media.backend").unwrap_or("memory") {
        "s3" => Ok(Arc::new(S3MediaUploader::from_env(media).await?)),
        "memory" => Ok(Arc::new(MemoryMediaUploader::new(media))),
        other => anyhow::bail!("unknown media.backend '{other}' (expected 's3' or 'memory')"),
    }
}

async fn catalog_store(config: &MartConfig) -> anyhow::Result<Arc<dyn CatalogStore>> {
    match config.get("store.path") {
        Some(path) => Ok(Arc::new(JsonFileCatalogStore::open(path).await?)),
        None => Ok(Arc::new(MemoryCatalogStore::new())),
    }
}

/// Build the whole application from configuration.
pub async fn build(mut config: MartConfig) -> anyhow::Result<MartApp> {
    apply_defaults(&mut config);

    let media = media_uploader(&config).await?;
    let store = catalog_store(&config).await?;
    let settings = CatalogSettings::from_config(&config.snapshot());

    tracing::info!(
        media = media.backend_name(),
        store = config.get("store.path").unwrap_or("memory"),
        max_avatars = settings.max_avatars,
        "catalog configured"
    );

    let catalog = CatalogService::new(store, media, settings);
    Ok(MartApp::new(config, catalog))
}
