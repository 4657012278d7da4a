use anyhow::Result;
use mart_core::MartConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = MartConfig::new();
    let overrides = config.load_env("MART__");
    tracing::debug!(overrides, "configuration loaded");

    let app = mart_axum::build(config).await?;
    let addr = app.addr();
    app.listen(addr).await?;

    Ok(())
}
