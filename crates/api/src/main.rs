use std::net::SocketAddr;

use anyhow::Context;

use wabulk_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wabulk_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.provider.messages_endpoint().is_none() {
        tracing::warn!(
            "WHATSAPP_END_POINT / WHATSAPP_ACCESS_TOKEN not set; sends will be rejected"
        );
    }

    let app = wabulk_api::app::build_app(&config).context("failed to build application")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
