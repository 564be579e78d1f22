use anyhow::Context as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vibe_observability::init();

    let config = vibe_api::config::Config::from_env().context("loading configuration")?;
    if config.instance_did.is_none() {
        tracing::warn!("no instance identity bound; authenticated routes will fail closed (503)");
    }

    let bind_addr = config.bind_addr;
    let app = vibe_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
