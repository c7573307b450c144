use std::sync::Arc;

use anyhow::Context;

use stockroom_infra::{AppConfig, InMemoryStore, PgStore, Store, seed_admin};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections)
                .await
                .context("failed to connect to postgres")?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        None => Arc::new(InMemoryStore::new()),
    };

    if let Some(admin) = seed_admin(store.as_ref(), &config)
        .await
        .context("failed to seed admin account")?
    {
        tracing::info!(employee_id = %admin.id, email = %admin.email, "seeded admin account");
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;

    let bind_addr = config.bind_addr;
    let app = stockroom_api::app::build_app(config, store);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
