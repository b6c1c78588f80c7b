use inventory_app::{
    AppState, Config, Store,
    catalog::{CatalogState, CatalogSync, HttpCatalog},
    router,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    let store = Store::open(&config.data_dir).await?;
    info!("data directory {}", config.data_dir.display());

    let catalog = Arc::new(CatalogSync::new(
        HttpCatalog::new(config.catalog_url.clone()),
        store.context(),
        Arc::new(CatalogState::default()),
        config.catalog_mode,
    ));
    let sync_task = config.catalog_enabled.then(|| {
        info!(
            "catalog sync every {}s from {}",
            config.catalog_interval.as_secs(),
            config.catalog_url
        );
        Arc::clone(&catalog).spawn(config.catalog_interval)
    });

    let app = router(AppState::new(store, catalog, config.chart_scale));

    let addr = config.addr();
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    if let Some(task) = sync_task {
        task.cancel().await;
    }
    Ok(())
}
