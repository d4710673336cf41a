use std::time::Duration;

use fetchvault_api::app;
use fetchvault_api::config::AppConfig;

#[tokio::main]
async fn main() {
    fetchvault_observability::init();

    let config = AppConfig::from_env();
    tracing::info!(
        bind_addr = %config.bind_addr,
        bucket = %config.object_store_bucket,
        max_delivery_count = config.max_delivery_count,
        worker_concurrency = config.worker_concurrency,
        "starting fetchvault"
    );

    let (services, pool) = app::services::build_services(&config);
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind listen address");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // The ingest side is closed; let in-flight jobs finish their
    // store-write-then-ack sequence before the process exits.
    pool.shutdown(Duration::from_secs(30)).await;
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received; draining");
}
