use crate::adapters::http;
use crate::adapters::sqlite::SqliteStore;
use crate::core::handler::PatchHandler;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// 依設定建立 handler；沒有資料庫 URL 時回傳未綁定的 handler
pub async fn build_handler<C: ConfigProvider>(config: &C) -> Result<PatchHandler> {
    let Some(url) = config.database_url() else {
        tracing::warn!("⚠️ No database configured; /api/patch will answer 500");
        return Ok(PatchHandler::unbound());
    };

    let store = SqliteStore::connect(url, config.max_connections()).await?;
    if config.bootstrap_schema() {
        store.bootstrap_schema().await?;
    }

    Ok(PatchHandler::new(Arc::new(store)))
}

pub async fn serve<F>(listener: TcpListener, handler: PatchHandler, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("🚀 Listening on http://{}", addr);
    }

    axum::serve(listener, http::router(handler))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Ctrl-C 時結束
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
