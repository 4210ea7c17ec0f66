// Adapters layer: concrete renderer and store backends.

pub mod http_renderer;
pub mod json_store;
pub mod memory_store;

use crate::domain::ports::{ConfigProvider, ListingStore};
use crate::utils::error::Result;
use crate::utils::validation::validate_store_connection;
use std::sync::Arc;

/// 依連線字串開啟儲存：`memory://`、`file://<dir>` 或目錄路徑
pub async fn open_store(connection: &str) -> Result<Arc<dyn ListingStore>> {
    validate_store_connection("store", connection)?;

    if connection.starts_with("memory://") {
        tracing::info!("Using in-memory listing store");
        return Ok(Arc::new(memory_store::MemoryStore::new()));
    }

    let path = connection.strip_prefix("file://").unwrap_or(connection);
    let store = json_store::JsonFileStore::open(path).await?;
    Ok(Arc::new(store))
}

/// 使用設定中的連線字串開啟儲存
pub async fn open_configured_store<C: ConfigProvider + ?Sized>(
    config: &C,
) -> Result<Arc<dyn ListingStore>> {
    open_store(config.store_connection()).await
}
