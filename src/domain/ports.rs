use crate::domain::model::{QueryId, StoredListing};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// Turns a URL into fully rendered HTML.
///
/// Implementations dismiss a cookie/consent overlay when one is present and
/// stay silent when it is not.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn find(&self, query: &QueryId, limit: usize) -> Result<Vec<StoredListing>>;
    async fn insert_many(&self, records: Vec<StoredListing>) -> Result<()>;
    async fn count_all(&self) -> Result<u64>;
    async fn group_earliest_timestamp_by_query(&self) -> Result<HashMap<QueryId, DateTime<Utc>>>;
    /// Returns the number of records removed.
    async fn delete_by_query(&self, query: &QueryId) -> Result<u64>;

    /// 關閉前將狀態寫回底層儲存
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub trait ConfigProvider: Send + Sync {
    fn store_connection(&self) -> &str;
    fn capacity_threshold(&self) -> u64;
    fn concurrency(&self) -> usize;
    fn evict_batch_count(&self) -> usize;
    fn render_timeout(&self) -> Duration;
    fn result_limit(&self) -> usize;
    fn base_url(&self) -> Option<&str>;
}
