use crate::adapters::memory_store::{earliest_by_query, find_in, remove_query};
use crate::domain::model::{QueryId, StoredListing};
use crate::domain::ports::ListingStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const DOCUMENT_FILE: &str = "listings.json";

/// Listing collection kept as one JSON document under `base_path`.
///
/// Writes go to a sibling temp file that is renamed over the document, so a
/// crash leaves either the old or the new collection on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<Vec<StoredListing>>,
}

impl JsonFileStore {
    pub async fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref();
        tokio::fs::create_dir_all(base_path).await?;
        let path = base_path.join(DOCUMENT_FILE);

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("📂 Opened listing store {} ({} records)", path.display(), records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_document(&self, records: &[StoredListing]) -> Result<()> {
        let data = serde_json::to_vec(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!("Wrote {} records ({} bytes) to {}", records.len(), data.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ListingStore for JsonFileStore {
    async fn find(&self, query: &QueryId, limit: usize) -> Result<Vec<StoredListing>> {
        Ok(find_in(&self.records.lock().await, query, limit))
    }

    async fn insert_many(&self, records: Vec<StoredListing>) -> Result<()> {
        let mut current = self.records.lock().await;
        let mut next = current.clone();
        next.extend(records);
        // 先寫檔成功才更新記憶體
        self.write_document(&next).await?;
        *current = next;
        Ok(())
    }

    async fn count_all(&self) -> Result<u64> {
        Ok(self.records.lock().await.len() as u64)
    }

    async fn group_earliest_timestamp_by_query(&self) -> Result<HashMap<QueryId, DateTime<Utc>>> {
        Ok(earliest_by_query(&self.records.lock().await))
    }

    async fn delete_by_query(&self, query: &QueryId) -> Result<u64> {
        let mut current = self.records.lock().await;
        let mut next = current.clone();
        let removed = remove_query(&mut next, query);
        if removed > 0 {
            self.write_document(&next).await?;
            *current = next;
        }
        Ok(removed)
    }

    async fn close(&self) -> Result<()> {
        let records = self.records.lock().await;
        self.write_document(&records).await?;
        tracing::info!("Closed listing store {}", self.path.display());
        Ok(())
    }
}
