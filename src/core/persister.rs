use crate::domain::model::{BatchId, EnrichedListing, QueryId, StoredListing};
use crate::domain::ports::ListingStore;
use crate::utils::error::{IngestError, Result};
use chrono::Utc;
use std::sync::Arc;

pub struct BatchPersister {
    store: Arc<dyn ListingStore>,
}

impl BatchPersister {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    /// 整批寫入，所有紀錄共用同一個寫入時間
    pub async fn persist(&self, query: &QueryId, batch: Vec<EnrichedListing>) -> Result<BatchId> {
        let ingested_at = Utc::now();
        let records = batch.len();

        let documents: Vec<StoredListing> = batch
            .into_iter()
            .map(|listing| StoredListing {
                listing,
                ingested_at,
            })
            .collect();

        self.store
            .insert_many(documents)
            .await
            .map_err(|e| IngestError::PersistError {
                message: format!("insert of {} records for {} failed: {}", records, query, e),
            })?;

        let batch_id = BatchId {
            query: query.clone(),
            ingested_at,
            records,
        };
        tracing::info!("💾 Persisted batch {}", batch_id);
        Ok(batch_id)
    }
}
