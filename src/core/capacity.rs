use crate::domain::model::QueryId;
use crate::domain::ports::ListingStore;
use crate::utils::error::{IngestError, Result};
use std::sync::Arc;

pub const DEFAULT_CAPACITY_THRESHOLD: u64 = 1000;
pub const DEFAULT_EVICT_BATCH_COUNT: usize = 2;

/// Keeps the store near `threshold` records by dropping whole query batches,
/// oldest first.
///
/// A batch's age is the earliest ingestion timestamp among its records. Equal
/// ages are ordered by query identifier. The number of batches removed per
/// pass is fixed and independent of how far over the threshold the store is;
/// the batch that was just written is not exempt.
pub struct CapacityManager {
    store: Arc<dyn ListingStore>,
    threshold: u64,
    evict_batch_count: usize,
}

impl CapacityManager {
    pub fn new(store: Arc<dyn ListingStore>, threshold: u64, evict_batch_count: usize) -> Self {
        Self {
            store,
            threshold,
            evict_batch_count,
        }
    }

    /// 回傳刪除的紀錄數
    pub async fn enforce_capacity(&self) -> Result<u64> {
        let total = self.store.count_all().await.map_err(capacity_error)?;
        tracing::info!("Total listings in store: {}", total);

        if total <= self.threshold {
            tracing::debug!("Store within limit ({} <= {}), no cleanup needed", total, self.threshold);
            return Ok(0);
        }

        tracing::info!(
            "🧹 Store holds {} listings, over the {} limit. Evicting {} oldest batches",
            total,
            self.threshold,
            self.evict_batch_count
        );

        let mut batches: Vec<_> = self
            .store
            .group_earliest_timestamp_by_query()
            .await
            .map_err(capacity_error)?
            .into_iter()
            .collect();
        batches.sort_by(|(a_query, a_ts), (b_query, b_ts)| a_ts.cmp(b_ts).then_with(|| a_query.cmp(b_query)));

        let victims: Vec<QueryId> = batches
            .into_iter()
            .take(self.evict_batch_count)
            .map(|(query, _)| query)
            .collect();

        let mut deleted = 0;
        for query in &victims {
            let removed = self.store.delete_by_query(query).await.map_err(capacity_error)?;
            tracing::info!("🗑️ Deleted {} listings for {}", removed, query);
            deleted += removed;
        }

        tracing::info!("Cleanup completed, {} listings removed", deleted);
        Ok(deleted)
    }
}

fn capacity_error(e: IngestError) -> IngestError {
    IngestError::CapacityError {
        message: e.to_string(),
    }
}
