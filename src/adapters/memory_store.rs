use crate::domain::model::{QueryId, StoredListing};
use crate::domain::ports::ListingStore;
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-process store behind `memory://`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredListing>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IngestError::StoreError {
                message: "memory store is unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn find(&self, query: &QueryId, limit: usize) -> Result<Vec<StoredListing>> {
        self.check_available()?;
        Ok(find_in(&self.records.read().await, query, limit))
    }

    async fn insert_many(&self, records: Vec<StoredListing>) -> Result<()> {
        self.check_available()?;
        self.records.write().await.extend(records);
        Ok(())
    }

    async fn count_all(&self) -> Result<u64> {
        self.check_available()?;
        Ok(self.records.read().await.len() as u64)
    }

    async fn group_earliest_timestamp_by_query(&self) -> Result<HashMap<QueryId, DateTime<Utc>>> {
        self.check_available()?;
        Ok(earliest_by_query(&self.records.read().await))
    }

    async fn delete_by_query(&self, query: &QueryId) -> Result<u64> {
        self.check_available()?;
        Ok(remove_query(&mut *self.records.write().await, query))
    }
}

pub(crate) fn find_in(records: &[StoredListing], query: &QueryId, limit: usize) -> Vec<StoredListing> {
    records
        .iter()
        .filter(|record| record.query() == query)
        .take(limit)
        .cloned()
        .collect()
}

pub(crate) fn earliest_by_query(records: &[StoredListing]) -> HashMap<QueryId, DateTime<Utc>> {
    let mut earliest: HashMap<QueryId, DateTime<Utc>> = HashMap::new();
    for record in records {
        earliest
            .entry(record.query().clone())
            .and_modify(|ts| *ts = (*ts).min(record.ingested_at))
            .or_insert(record.ingested_at);
    }
    earliest
}

pub(crate) fn remove_query(records: &mut Vec<StoredListing>, query: &QueryId) -> u64 {
    let before = records.len();
    records.retain(|record| record.query() != query);
    (before - records.len()) as u64
}
