pub mod batch_enricher;
pub mod capacity;
pub mod enrichment;
pub mod etl;
pub mod extractor;
pub mod persister;

pub use crate::domain::model::{BatchId, EnrichedListing, PartialListing, QueryId, StoredListing};
pub use crate::domain::ports::{ConfigProvider, ListingStore, Renderer};
pub use crate::utils::error::Result;
