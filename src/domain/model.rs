use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 搜尋結果頁 URL，同時作為查詢與淘汰分組的鍵
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A listing as read from the results page, before enrichment.
///
/// `None` is the unknown marker for every optional field; it is never
/// collapsed into an empty string or zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialListing {
    pub title: String,
    pub address: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub price: Option<u64>,
    /// "Added on 01/02/2024" style text, kept as the site shows it.
    #[serde(rename = "date")]
    pub added_or_reduced: Option<String>,
    #[serde(rename = "property_url")]
    pub detail_url: Option<String>,
    #[serde(rename = "search_url_origin")]
    pub query: QueryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedListing {
    #[serde(flatten)]
    pub listing: PartialListing,
    #[serde(rename = "square_footage")]
    pub floor_area: Option<u32>,
}

impl EnrichedListing {
    pub fn new(listing: PartialListing, floor_area: Option<u32>) -> Self {
        Self {
            listing,
            floor_area,
        }
    }
}

/// The document shape written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredListing {
    #[serde(flatten)]
    pub listing: EnrichedListing,
    #[serde(rename = "timestamp")]
    pub ingested_at: DateTime<Utc>,
}

impl StoredListing {
    pub fn query(&self) -> &QueryId {
        &self.listing.listing.query
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchId {
    pub query: QueryId,
    pub ingested_at: DateTime<Utc>,
    pub records: usize,
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({} records)",
            self.query,
            self.ingested_at.to_rfc3339(),
            self.records
        )
    }
}
