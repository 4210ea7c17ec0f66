use crate::core::etl::IngestEngine;
use crate::domain::model::{QueryId, StoredListing};
use crate::domain::ports::{ConfigProvider, ListingStore};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_RESULT_LIMIT: usize = 37;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("search_url_origin parameter is required")]
    MissingParameter,

    #[error("No properties found for the given URL")]
    NotFound { query: QueryId },

    #[error("Listing store unavailable: {message}")]
    StoreUnavailable { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySummary {
    pub title: String,
    pub price: Option<u64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    #[serde(rename = "sqFt")]
    pub sq_ft: Option<u32>,
    pub date: Option<String>,
    pub property_url: Option<String>,
}

impl From<StoredListing> for PropertySummary {
    fn from(record: StoredListing) -> Self {
        let floor_area = record.listing.floor_area;
        let listing = record.listing.listing;
        Self {
            title: listing.title,
            price: listing.price,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            sq_ft: floor_area,
            date: listing.added_or_reduced,
            property_url: listing.detail_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesResponse {
    pub properties: Vec<PropertySummary>,
    pub average_price: u64,
    pub avg_square_footage: u64,
    pub price_per_sq_ft: u64,
    pub sq_ft_distribution: String,
}

impl PropertiesResponse {
    /// 平均值皆為整數除法，只計入已知的數值
    pub fn summarize(records: Vec<StoredListing>) -> Self {
        let properties: Vec<PropertySummary> = records.into_iter().map(PropertySummary::from).collect();

        let prices: Vec<u64> = properties.iter().filter_map(|p| p.price).collect();
        let sq_fts: Vec<u64> = properties.iter().filter_map(|p| p.sq_ft.map(u64::from)).collect();

        let average_price = integer_mean(&prices);
        let avg_square_footage = integer_mean(&sq_fts);
        let sq_ft_distribution = match (sq_fts.iter().min(), sq_fts.iter().max()) {
            (Some(min), Some(max)) => format!("{}-{}", min, max),
            _ => "N/A".to_string(),
        };
        let price_per_sq_ft = if avg_square_footage == 0 {
            0
        } else {
            average_price / avg_square_footage
        };

        Self {
            properties,
            average_price,
            avg_square_footage,
            price_per_sq_ft,
            sq_ft_distribution,
        }
    }
}

fn integer_mean(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<u64>() / values.len() as u64
}

/// Serves stored listings for a query, ingesting once on a miss.
pub struct QueryService {
    store: Arc<dyn ListingStore>,
    engine: Arc<IngestEngine>,
    result_limit: usize,
}

impl QueryService {
    pub fn new(store: Arc<dyn ListingStore>, engine: Arc<IngestEngine>, result_limit: usize) -> Self {
        Self {
            store,
            engine,
            result_limit,
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(
        store: Arc<dyn ListingStore>,
        engine: Arc<IngestEngine>,
        config: &C,
    ) -> Self {
        Self::new(store, engine, config.result_limit())
    }

    pub async fn lookup(&self, search_url_origin: Option<&str>) -> Result<PropertiesResponse, QueryError> {
        let raw = search_url_origin
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(QueryError::MissingParameter)?;
        let query = QueryId::new(raw);
        tracing::debug!("Received search_url_origin: {}", query);

        let mut records = self.find(&query).await?;

        if records.is_empty() {
            tracing::info!("No stored properties for {}, running ingestion", query);
            // 擷取失敗視為「沒有資料」，由第二次查詢決定結果
            if let Err(e) = self.engine.run(&query).await {
                tracing::warn!("⚠️ Ingestion for {} produced no data: {}", query, e);
            }

            records = self.find(&query).await?;
            if records.is_empty() {
                return Err(QueryError::NotFound { query });
            }
        }

        Ok(PropertiesResponse::summarize(records))
    }

    async fn find(&self, query: &QueryId) -> Result<Vec<StoredListing>, QueryError> {
        self.store
            .find(query, self.result_limit)
            .await
            .map_err(|e| QueryError::StoreUnavailable {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EnrichedListing, PartialListing};
    use chrono::Utc;

    fn stored(price: Option<u64>, floor_area: Option<u32>) -> StoredListing {
        StoredListing {
            listing: EnrichedListing::new(
                PartialListing {
                    title: "t".to_string(),
                    address: None,
                    bedrooms: None,
                    bathrooms: None,
                    price,
                    added_or_reduced: None,
                    detail_url: None,
                    query: QueryId::new("Q1"),
                },
                floor_area,
            ),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn test_summarize_two_listings_one_floor_area() {
        let response = PropertiesResponse::summarize(vec![
            stored(Some(250_000), Some(850)),
            stored(Some(300_000), None),
        ]);

        assert_eq!(response.properties.len(), 2);
        assert_eq!(response.average_price, 275_000);
        assert_eq!(response.avg_square_footage, 850);
        assert_eq!(response.sq_ft_distribution, "850-850");
        assert_eq!(response.price_per_sq_ft, 323);
    }

    #[test]
    fn test_summarize_without_floor_areas() {
        let response = PropertiesResponse::summarize(vec![stored(Some(200_000), None), stored(None, None)]);

        assert_eq!(response.average_price, 200_000);
        assert_eq!(response.avg_square_footage, 0);
        assert_eq!(response.price_per_sq_ft, 0);
        assert_eq!(response.sq_ft_distribution, "N/A");
    }

    #[test]
    fn test_summarize_range_and_floor_division() {
        let response = PropertiesResponse::summarize(vec![
            stored(Some(100_001), Some(700)),
            stored(Some(100_000), Some(1_201)),
        ]);

        assert_eq!(response.average_price, 100_000);
        assert_eq!(response.avg_square_footage, 950);
        assert_eq!(response.sq_ft_distribution, "700-1201");
        assert_eq!(response.price_per_sq_ft, 105);
    }

    #[test]
    fn test_response_field_names() {
        let value = serde_json::to_value(PropertiesResponse::summarize(vec![stored(Some(1), Some(2))])).unwrap();
        assert!(value.get("averagePrice").is_some());
        assert!(value.get("avgSquareFootage").is_some());
        assert!(value.get("pricePerSqFt").is_some());
        assert!(value.get("sqFtDistribution").is_some());
        assert_eq!(value["properties"][0]["sqFt"], 2);
    }
}
