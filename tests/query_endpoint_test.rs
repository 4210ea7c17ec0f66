use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use listing_ingest::adapters::memory_store::MemoryStore;
use listing_ingest::app::server::{router, AppState};
use listing_ingest::core::{EnrichedListing, ListingStore, PartialListing, QueryId, Renderer, StoredListing};
use listing_ingest::{IngestEngine, IngestError, QueryService, Settings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// 每次都回傳沒有物件的頁面
#[derive(Default)]
struct EmptyResultsRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl Renderer for EmptyResultsRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> listing_ingest::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("broken") {
            return Err(IngestError::RenderError {
                url: url.to_string(),
                message: "navigation failed".to_string(),
            });
        }
        Ok("<html><body><p>No properties match</p></body></html>".to_string())
    }
}

fn app(store: Arc<MemoryStore>, renderer: Arc<EmptyResultsRenderer>) -> Result<axum::Router> {
    app_with(store, renderer, Settings::default())
}

fn app_with(
    store: Arc<MemoryStore>,
    renderer: Arc<EmptyResultsRenderer>,
    settings: Settings,
) -> Result<axum::Router> {
    let engine = Arc::new(IngestEngine::new(renderer, store.clone(), &settings)?);
    let queries = Arc::new(QueryService::from_config(store, engine, &settings));
    Ok(router(AppState { queries }))
}

async fn get(app: axum::Router, uri: &str) -> Result<(StatusCode, serde_json::Value)> {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

fn stored(query: &str, price: u64, floor_area: Option<u32>) -> StoredListing {
    StoredListing {
        listing: EnrichedListing::new(
            PartialListing {
                title: "1 High St, 2 bedrooms, 1 bathrooms".to_string(),
                address: Some("1 High St".to_string()),
                bedrooms: Some(2),
                bathrooms: Some(1),
                price: Some(price),
                added_or_reduced: Some("Added on 02/06/2024".to_string()),
                detail_url: Some("https://www.rightmove.co.uk/properties/1".to_string()),
                query: QueryId::new(query),
            },
            floor_area,
        ),
        ingested_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_missing_parameter_is_bad_request() -> Result<()> {
    let renderer = Arc::new(EmptyResultsRenderer::default());
    let app = app(Arc::new(MemoryStore::new()), renderer.clone())?;

    let (status, body) = get(app.clone(), "/api/properties").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "search_url_origin parameter is required");

    let (status, _) = get(app, "/api/properties?search_url_origin=").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_no_data_after_ingestion_is_not_found() -> Result<()> {
    let renderer = Arc::new(EmptyResultsRenderer::default());
    let app = app(Arc::new(MemoryStore::new()), renderer.clone())?;

    let (status, body) = get(app.clone(), "/api/properties?search_url_origin=https%3A%2F%2Fsite.test%2Ffind.html%3Fq%3D1").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No properties found for the given URL");
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    // 擷取失敗同樣回報找不到資料
    let (status, _) = get(app, "/api/properties?search_url_origin=https%3A%2F%2Fbroken.test%2Ffind.html").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_store_unavailable_is_server_error() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set_unavailable(true);
    let app = app(store, Arc::new(EmptyResultsRenderer::default()))?;

    let (status, body) = get(app, "/api/properties?search_url_origin=Q1").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
    Ok(())
}

#[tokio::test]
async fn test_store_hit_is_served_without_ingestion() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_many((0..40).map(|n| stored("Q1", 200_000 + n, Some(800 + n as u32))).collect())
        .await?;
    store.insert_many(vec![stored("Q2", 1, None)]).await?;
    let renderer = Arc::new(EmptyResultsRenderer::default());
    let app = app(store, renderer.clone())?;

    let (status, body) = get(app, "/api/properties?search_url_origin=Q1").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(body["properties"].as_array().unwrap().len(), 37);
    assert_eq!(body["averagePrice"], 200_018);
    assert_eq!(body["avgSquareFootage"], 818);
    assert_eq!(body["sqFtDistribution"], "800-836");
    assert_eq!(body["pricePerSqFt"], 244);
    assert_eq!(body["properties"][0]["sqFt"], 800);
    assert_eq!(body["properties"][0]["date"], "Added on 02/06/2024");
    Ok(())
}

#[tokio::test]
async fn test_result_limit_comes_from_settings() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_many((0..10).map(|n| stored("Q1", 100_000 + n, None)).collect())
        .await?;
    let settings = Settings {
        result_limit: 4,
        ..Settings::default()
    };
    let app = app_with(store, Arc::new(EmptyResultsRenderer::default()), settings)?;

    let (status, body) = get(app, "/api/properties?search_url_origin=Q1").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"].as_array().unwrap().len(), 4);
    assert_eq!(body["averagePrice"], 100_001);
    Ok(())
}
