//! HTTP surface for the query endpoint.

use crate::app::query::{QueryError, QueryService};
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<QueryService>,
}

#[derive(Debug, Deserialize)]
pub struct PropertiesParams {
    pub search_url_origin: Option<String>,
}

pub fn router(state: AppState) -> Router {
    // 前端與 API 分開部署，允許任意來源
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/properties", get(properties_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn properties_handler(
    State(state): State<AppState>,
    Query(params): Query<PropertiesParams>,
) -> Result<Response, QueryError> {
    let response = state.queries.lookup(params.search_url_origin.as_deref()).await?;
    Ok(Json(response).into_response())
}

async fn health_handler() -> &'static str {
    "ok"
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::MissingParameter => StatusCode::BAD_REQUEST,
            QueryError::NotFound { .. } => StatusCode::NOT_FOUND,
            QueryError::StoreUnavailable { message } => {
                tracing::error!("❌ Store unavailable while serving query: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
