use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{CatalogEntry, Recommendation};
use crate::services::legacy::DEFAULT_LEGACY_COUNT;

use super::extract::{ApiJson, ApiQuery};
use super::state::SERVICE_NAME;
use super::AppState;

pub const DEFAULT_RECOMMENDATIONS: usize = 5;
pub const MIN_RECOMMENDATIONS: i64 = 1;
pub const MAX_RECOMMENDATIONS: usize = 20;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    #[serde(default = "default_recommendations")]
    pub num_recommendations: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub num_recommendations: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub recommendations: Vec<Recommendation>,
    pub total_count: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub model_loaded: bool,
    pub timestamp: String,
}

fn default_recommendations() -> usize {
    DEFAULT_RECOMMENDATIONS
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Clamps the GET query parameter into 1..=20, defaulting to 5
fn clamp_query_count(requested: Option<i64>) -> usize {
    requested
        .map(|n| n.clamp(MIN_RECOMMENDATIONS, MAX_RECOMMENDATIONS as i64) as usize)
        .unwrap_or(DEFAULT_RECOMMENDATIONS)
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let loaded = state.inner.artifacts.loaded;
    Json(HealthResponse {
        status: if loaded { "healthy" } else { "unhealthy" },
        service: SERVICE_NAME,
        model_loaded: loaded,
        timestamp: now(),
    })
}

/// Metadata about the loaded artifacts
pub async fn model_info(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let artifacts = &state.inner.artifacts;
    if !artifacts.loaded {
        return Err(AppError::ModelNotLoaded);
    }

    Ok(Json(json!({
        "success": true,
        "data": {
            "model_info": artifacts.metadata_section("model_info"),
            "data_statistics": artifacts.metadata_section("data_statistics"),
            "performance_metrics": artifacts.metadata_section("performance_metrics"),
            "service_info": {
                "framework": "axum",
                "model_type": "Collaborative Filtering",
                "integration": "Live catalog + training patterns",
                "mapped_users": artifacts.mapping.user_count(),
                "mapped_podcasts": artifacts.mapping.podcast_count(),
                "legacy_enabled": state.inner.legacy.is_some(),
            },
            "loaded_at": artifacts.loaded_at.to_rfc3339(),
        }
    })))
}

/// Ranked recommendations for the user in the request body
pub async fn create_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ApiJson(request): ApiJson<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let count = request.num_recommendations.min(MAX_RECOMMENDATIONS);
    recommend(&state, &request_id, request.user_id, count).await
}

/// Ranked recommendations for the user in the path
pub async fn get_user_recommendations(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<String>,
    ApiQuery(query): ApiQuery<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let count = clamp_query_count(query.num_recommendations);
    recommend(&state, &request_id, user_id, count).await
}

async fn recommend(
    state: &AppState,
    request_id: &RequestId,
    user_id: String,
    count: usize,
) -> AppResult<Json<RecommendationResponse>> {
    if user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user_id cannot be empty".to_string()));
    }

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        count,
        "Processing recommendation request"
    );

    let recommendations = state.inner.recommendations.recommend(&user_id, count).await?;

    Ok(Json(RecommendationResponse {
        user_id,
        total_count: recommendations.len(),
        recommendations,
        timestamp: now(),
    }))
}

/// Users known to the user service
pub async fn real_users(State(state): State<AppState>) -> Json<Value> {
    let users = state
        .inner
        .user_directory
        .fetch_user_ids()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch users");
            Vec::new()
        });

    Json(json!({
        "success": true,
        "data": {
            "total_count": users.len(),
            "users": users,
            "timestamp": now(),
        }
    }))
}

/// The content service catalog as it stands right now, uncached.
///
/// Upstream fields outside the normalized set are carried through as-is.
pub async fn real_podcasts(State(state): State<AppState>) -> Json<Value> {
    let podcasts = state
        .inner
        .catalog_provider
        .fetch_catalog()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch podcasts");
            Vec::new()
        });

    Json(json!({
        "success": true,
        "data": {
            "total_count": podcasts.len(),
            "podcasts": podcasts,
            "timestamp": now(),
        }
    }))
}

/// Batch-model recommendations as raw catalog records
pub async fn legacy_recommend(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<CatalogEntry>>> {
    let legacy = state
        .inner
        .legacy
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Batch model is not enabled".to_string()))?;

    let records = legacy.recommend(&user_id, DEFAULT_LEGACY_COUNT)?;
    Ok(Json(records))
}
