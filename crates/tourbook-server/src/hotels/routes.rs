//! Cached hotel read endpoints.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tourbook_cache::CacheKey;

use super::source::{HotelPage, HotelQuery};
use crate::error::ApiError;
use crate::server::AppState;

/// `GET /api/hotels` - one listing page, memoized per query shape.
pub async fn list_hotels(
    State(state): State<AppState>,
    query: Result<Query<HotelQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let query = query.normalized();
    let key = query.cache_key();
    let source = Arc::clone(&state.hotels);

    let page: HotelPage = state
        .cache
        .cache_query(key.as_str(), state.config.cache.hotel_list_ttl(), || async {
            source.list(&query).await
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": page.data.len(),
        "total": page.total,
        "page": query.page(),
        "data": page.data,
    })))
}

/// `GET /api/hotels/{id}` - a single hotel, memoized per id.
///
/// Unknown ids are not cached, so a hotel added later shows up immediately.
pub async fn get_hotel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let key = CacheKey::new("hotel").part(&id);
    let source = Arc::clone(&state.hotels);

    let hotel: Value = state
        .cache
        .cache_query(key.as_str(), state.config.cache.hotel_detail_ttl(), || async {
            source
                .get(&id)
                .await?
                .ok_or_else(|| ApiError::hotel_not_found(&id))
        })
        .await?;

    Ok(Json(json!({ "success": true, "data": hotel })))
}

/// `GET /api/locations` - hotel counts per location.
///
/// Computed on every call; the route is wrapped in the response cache.
pub async fn list_locations(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let locations = state.hotels.locations().await?;
    Ok(Json(json!({
        "success": true,
        "count": locations.len(),
        "data": locations,
    })))
}
