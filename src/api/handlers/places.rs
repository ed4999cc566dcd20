use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::AppState,
    error::AppResult,
    models::{Location, Recommendation},
    services::places::{clamp_radius, PlacesCapabilityStatus},
};

const PHOTO_DEFAULT_WIDTH: u32 = 800;

#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    pub location: Location,
    #[serde(default)]
    pub radius_meters: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    pub location: Location,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub insights: String,
}

#[derive(Debug, Deserialize)]
pub struct PhotoQuery {
    #[serde(default)]
    maxwidth: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Tourist attractions around a location, clamped to the provider's radius limit
pub async fn nearby(
    State(state): State<AppState>,
    Json(request): Json<NearbyRequest>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let radius = clamp_radius(request.radius_meters.unwrap_or(state.default_radius_meters));
    let places = state
        .places
        .search_nearby_attractions(&request.location, radius)
        .await?;
    Ok(Json(places))
}

pub async fn insights(
    State(state): State<AppState>,
    Json(request): Json<InsightsRequest>,
) -> AppResult<Json<InsightsResponse>> {
    request.location.validate()?;
    let insights = state.places.get_location_insights(&request.location).await;
    Ok(Json(InsightsResponse { insights }))
}

/// Candidate locations for a free-text query
pub async fn search_locations(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Location>>> {
    let locations = state.places.search_locations(&params.q).await?;
    Ok(Json(locations))
}

/// Streams a place photo fetched server-side
pub async fn photo(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(params): Query<PhotoQuery>,
) -> AppResult<impl IntoResponse> {
    let photo = state
        .places
        .photo(&reference, params.maxwidth.unwrap_or(PHOTO_DEFAULT_WIDTH))
        .await?;
    Ok(([(header::CONTENT_TYPE, photo.content_type)], photo.bytes))
}

pub async fn status(State(state): State<AppState>) -> Json<PlacesCapabilityStatus> {
    Json(state.places.status().await)
}

/// User-triggered reload of the places capability
pub async fn retry(State(state): State<AppState>) -> Json<PlacesCapabilityStatus> {
    Json(state.places.retry_loading().await)
}
