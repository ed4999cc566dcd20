use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    middleware::SessionId,
    models::{Category, UserPreferences, CATEGORIES, QUICK_FILTERS},
    services::FilterState,
};

#[derive(Debug, Deserialize)]
pub struct PreferencesRequest {
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default, alias = "customFilters")]
    pub custom_filters: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomFilterRequest {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct FiltersRequest {
    #[serde(default)]
    pub selected: BTreeMap<String, bool>,
    #[serde(default, alias = "iconFilter")]
    pub icon_filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FiltersResponse {
    pub filters: FilterState,
    pub likes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub categories: &'static [Category],
    pub quick_filters: &'static [&'static str],
}

/// Categories and quick filters a client can offer
pub async fn catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        categories: CATEGORIES,
        quick_filters: QUICK_FILTERS,
    })
}

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> AppResult<Json<UserPreferences>> {
    let session = state.session(&session_id).await?;
    let session = session.lock().await;
    Ok(Json(session.preferences.clone()))
}

/// Replaces likes, dislikes and custom filters; the location is kept
pub async fn put_preferences(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(request): Json<PreferencesRequest>,
) -> AppResult<Json<UserPreferences>> {
    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;

    session.preferences = UserPreferences {
        location: session.preferences.location.clone(),
        likes: request.likes,
        dislikes: request.dislikes,
        custom_filters: request.custom_filters,
    }
    .sanitized();
    session.persist_preferences(state.store.as_ref()).await?;

    Ok(Json(session.preferences.clone()))
}

pub async fn like_category(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Path(category): Path<String>,
) -> AppResult<Json<UserPreferences>> {
    toggle_category(state, session_id, category, UserPreferences::like).await
}

pub async fn dislike_category(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Path(category): Path<String>,
) -> AppResult<Json<UserPreferences>> {
    toggle_category(state, session_id, category, UserPreferences::dislike).await
}

async fn toggle_category(
    state: AppState,
    session_id: SessionId,
    category: String,
    toggle: fn(&mut UserPreferences, &str) -> bool,
) -> AppResult<Json<UserPreferences>> {
    let category = category.trim();
    if category.is_empty() {
        return Err(AppError::InvalidInput("category must not be empty".to_string()));
    }

    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;
    toggle(&mut session.preferences, category);
    session.persist_preferences(state.store.as_ref()).await?;

    Ok(Json(session.preferences.clone()))
}

pub async fn add_custom_filter(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(request): Json<CustomFilterRequest>,
) -> AppResult<Json<UserPreferences>> {
    if request.filter.trim().is_empty() {
        return Err(AppError::InvalidInput("filter must not be empty".to_string()));
    }

    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;
    if session.preferences.add_custom_filter(&request.filter) {
        session.persist_preferences(state.store.as_ref()).await?;
    }

    Ok(Json(session.preferences.clone()))
}

pub async fn remove_custom_filter(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(request): Json<CustomFilterRequest>,
) -> AppResult<Json<UserPreferences>> {
    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;
    if session.preferences.remove_custom_filter(&request.filter) {
        session.persist_preferences(state.store.as_ref()).await?;
    }

    Ok(Json(session.preferences.clone()))
}

/// Replaces the quick filters and icon filter
pub async fn put_filters(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(request): Json<FiltersRequest>,
) -> AppResult<Json<FiltersResponse>> {
    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;

    session.filters.set_filters(request.selected);
    session.filters.set_icon_filter(request.icon_filter.as_deref());

    Ok(Json(FiltersResponse {
        filters: session.filters.clone(),
        likes: session.filters.likes(),
    }))
}
