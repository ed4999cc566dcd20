use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::AppState,
    error::AppResult,
    middleware::SessionId,
    services::{
        normalize::{normalize_all, normalize_indexed},
        Itinerary,
    },
};

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub places: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ItineraryUpdate {
    pub added: usize,
    pub itinerary: Itinerary,
}

pub async fn get_itinerary(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> AppResult<Json<Itinerary>> {
    let session = state.session(&session_id).await?;
    let session = session.lock().await;
    Ok(Json(session.itinerary.clone()))
}

/// Adds one item; adding an id that is already present changes nothing
pub async fn add_item(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(raw): Json<Value>,
) -> AppResult<Json<ItineraryUpdate>> {
    let item = normalize_indexed(&raw, "item", 0);

    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;
    let added = session.itinerary.add(item);
    if added {
        session.persist_itinerary(state.store.as_ref()).await?;
    }

    Ok(Json(ItineraryUpdate {
        added: usize::from(added),
        itinerary: session.itinerary.clone(),
    }))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Path(id): Path<String>,
) -> AppResult<Json<Itinerary>> {
    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;
    if session.itinerary.remove(&id) {
        session.persist_itinerary(state.store.as_ref()).await?;
    }

    Ok(Json(session.itinerary.clone()))
}

pub async fn reorder(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(request): Json<ReorderRequest>,
) -> AppResult<Json<Itinerary>> {
    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;
    session.itinerary.reorder(request.from, request.to)?;
    session.persist_itinerary(state.store.as_ref()).await?;

    Ok(Json(session.itinerary.clone()))
}

/// Appends found places that are not in the itinerary yet
pub async fn merge(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(request): Json<MergeRequest>,
) -> AppResult<Json<ItineraryUpdate>> {
    let found = normalize_all(&request.places, "place");

    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;
    let added = session.itinerary.merge_new_places(found);
    if added > 0 {
        session.persist_itinerary(state.store.as_ref()).await?;
    }

    Ok(Json(ItineraryUpdate {
        added,
        itinerary: session.itinerary.clone(),
    }))
}
