use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    api::{session::Session, AppState},
    error::AppResult,
    middleware::SessionId,
    models::Location,
    services::{
        discover::{SearchFailure, SearchTicket},
        geolocation::locate,
        places::clamp_radius,
        run_search, DiscoverFlow, DiscoverState,
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequestBody {
    #[serde(default)]
    pub radius_meters: Option<u32>,
    /// Also generate recommendations from the session's preferences
    #[serde(default)]
    pub with_recommendations: bool,
}

/// Current discover state as shown to the user
#[derive(Debug, Serialize)]
pub struct DiscoverView {
    pub state: DiscoverState,
    pub location: Option<Location>,
    pub user_error: Option<SearchFailure>,
    pub empty_state_message: Option<String>,
}

impl From<&DiscoverFlow> for DiscoverView {
    fn from(flow: &DiscoverFlow) -> Self {
        Self {
            state: flow.state().clone(),
            location: flow.location().cloned(),
            user_error: flow.user_error().cloned(),
            empty_state_message: flow.empty_state_message(),
        }
    }
}

pub async fn get_discover(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> AppResult<Json<DiscoverView>> {
    let session = state.session(&session_id).await?;
    let session = session.lock().await;
    Ok(Json(DiscoverView::from(&session.flow)))
}

/// Sets a manually chosen location
pub async fn set_location(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    Json(location): Json<Location>,
) -> AppResult<Json<DiscoverView>> {
    let session = state.session(&session_id).await?;
    let mut session = session.lock().await;

    session.set_location(location)?;
    session.persist_location(state.store.as_ref()).await?;
    session.persist_preferences(state.store.as_ref()).await?;

    Ok(Json(DiscoverView::from(&session.flow)))
}

/// Resolves the location from the geolocation provider
///
/// On failure the previous location, if any, stays in place and the
/// geolocation error is returned. A location set while the provider was
/// answering wins over the geolocated one.
pub async fn locate_current(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> AppResult<Json<DiscoverView>> {
    let session = state.session(&session_id).await?;
    let ticket = session.lock().await.flow.begin_locating();

    let located = locate(state.geolocation.as_ref(), state.geolocation_timeout).await;

    let mut session = session.lock().await;
    match located {
        Ok(location) if session.flow.is_current_locate(ticket) => {
            session.set_location(location)?;
            session.persist_location(state.store.as_ref()).await?;
            session.persist_preferences(state.store.as_ref()).await?;
            Ok(Json(DiscoverView::from(&session.flow)))
        }
        Ok(_) => {
            tracing::debug!(session = %session.id, "Geolocation result superseded by a newer location");
            Ok(Json(DiscoverView::from(&session.flow)))
        }
        Err(e) => {
            session.flow.location_failed(ticket, &e);
            Err(e.into())
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
    body: Option<Json<SearchRequestBody>>,
) -> AppResult<Json<DiscoverView>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let session = state.session(&session_id).await?;

    let ticket = {
        let mut session = session.lock().await;
        let radius = clamp_radius(body.radius_meters.unwrap_or(state.default_radius_meters));
        let preferences = body
            .with_recommendations
            .then(|| session.preference_snapshot());
        session.flow.begin_search(radius, preferences)?
    };

    finish_search(&state, &session, ticket).await
}

pub async fn retry(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> AppResult<Json<DiscoverView>> {
    let session = state.session(&session_id).await?;
    let (ticket, reload_places) = {
        let mut session = session.lock().await;
        let reload_places = session
            .flow
            .user_error()
            .is_some_and(|failure| failure.kind == "provider_unavailable");
        (session.flow.retry()?, reload_places)
    };

    // A capability that failed to load only loads again on an explicit retry
    if reload_places {
        if let Err(e) = state.places.reload().await {
            tracing::warn!(error = %e, "Places capability still unavailable");
        }
    }

    finish_search(&state, &session, ticket).await
}

/// Runs the last search again without re-entering preferences
pub async fn regenerate(
    State(state): State<AppState>,
    Extension(session_id): Extension<SessionId>,
) -> AppResult<Json<DiscoverView>> {
    let session = state.session(&session_id).await?;
    let ticket = session.lock().await.flow.regenerate()?;
    finish_search(&state, &session, ticket).await
}

/// Runs the search without holding the session lock, then applies the outcome
/// unless a newer search has started meanwhile
async fn finish_search(
    state: &AppState,
    session: &Mutex<Session>,
    ticket: SearchTicket,
) -> AppResult<Json<DiscoverView>> {
    let outcome = run_search(&state.places, &state.recommender, &ticket.request).await;
    if let Err(e) = &outcome {
        tracing::warn!(seq = ticket.seq, error = %e, "Search failed");
    }

    let mut session = session.lock().await;
    if !session.flow.complete(ticket.seq, outcome) {
        tracing::debug!(seq = ticket.seq, "Search superseded before completing");
    }

    Ok(Json(DiscoverView::from(&session.flow)))
}
