use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, discover, itinerary, places, preferences, recommendations};
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware, session_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(session_id_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Places
        .route("/places/nearby", post(places::nearby))
        .route("/places/insights", post(places::insights))
        .route("/places/search", get(places::search_locations))
        .route("/places/photo/:reference", get(places::photo))
        .route("/places/status", get(places::status))
        .route("/places/retry", post(places::retry))
        // Recommendations
        .route("/categories", get(preferences::catalog))
        .route("/recommendations", post(recommendations::recommend))
        .nest("/session", session_routes())
}

/// Per-session routes, keyed by the `x-session-id` header
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/location", put(discover::set_location))
        .route("/locate", post(discover::locate_current))
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::put_preferences),
        )
        .route("/preferences/like/:category", post(preferences::like_category))
        .route("/preferences/dislike/:category", post(preferences::dislike_category))
        .route(
            "/preferences/custom-filters",
            post(preferences::add_custom_filter).delete(preferences::remove_custom_filter),
        )
        .route("/filters", put(preferences::put_filters))
        .route("/discover", get(discover::get_discover))
        .route("/discover/search", post(discover::search))
        .route("/discover/retry", post(discover::retry))
        .route("/discover/regenerate", post(discover::regenerate))
        .route("/itinerary", get(itinerary::get_itinerary))
        .route("/itinerary/items", post(itinerary::add_item))
        .route("/itinerary/items/:id", delete(itinerary::remove_item))
        .route("/itinerary/reorder", post(itinerary::reorder))
        .route("/itinerary/merge", post(itinerary::merge))
}
