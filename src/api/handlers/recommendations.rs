use axum::{extract::State, Json};

use crate::{
    api::AppState,
    error::AppResult,
    models::{RecommendationSet, UserPreferences},
};

/// Generates recommendations for a one-off preference snapshot
///
/// The response says whether the rule-based fallback was used.
pub async fn recommend(
    State(state): State<AppState>,
    Json(preferences): Json<UserPreferences>,
) -> AppResult<Json<RecommendationSet>> {
    let set = state
        .recommender
        .generate_recommendations(&preferences.sanitized())
        .await?;
    Ok(Json(set))
}
