use crate::{
    models::{Location, PlaceResult, PlacesStatus},
    services::places::{readable_type, PlaceLookupClient},
};

/// Blurb used whenever no insight can be composed
pub fn fallback_insight(location: &Location) -> String {
    format!(
        "{} - Explore this location and discover nearby attractions.",
        location.name
    )
}

impl PlaceLookupClient {
    /// One-paragraph description of a location
    ///
    /// Never fails: an unavailable provider, a failed search or an empty
    /// result all produce the fallback blurb.
    pub async fn get_location_insights(&self, location: &Location) -> String {
        if let Err(e) = self.ensure_ready().await {
            tracing::warn!(error = %e, "Places unavailable for location insights");
            return fallback_insight(location);
        }

        let query = format!("tourist information about {}", location.name);
        match self.provider.text_search(&query, "point_of_interest").await {
            Ok(response) if response.status == PlacesStatus::Ok => response
                .results
                .first()
                .and_then(|first| compose_insight(location, first))
                .unwrap_or_else(|| fallback_insight(location)),
            Ok(response) => {
                tracing::warn!(status = %response.status, "No results for location insights");
                fallback_insight(location)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Location insights search failed");
                fallback_insight(location)
            }
        }
    }
}

/// Builds the insight sentence from the first search result
///
/// Clauses appear in a fixed order and only for fields that are present.
/// Returns `None` when the result has none of them.
fn compose_insight(location: &Location, place: &PlaceResult) -> Option<String> {
    fn present(v: &Option<String>) -> Option<&str> {
        v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    let mut clauses = Vec::new();
    if let Some(address) = present(&place.formatted_address) {
        clauses.push(format!("Located at {}.", address));
    }
    if let Some(rating) = place.rating.filter(|r| r.is_finite()) {
        clauses.push(format!("Average rating {}/5.", rating));
    }
    if !place.types.is_empty() {
        let known_for: Vec<String> = place.types.iter().map(|t| readable_type(t)).collect();
        clauses.push(format!("Known for: {}.", known_for.join(", ")));
    }

    let opening = match present(&place.name) {
        Some(name) => format!("{} is home to {}.", location.name, name),
        None if clauses.is_empty() => return None,
        None => format!("{}.", location.name),
    };

    Some(std::iter::once(opening).chain(clauses).collect::<Vec<_>>().join(" "))
}
