use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        Location, PlacePhotoData, PlaceResult, PlacesStatus, Recommendation, RecommendationType,
    },
    services::{
        capability::{CapabilityLoader, Readiness, RetryPolicy},
        normalize::normalize_indexed,
        providers::PlacesProvider,
    },
};

/// Largest radius the nearby search accepts
pub const MAX_SEARCH_RADIUS_METERS: u32 = 50_000;
const ATTRACTION_TYPE: &str = "tourist_attraction";
const PHOTO_MAX_WIDTH: u32 = 800;
/// Largest photo width the provider serves
pub const PHOTO_WIDTH_LIMIT: u32 = 1600;
/// Public route that serves provider photos without exposing the API key
pub const PHOTO_ROUTE: &str = "/api/v1/places/photo";
const PHOTO_REFERENCE_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');
const LOCATION_SEARCH_LIMIT: usize = 3;

/// Clamps a requested radius into the provider's accepted range
pub fn clamp_radius(radius_meters: u32) -> u32 {
    radius_meters.clamp(1, MAX_SEARCH_RADIUS_METERS)
}

/// Snapshot of the places capability for status reporting
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlacesCapabilityStatus {
    pub loaded: bool,
    /// `None` until a key probe has completed
    pub api_key_valid: Option<bool>,
}

/// Nearby-attraction and location lookups on top of a [`PlacesProvider`]
///
/// Every lookup first makes sure the provider capability is loaded; a
/// capability that cannot be loaded surfaces as `ProviderUnavailable` before
/// any search request is sent.
pub struct PlaceLookupClient {
    pub(crate) provider: Arc<dyn PlacesProvider>,
    loader: CapabilityLoader,
    api_key_valid: RwLock<Option<bool>>,
}

impl PlaceLookupClient {
    pub fn new(provider: Arc<dyn PlacesProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            loader: CapabilityLoader::new(policy),
            api_key_valid: RwLock::new(None),
        }
    }

    /// Loads the capability, reusing a completed or failed load
    pub async fn ensure_ready(&self) -> AppResult<()> {
        let provider = self.provider.clone();
        let readiness = self
            .loader
            .ensure_ready(|| {
                let provider = provider.clone();
                async move { provider.initialize().await }
            })
            .await;
        self.readiness_result(readiness)
    }

    /// Loads the capability again after a failed load
    pub async fn reload(&self) -> AppResult<()> {
        let provider = self.provider.clone();
        let readiness = self
            .loader
            .reload(|| {
                let provider = provider.clone();
                async move { provider.initialize().await }
            })
            .await;
        self.readiness_result(readiness)
    }

    fn readiness_result(&self, readiness: Readiness) -> AppResult<()> {
        match readiness {
            Readiness::Ready => Ok(()),
            Readiness::Unavailable { attempts, reason } => Err(AppError::ProviderUnavailable(
                format!("{} failed to load after {} attempt(s): {}", self.provider.name(), attempts, reason),
            )),
        }
    }

    /// User-triggered reload: loads if needed, then re-probes the key
    pub async fn retry_loading(&self) -> PlacesCapabilityStatus {
        *self.api_key_valid.write().await = None;

        if let Err(e) = self.reload().await {
            tracing::warn!(error = %e, "Places capability retry failed");
            return self.status().await;
        }

        if let Err(e) = self.probe_api_key().await {
            tracing::warn!(error = %e, "API key probe failed");
        }

        self.status().await
    }

    pub async fn status(&self) -> PlacesCapabilityStatus {
        PlacesCapabilityStatus {
            loaded: self.loader.is_ready(),
            api_key_valid: *self.api_key_valid.read().await,
        }
    }

    /// Checks whether the key is restricted or over quota
    ///
    /// Informational only: an invalid key is reported, never raised.
    pub async fn probe_api_key(&self) -> AppResult<bool> {
        let response = self.provider.find_place("test").await?;
        let valid = !response.status.rejects_key();

        if !valid {
            tracing::warn!(
                status = %response.status,
                message = ?response.error_message,
                "API key may have restrictions or exceeded quota"
            );
        }

        *self.api_key_valid.write().await = Some(valid);
        Ok(valid)
    }

    /// Finds tourist attractions around `location`
    ///
    /// `ZERO_RESULTS` is an empty list. Any other non-OK status is an error.
    /// Provider order is preserved and incomplete places are dropped.
    pub async fn search_nearby_attractions(
        &self,
        location: &Location,
        radius_meters: u32,
    ) -> AppResult<Vec<Recommendation>> {
        location.validate()?;
        if radius_meters == 0 || radius_meters > MAX_SEARCH_RADIUS_METERS {
            return Err(AppError::InvalidInput(format!(
                "Search radius must be between 1 and {} meters",
                MAX_SEARCH_RADIUS_METERS
            )));
        }

        self.ensure_ready().await?;

        let response = self
            .provider
            .nearby_search(location.coords, radius_meters, ATTRACTION_TYPE)
            .await?;

        match response.status {
            PlacesStatus::Ok => {}
            PlacesStatus::ZeroResults => {
                tracing::info!(location = %location.name, "No nearby attractions found");
                return Ok(Vec::new());
            }
            status => {
                let message = match response.error_message {
                    Some(detail) => format!("Places API Error: {} ({})", status, detail),
                    None => format!("Places API Error: {}", status),
                };
                tracing::error!(status = %status, location = %location.name, "Nearby search failed");
                return Err(AppError::ProviderError(message));
            }
        }

        let total = response.results.len();
        let recommendations: Vec<Recommendation> = response
            .results
            .iter()
            .filter(|place| is_complete(place))
            .enumerate()
            .map(|(index, place)| normalize_indexed(&self.raw_recommendation(place), "place", index))
            .collect();

        tracing::info!(
            location = %location.name,
            received = total,
            kept = recommendations.len(),
            "Nearby attractions formatted"
        );

        Ok(recommendations)
    }

    /// Looks up candidate locations for a free-text query
    ///
    /// Returns at most three matches; a blank query returns nothing.
    pub async fn search_locations(&self, query: &str) -> AppResult<Vec<Location>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_ready().await?;

        let response = self.provider.text_search(query, "locality").await?;
        match response.status {
            PlacesStatus::Ok => {}
            PlacesStatus::ZeroResults => return Ok(Vec::new()),
            status => {
                return Err(AppError::ProviderError(format!(
                    "Location search failed: {}",
                    status
                )))
            }
        }

        let locations = response
            .results
            .into_iter()
            .filter_map(|place| {
                let coords = place.geometry?.location;
                let name = place
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .or(place.formatted_address)
                    .unwrap_or_else(|| query.to_string());
                let location = Location { name, coords };
                location.validate().ok().map(|_| location)
            })
            .take(LOCATION_SEARCH_LIMIT)
            .collect();

        Ok(locations)
    }

    /// Fetches a photo through the provider, keeping its credentials server-side
    pub async fn photo(&self, photo_reference: &str, max_width: u32) -> AppResult<PlacePhotoData> {
        let photo_reference = photo_reference.trim();
        if photo_reference.is_empty() {
            return Err(AppError::InvalidInput("Photo reference is required".to_string()));
        }

        self.ensure_ready().await?;
        self.provider
            .fetch_photo(photo_reference, max_width.clamp(1, PHOTO_WIDTH_LIMIT))
            .await
    }

    /// Maps a provider place onto the raw recommendation shape
    fn raw_recommendation(&self, place: &PlaceResult) -> Value {
        let image = place
            .photos
            .first()
            .map(|photo| photo_path(&photo.photo_reference, PHOTO_MAX_WIDTH));

        let description = (!place.types.is_empty()).then(|| {
            place
                .types
                .iter()
                .map(|t| readable_type(t))
                .collect::<Vec<_>>()
                .join(", ")
        });

        let tags: Vec<String> = place.types.iter().map(|t| title_case(&readable_type(t))).collect();

        json!({
            "id": place.place_id,
            "name": place.name,
            "type": RecommendationType::classify(&place.types).as_str(),
            "image": image,
            "location": place.vicinity,
            "rating": place.rating,
            "description": description,
            "price": price_tier(place.price_level),
            "tags": tags,
        })
    }
}

/// Client-facing image path for a provider photo reference
pub fn photo_path(photo_reference: &str, max_width: u32) -> String {
    format!(
        "{}/{}?maxwidth={}",
        PHOTO_ROUTE,
        utf8_percent_encode(photo_reference, PHOTO_REFERENCE_ENCODE),
        max_width
    )
}

/// Both a name and a vicinity are required to show a place
fn is_complete(place: &PlaceResult) -> bool {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    present(&place.name) && present(&place.vicinity)
}

/// `$` repeated per price level; level 0 or no level yields `None`
pub(crate) fn price_tier(price_level: Option<u8>) -> Option<String> {
    price_level
        .filter(|level| *level > 0)
        .map(|level| "$".repeat(usize::from(level.min(4))))
}

pub(crate) fn readable_type(place_type: &str) -> String {
    place_type.replace('_', " ")
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FindPlaceResponse, PlacePhoto, PlacesSearchResponse};
    use crate::services::providers::MockPlacesProvider;
    use std::time::Duration;

    fn paris() -> Location {
        Location::new("Paris", 48.8566, 2.3522).unwrap()
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            interval: Duration::from_millis(1),
        }
    }

    fn ready_provider() -> MockPlacesProvider {
        let mut provider = MockPlacesProvider::new();
        provider.expect_initialize().returning(|| Ok(()));
        provider.expect_name().return_const("mock");
        provider
    }

    fn place(id: &str, name: Option<&str>, vicinity: Option<&str>) -> PlaceResult {
        PlaceResult {
            place_id: Some(id.to_string()),
            name: name.map(str::to_string),
            vicinity: vicinity.map(str::to_string),
            ..PlaceResult::default()
        }
    }

    fn search_response(status: PlacesStatus, results: Vec<PlaceResult>) -> PlacesSearchResponse {
        PlacesSearchResponse {
            status,
            results,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_zero_results_is_empty_list() {
        let mut provider = ready_provider();
        provider
            .expect_nearby_search()
            .withf(|_, radius, place_type| *radius == 1500 && place_type == "tourist_attraction")
            .times(1)
            .returning(|_, _, _| Ok(search_response(PlacesStatus::ZeroResults, vec![])));

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let places = client.search_nearby_attractions(&paris(), 1500).await.unwrap();
        assert!(places.is_empty());
    }

    #[tokio::test]
    async fn test_non_ok_status_is_provider_error() {
        let mut provider = ready_provider();
        provider
            .expect_nearby_search()
            .returning(|_, _, _| Ok(search_response(PlacesStatus::OverQueryLimit, vec![])));

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let result = client.search_nearby_attractions(&paris(), 1500).await;

        match result {
            Err(AppError::ProviderError(message)) => assert!(message.contains("OVER_QUERY_LIMIT")),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_before_search() {
        let mut provider = MockPlacesProvider::new();
        provider
            .expect_initialize()
            .times(2)
            .returning(|| Err(AppError::ProviderUnavailable("blocked".to_string())));
        provider.expect_name().return_const("mock");
        provider.expect_nearby_search().never();

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let result = client.search_nearby_attractions(&paris(), 1500).await;
        assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
        assert!(!client.status().await.loaded);

        // Later searches report the same failure without loading again
        let again = client.search_nearby_attractions(&paris(), 1500).await;
        assert!(matches!(again, Err(AppError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_never_reach_provider() {
        let mut provider = MockPlacesProvider::new();
        provider.expect_initialize().never();
        provider.expect_nearby_search().never();

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let bad = Location {
            name: "Beyond the pole".to_string(),
            coords: crate::models::Coordinates { lat: 95.0, lng: 0.0 },
        };

        let result = client.search_nearby_attractions(&bad, 1500).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_radius_over_limit_rejected() {
        let client = PlaceLookupClient::new(Arc::new(MockPlacesProvider::new()), policy());
        let result = client.search_nearby_attractions(&paris(), 60_000).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_places_are_filtered_and_formatted_in_order() {
        let mut provider = ready_provider();
        provider.expect_nearby_search().returning(|_, _, _| {
            let mut louvre = place("louvre", Some("Louvre Museum"), Some("Rue de Rivoli"));
            louvre.rating = Some(4.7);
            louvre.price_level = Some(2);
            louvre.types = vec!["museum".to_string(), "tourist_attraction".to_string()];
            louvre.photos = vec![PlacePhoto {
                photo_reference: "ref-louvre".to_string(),
            }];

            let mut cafe = place("flore", Some("Café de Flore"), Some("172 Bd Saint-Germain"));
            cafe.types = vec!["cafe".to_string()];
            cafe.price_level = Some(0);

            Ok(search_response(
                PlacesStatus::Ok,
                vec![
                    louvre,
                    place("nameless", None, Some("Somewhere")),
                    place("nowhere", Some("No Vicinity"), None),
                    cafe,
                ],
            ))
        });

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let places = client.search_nearby_attractions(&paris(), 1500).await.unwrap();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].id, "louvre");
        assert_eq!(places[0].kind, RecommendationType::Attraction);
        assert_eq!(places[0].price, "$$");
        assert_eq!(places[0].rating, 4.7);
        assert_eq!(places[0].image, "/api/v1/places/photo/ref-louvre?maxwidth=800");
        assert_eq!(places[0].tags, vec!["Museum", "Tourist Attraction"]);
        assert_eq!(places[0].description, "museum, tourist attraction");

        assert_eq!(places[1].id, "flore");
        assert_eq!(places[1].kind, RecommendationType::Food);
        assert_eq!(places[1].price, "Varies");
        assert_eq!(places[1].rating, 4.0);
        assert_eq!(places[1].location, "172 Bd Saint-Germain");
    }

    #[tokio::test]
    async fn test_probe_marks_denied_key_invalid() {
        let mut provider = ready_provider();
        provider.expect_find_place().returning(|_| {
            Ok(FindPlaceResponse {
                status: PlacesStatus::RequestDenied,
                candidates: vec![],
                error_message: Some("The provided API key is invalid.".to_string()),
            })
        });

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let status = client.retry_loading().await;
        assert!(status.loaded);
        assert_eq!(status.api_key_valid, Some(false));
    }

    #[tokio::test]
    async fn test_search_locations_limits_results() {
        let mut provider = ready_provider();
        provider
            .expect_text_search()
            .withf(|query, place_type| query == "Springfield" && place_type == "locality")
            .returning(|_, _| {
                let results = (0..5)
                    .map(|i| PlaceResult {
                        name: Some(format!("Springfield {}", i)),
                        geometry: Some(crate::models::PlaceGeometry {
                            location: crate::models::Coordinates {
                                lat: 39.0 + f64::from(i),
                                lng: -89.0,
                            },
                        }),
                        ..PlaceResult::default()
                    })
                    .collect();
                Ok(search_response(PlacesStatus::Ok, results))
            });

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let locations = client.search_locations(" Springfield ").await.unwrap();
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].name, "Springfield 0");

        assert!(client.search_locations("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_photo_clamps_width_and_rejects_blank_reference() {
        let mut provider = ready_provider();
        provider
            .expect_fetch_photo()
            .withf(|reference, width| reference == "ref-1" && *width == PHOTO_WIDTH_LIMIT)
            .times(1)
            .returning(|_, _| {
                Ok(PlacePhotoData {
                    content_type: "image/png".to_string(),
                    bytes: vec![1, 2, 3],
                })
            });

        let client = PlaceLookupClient::new(Arc::new(provider), policy());
        let photo = client.photo(" ref-1 ", 10_000).await.unwrap();
        assert_eq!(photo.content_type, "image/png");
        assert_eq!(photo.bytes, vec![1, 2, 3]);

        let blank = client.photo("  ", 800).await;
        assert!(matches!(blank, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_photo_path_is_encoded() {
        assert_eq!(photo_path("abc123", 800), "/api/v1/places/photo/abc123?maxwidth=800");
        assert_eq!(photo_path("a/b c", 400), "/api/v1/places/photo/a%2Fb%20c?maxwidth=400");
    }

    #[test]
    fn test_price_tier() {
        assert_eq!(price_tier(None), None);
        assert_eq!(price_tier(Some(0)), None);
        assert_eq!(price_tier(Some(3)).as_deref(), Some("$$$"));
    }

    #[test]
    fn test_clamp_radius() {
        assert_eq!(clamp_radius(0), 1);
        assert_eq!(clamp_radius(30_000), 30_000);
        assert_eq!(clamp_radius(90_000), MAX_SEARCH_RADIUS_METERS);
    }
}
