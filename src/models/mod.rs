use serde::Deserialize;
use std::fmt::Display;

pub mod location;
pub mod recommendation;
pub mod user_preferences;

pub use location::{Coordinates, Location, CURRENT_LOCATION_NAME};
pub use recommendation::{Recommendation, RecommendationSet, RecommendationType};
pub use user_preferences::{Category, UserPreferences, CATEGORIES, QUICK_FILTERS};

// ============================================================================
// Places Web Service Types
// ============================================================================

/// Status field carried by every Places response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacesStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    NotFound,
    UnknownError,
    #[serde(other)]
    Unrecognized,
}

impl PlacesStatus {
    /// Whether the status says the key itself is rejected or exhausted
    pub fn rejects_key(&self) -> bool {
        matches!(self, PlacesStatus::RequestDenied | PlacesStatus::OverQueryLimit)
    }
}

impl Display for PlacesStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            PlacesStatus::Ok => "OK",
            PlacesStatus::ZeroResults => "ZERO_RESULTS",
            PlacesStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            PlacesStatus::RequestDenied => "REQUEST_DENIED",
            PlacesStatus::InvalidRequest => "INVALID_REQUEST",
            PlacesStatus::NotFound => "NOT_FOUND",
            PlacesStatus::UnknownError => "UNKNOWN_ERROR",
            PlacesStatus::Unrecognized => "UNRECOGNIZED",
        };
        f.write_str(status)
    }
}

/// Raw nearby-search / text-search response
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSearchResponse {
    pub status: PlacesStatus,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Raw find-place response, used for the key probe
#[derive(Debug, Clone, Deserialize)]
pub struct FindPlaceResponse {
    pub status: PlacesStatus,
    #[serde(default)]
    pub candidates: Vec<PlaceResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A single provider place; every field may be absent
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PlaceResult {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub photos: Vec<PlacePhoto>,
    #[serde(default)]
    pub geometry: Option<PlaceGeometry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlacePhoto {
    pub photo_reference: String,
}

/// Image bytes fetched for a photo reference
#[derive(Debug, Clone, PartialEq)]
pub struct PlacePhotoData {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaceGeometry {
    pub location: Coordinates,
}
