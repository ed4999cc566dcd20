//! External data sources behind the recommendation pipeline
//!
//! Places data and generated text each sit behind a trait; normalization and
//! merge logic never see which vendor answered.

use crate::{
    error::AppResult,
    models::{Coordinates, FindPlaceResponse, PlacePhotoData, PlacesSearchResponse},
};

pub mod google_places;
pub mod openai;

/// Trait for maps/places data providers
///
/// Responses are returned with their provider status intact; deciding what a
/// status means (empty result, hard error) is the caller's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Makes sure the provider can serve requests at all
    ///
    /// Called by the capability loader before the first search.
    async fn initialize(&self) -> AppResult<()>;

    /// Category-filtered search around a point
    async fn nearby_search(
        &self,
        coords: Coordinates,
        radius_meters: u32,
        place_type: &str,
    ) -> AppResult<PlacesSearchResponse>;

    /// Free-text search, optionally restricted to a place type (empty for none)
    async fn text_search(&self, query: &str, place_type: &str) -> AppResult<PlacesSearchResponse>;

    /// Single-candidate lookup, used to probe key validity
    async fn find_place(&self, query: &str) -> AppResult<FindPlaceResponse>;

    /// Downloads the image behind a photo reference
    ///
    /// Credentials stay inside the provider; callers only ever see the bytes.
    async fn fetch_photo(&self, photo_reference: &str, max_width: u32) -> AppResult<PlacePhotoData>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Trait for generative text backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationModel: Send + Sync {
    /// Sends one system + user prompt pair and returns the raw reply text
    ///
    /// Any failure to obtain a reply (transport, quota, non-success status,
    /// missing content) is reported as [`crate::error::AppError::UpstreamCall`].
    async fn complete(&self, system: &str, prompt: &str) -> AppResult<String>;

    fn name(&self) -> &'static str;
}
