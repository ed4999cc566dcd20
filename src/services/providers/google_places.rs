/// Google Places web service provider
///
/// API Flow:
/// 1. Nearby search: /nearbysearch/json → places around a point, filtered by type
/// 2. Text search: /textsearch/json → places matching a free-text query
/// 3. Find place: /findplacefromtext/json → single candidate, used as a key probe
///
/// Photos are fetched server-side from /photo; the key never leaves this provider.
use crate::{
    error::{AppError, AppResult},
    models::{Coordinates, FindPlaceResponse, PlacePhotoData, PlacesSearchResponse},
    services::providers::PlacesProvider,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct GooglePlacesProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl GooglePlacesProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// GETs a Places endpoint and decodes its JSON body
    ///
    /// Only transport and HTTP-level failures are errors here; the Places
    /// `status` field is left for the caller.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}/{}/json", self.api_url, endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                endpoint = %endpoint,
                status = %status,
                body = %body,
                "Places request failed"
            );
            return Err(AppError::ProviderError(format!(
                "Places API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                endpoint = %endpoint,
                "Failed to deserialize Places response"
            );
            AppError::ProviderError(format!("Failed to parse Places response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl PlacesProvider for GooglePlacesProvider {
    async fn initialize(&self) -> AppResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::ProviderUnavailable(
                "Google Maps API key is not configured".to_string(),
            ));
        }

        // Any decodable answer means the endpoint is reachable with this client
        let probe: FindPlaceResponse = self
            .get_json(
                "findplacefromtext",
                &[("input", "test"), ("inputtype", "textquery"), ("fields", "name")],
            )
            .await
            .map_err(|e| AppError::ProviderUnavailable(e.to_string()))?;

        tracing::debug!(status = %probe.status, provider = "google_places", "Places endpoint reachable");
        Ok(())
    }

    async fn nearby_search(
        &self,
        coords: Coordinates,
        radius_meters: u32,
        place_type: &str,
    ) -> AppResult<PlacesSearchResponse> {
        let location = coords.to_string();
        let radius = radius_meters.to_string();

        let response: PlacesSearchResponse = self
            .get_json(
                "nearbysearch",
                &[
                    ("location", location.as_str()),
                    ("radius", radius.as_str()),
                    ("type", place_type),
                ],
            )
            .await?;

        tracing::info!(
            location = %location,
            radius = radius_meters,
            status = %response.status,
            results = response.results.len(),
            provider = "google_places",
            "Nearby search completed"
        );

        Ok(response)
    }

    async fn text_search(&self, query: &str, place_type: &str) -> AppResult<PlacesSearchResponse> {
        let mut params = vec![("query", query)];
        if !place_type.is_empty() {
            params.push(("type", place_type));
        }

        let response: PlacesSearchResponse = self.get_json("textsearch", &params).await?;

        tracing::info!(
            query = %query,
            status = %response.status,
            results = response.results.len(),
            provider = "google_places",
            "Text search completed"
        );

        Ok(response)
    }

    async fn find_place(&self, query: &str) -> AppResult<FindPlaceResponse> {
        self.get_json(
            "findplacefromtext",
            &[("input", query), ("inputtype", "textquery"), ("fields", "name")],
        )
        .await
    }

    async fn fetch_photo(&self, photo_reference: &str, max_width: u32) -> AppResult<PlacePhotoData> {
        let max_width = max_width.to_string();

        // The endpoint redirects to the image host; reqwest follows it
        let response = self
            .http_client
            .get(format!("{}/photo", self.api_url))
            .query(&[
                ("maxwidth", max_width.as_str()),
                ("photo_reference", photo_reference),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::BAD_REQUEST {
            return Err(AppError::NotFound(format!("Photo {}", photo_reference)));
        }
        if !status.is_success() {
            tracing::error!(status = %status, provider = "google_places", "Photo request failed");
            return Err(AppError::ProviderError(format!(
                "Places photo request returned status {}",
                status
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok(PlacePhotoData {
            content_type,
            bytes,
        })
    }

    fn name(&self) -> &'static str {
        "google_places"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider = GooglePlacesProvider::new(
            "test_key".to_string(),
            "http://test.local/place/".to_string(),
        );
        assert_eq!(provider.api_url, "http://test.local/place");
    }

    #[tokio::test]
    async fn test_initialize_requires_key() {
        let provider = GooglePlacesProvider::new("  ".to_string(), "http://test.local".to_string());
        let result = provider.initialize().await;
        assert!(matches!(result, Err(AppError::ProviderUnavailable(_))));
    }
}
