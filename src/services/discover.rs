use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{Location, Recommendation, RecommendationSet, UserPreferences},
    services::{
        geolocation::GeolocationError, places::PlaceLookupClient,
        recommendations::RecommendationService,
    },
};

/// Everything one search needs, captured when the search starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub location: Location,
    pub radius_meters: u32,
    /// When present, generated recommendations are requested alongside the lookup
    pub preferences: Option<UserPreferences>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub places: Vec<Recommendation>,
    pub insights: String,
    pub recommendations: Option<RecommendationSet>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
            && self
                .recommendations
                .as_ref()
                .map_or(true, |set| set.recommendations.is_empty())
    }
}

/// User-facing description of a failed search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchFailure {
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&AppError> for SearchFailure {
    fn from(error: &AppError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DiscoverState {
    NoLocation,
    LocationPending,
    LocationResolved { location: Location },
    SearchInFlight { seq: u64 },
    ResultsReady { results: SearchResults },
    SearchFailed { failure: SearchFailure },
}

/// Handle for one started search; its response is only applied while the
/// ticket is still the latest
#[derive(Debug, Clone)]
pub struct SearchTicket {
    pub seq: u64,
    pub request: SearchRequest,
}

/// Handle for one geolocation request; its result only applies while no newer
/// location change has happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateTicket(u64);

/// Discover flow state machine
///
/// `NoLocation -> LocationPending -> LocationResolved -> SearchInFlight ->
/// ResultsReady | SearchFailed`. Searches are numbered; only the response for
/// the most recent one is applied.
#[derive(Debug, Clone)]
pub struct DiscoverFlow {
    state: DiscoverState,
    location: Option<Location>,
    last_request: Option<SearchRequest>,
    next_seq: u64,
    latest_seq: Option<u64>,
    /// Bumped on every location change or geolocation request
    location_generation: u64,
}

impl Default for DiscoverFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoverFlow {
    pub fn new() -> Self {
        Self {
            state: DiscoverState::NoLocation,
            location: None,
            last_request: None,
            next_seq: 1,
            latest_seq: None,
            location_generation: 0,
        }
    }

    /// Starts from a previously stored location, if any
    pub fn with_location(location: Option<Location>) -> Self {
        let mut flow = Self::new();
        if let Some(location) = location {
            flow.state = DiscoverState::LocationResolved {
                location: location.clone(),
            };
            flow.location = Some(location);
        }
        flow
    }

    pub fn state(&self) -> &DiscoverState {
        &self.state
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn last_request(&self) -> Option<&SearchRequest> {
        self.last_request.as_ref()
    }

    /// Geolocation has been requested; any in-flight search is abandoned
    pub fn begin_locating(&mut self) -> LocateTicket {
        self.latest_seq = None;
        self.location_generation += 1;
        self.state = DiscoverState::LocationPending;
        LocateTicket(self.location_generation)
    }

    /// Whether a geolocation result for `ticket` may still be applied
    pub fn is_current_locate(&self, ticket: LocateTicket) -> bool {
        ticket.0 == self.location_generation
    }

    /// Geolocation failed; falls back to the previous location if there was one
    ///
    /// Does nothing when the location changed after `ticket` was issued.
    pub fn location_failed(&mut self, ticket: LocateTicket, error: &GeolocationError) {
        tracing::warn!(error = %error, "Geolocation failed");
        if !self.is_current_locate(ticket) {
            return;
        }
        self.state = match &self.location {
            Some(location) => DiscoverState::LocationResolved {
                location: location.clone(),
            },
            None => DiscoverState::NoLocation,
        };
    }

    /// Sets a new location, superseding the previous one
    pub fn resolve_location(&mut self, location: Location) -> AppResult<()> {
        location.validate()?;
        self.latest_seq = None;
        self.location_generation += 1;
        self.location = Some(location.clone());
        self.state = DiscoverState::LocationResolved { location };
        Ok(())
    }

    /// Starts a search around the current location
    ///
    /// Preferences, when given, are pinned to that location and validated
    /// before the flow changes state.
    pub fn begin_search(
        &mut self,
        radius_meters: u32,
        preferences: Option<UserPreferences>,
    ) -> AppResult<SearchTicket> {
        let location = self.location.clone().ok_or(AppError::LocationRequired)?;

        let preferences = match preferences {
            Some(mut prefs) => {
                prefs.location = Some(location.clone());
                prefs.validate()?;
                Some(prefs)
            }
            None => None,
        };

        Ok(self.start(SearchRequest {
            location,
            radius_meters,
            preferences,
        }))
    }

    /// Re-runs the failed search
    pub fn retry(&mut self) -> AppResult<SearchTicket> {
        match (&self.state, &self.last_request) {
            (DiscoverState::SearchFailed { .. }, Some(request)) => {
                let request = request.clone();
                Ok(self.start(request))
            }
            _ => Err(AppError::InvalidTransition(
                "retry is only possible after a failed search".to_string(),
            )),
        }
    }

    /// Runs the last search again with the same preference snapshot
    pub fn regenerate(&mut self) -> AppResult<SearchTicket> {
        match (&self.state, &self.last_request) {
            (DiscoverState::ResultsReady { .. }, Some(request)) => {
                let request = request.clone();
                Ok(self.start(request))
            }
            _ => Err(AppError::InvalidTransition(
                "regenerate is only possible once results are ready".to_string(),
            )),
        }
    }

    fn start(&mut self, request: SearchRequest) -> SearchTicket {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.latest_seq = Some(seq);
        self.last_request = Some(request.clone());
        self.state = DiscoverState::SearchInFlight { seq };
        tracing::debug!(seq, location = %request.location.name, "Search started");
        SearchTicket { seq, request }
    }

    /// Applies a search outcome
    ///
    /// Returns `false` and leaves the state untouched when `seq` is not the
    /// latest search.
    pub fn complete(&mut self, seq: u64, outcome: AppResult<SearchResults>) -> bool {
        if self.latest_seq != Some(seq) {
            tracing::debug!(seq, latest = ?self.latest_seq, "Discarding stale search response");
            return false;
        }
        self.latest_seq = None;

        self.state = match outcome {
            Ok(results) => DiscoverState::ResultsReady { results },
            Err(e) => DiscoverState::SearchFailed {
                failure: SearchFailure::from(&e),
            },
        };
        true
    }

    /// The failure to show the user, if any. An empty result is not a failure.
    pub fn user_error(&self) -> Option<&SearchFailure> {
        match &self.state {
            DiscoverState::SearchFailed { failure } => Some(failure),
            _ => None,
        }
    }

    /// Informational message for a search that found nothing
    pub fn empty_state_message(&self) -> Option<String> {
        match (&self.state, &self.last_request) {
            (DiscoverState::ResultsReady { results }, Some(request)) if results.is_empty() => {
                Some(format!(
                    "No attractions found near {}. Try a larger radius or another location.",
                    request.location.name
                ))
            }
            _ => None,
        }
    }
}

/// Runs one search
///
/// Insights, the nearby lookup and, when preferences are present, generated
/// recommendations run concurrently; the search finishes when all have.
pub async fn run_search(
    places: &PlaceLookupClient,
    recommender: &RecommendationService,
    request: &SearchRequest,
) -> AppResult<SearchResults> {
    let (insights, found, recommendations) = tokio::join!(
        places.get_location_insights(&request.location),
        places.search_nearby_attractions(&request.location, request.radius_meters),
        async {
            match &request.preferences {
                Some(preferences) => Some(recommender.generate_recommendations(preferences).await),
                None => None,
            }
        }
    );

    Ok(SearchResults {
        places: found?,
        insights,
        recommendations: recommendations.transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlaceResult, PlacesSearchResponse, PlacesStatus};
    use crate::services::capability::RetryPolicy;
    use crate::services::providers::{MockPlacesProvider, MockRecommendationModel};
    use std::sync::Arc;
    use std::time::Duration;

    fn paris() -> Location {
        Location::new("Paris", 48.8566, 2.3522).unwrap()
    }

    fn results(places: Vec<Recommendation>) -> SearchResults {
        SearchResults {
            places,
            insights: "Paris".to_string(),
            recommendations: None,
        }
    }

    fn located_flow() -> DiscoverFlow {
        let mut flow = DiscoverFlow::new();
        flow.resolve_location(paris()).unwrap();
        flow
    }

    #[test]
    fn test_search_requires_location() {
        let mut flow = DiscoverFlow::new();
        assert!(matches!(flow.begin_search(1500, None), Err(AppError::LocationRequired)));
        assert_eq!(flow.state(), &DiscoverState::NoLocation);
    }

    #[test]
    fn test_invalid_location_rejected() {
        let mut flow = DiscoverFlow::new();
        let bad = Location {
            name: "Nowhere".to_string(),
            coords: crate::models::Coordinates { lat: 95.0, lng: 0.0 },
        };
        assert!(matches!(flow.resolve_location(bad), Err(AppError::InvalidInput(_))));
        assert!(flow.location().is_none());
    }

    #[test]
    fn test_preferences_validated_before_search() {
        let mut flow = located_flow();
        let result = flow.begin_search(1500, Some(UserPreferences::new()));
        assert!(matches!(result, Err(AppError::PreferencesRequired)));
        assert!(matches!(flow.state(), DiscoverState::LocationResolved { .. }));
    }

    #[test]
    fn test_preferences_pinned_to_location() {
        let mut flow = located_flow();
        let mut prefs = UserPreferences::new();
        prefs.like("museums");

        let ticket = flow.begin_search(1500, Some(prefs)).unwrap();
        let pinned = ticket.request.preferences.unwrap();
        assert_eq!(pinned.location, Some(paris()));
    }

    #[test]
    fn test_zero_results_is_not_an_error() {
        let mut flow = located_flow();
        let ticket = flow.begin_search(1500, None).unwrap();
        assert!(flow.complete(ticket.seq, Ok(results(vec![]))));

        assert!(flow.user_error().is_none());
        assert!(flow.empty_state_message().unwrap().contains("Paris"));
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut flow = located_flow();
        let first = flow.begin_search(1500, None).unwrap();
        let second = flow.begin_search(3000, None).unwrap();
        assert!(second.seq > first.seq);

        assert!(!flow.complete(first.seq, Err(AppError::ProviderError("late".to_string()))));
        assert_eq!(flow.state(), &DiscoverState::SearchInFlight { seq: second.seq });

        assert!(flow.complete(second.seq, Ok(results(vec![]))));
        assert!(!flow.complete(second.seq, Ok(results(vec![]))));
    }

    #[test]
    fn test_new_location_invalidates_search() {
        let mut flow = located_flow();
        let ticket = flow.begin_search(1500, None).unwrap();
        flow.begin_locating();
        assert!(!flow.complete(ticket.seq, Ok(results(vec![]))));
        assert_eq!(flow.state(), &DiscoverState::LocationPending);
    }

    #[test]
    fn test_failed_locating_keeps_previous_location() {
        let mut flow = located_flow();
        let ticket = flow.begin_locating();
        flow.location_failed(ticket, &GeolocationError::Timeout);
        assert_eq!(
            flow.state(),
            &DiscoverState::LocationResolved { location: paris() }
        );

        let mut fresh = DiscoverFlow::new();
        let ticket = fresh.begin_locating();
        fresh.location_failed(ticket, &GeolocationError::PermissionDenied);
        assert_eq!(fresh.state(), &DiscoverState::NoLocation);
    }

    #[test]
    fn test_manual_location_supersedes_pending_geolocation() {
        let mut flow = located_flow();
        let ticket = flow.begin_locating();
        assert!(flow.is_current_locate(ticket));

        let lisbon = Location::new("Lisbon", 38.7223, -9.1393).unwrap();
        flow.resolve_location(lisbon.clone()).unwrap();
        assert!(!flow.is_current_locate(ticket));

        // A late failure leaves the manual choice alone
        flow.location_failed(ticket, &GeolocationError::Timeout);
        assert_eq!(flow.state(), &DiscoverState::LocationResolved { location: lisbon });
    }

    #[test]
    fn test_newer_locate_supersedes_older() {
        let mut flow = DiscoverFlow::new();
        let first = flow.begin_locating();
        let second = flow.begin_locating();
        assert!(!flow.is_current_locate(first));
        assert!(flow.is_current_locate(second));
    }

    #[test]
    fn test_retry_only_after_failure() {
        let mut flow = located_flow();
        assert!(matches!(flow.retry(), Err(AppError::InvalidTransition(_))));

        let ticket = flow.begin_search(2000, None).unwrap();
        flow.complete(
            ticket.seq,
            Err(AppError::ProviderError("Places API Error: UNKNOWN_ERROR".to_string())),
        );
        let failure = flow.user_error().unwrap();
        assert_eq!(failure.kind, "provider_error");
        assert!(failure.retryable);

        let retried = flow.retry().unwrap();
        assert_eq!(retried.request, ticket.request);
        assert_eq!(flow.state(), &DiscoverState::SearchInFlight { seq: retried.seq });
    }

    #[test]
    fn test_regenerate_reuses_preferences() {
        let mut flow = located_flow();
        assert!(matches!(flow.regenerate(), Err(AppError::InvalidTransition(_))));

        let mut prefs = UserPreferences::new();
        prefs.like("parks");
        prefs.dislike("nightlife");
        let ticket = flow.begin_search(1500, Some(prefs)).unwrap();
        flow.complete(ticket.seq, Ok(results(vec![])));

        let again = flow.regenerate().unwrap();
        assert_eq!(again.request.preferences, ticket.request.preferences);
        assert_ne!(again.seq, ticket.seq);
    }

    fn ready_provider() -> MockPlacesProvider {
        let mut provider = MockPlacesProvider::new();
        provider.expect_initialize().returning(|| Ok(()));
        provider.expect_name().return_const("mock");
        provider
    }

    fn client(provider: MockPlacesProvider) -> PlaceLookupClient {
        PlaceLookupClient::new(
            Arc::new(provider),
            RetryPolicy {
                max_attempts: 1,
                interval: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn test_run_search_zero_results() {
        let mut provider = ready_provider();
        provider.expect_nearby_search().returning(|_, _, _| {
            Ok(PlacesSearchResponse {
                status: PlacesStatus::ZeroResults,
                results: vec![],
                error_message: None,
            })
        });
        provider.expect_text_search().returning(|_, _| {
            Ok(PlacesSearchResponse {
                status: PlacesStatus::ZeroResults,
                results: vec![],
                error_message: None,
            })
        });

        let mut model = MockRecommendationModel::new();
        model.expect_complete().never();

        let mut flow = located_flow();
        let ticket = flow.begin_search(1500, None).unwrap();
        let outcome = run_search(
            &client(provider),
            &RecommendationService::new(Arc::new(model)),
            &ticket.request,
        )
        .await;

        let results = outcome.unwrap();
        assert!(results.places.is_empty());
        assert_eq!(
            results.insights,
            "Paris - Explore this location and discover nearby attractions."
        );
        assert!(flow.complete(ticket.seq, Ok(results)));
        assert!(flow.user_error().is_none());
    }

    #[tokio::test]
    async fn test_run_search_with_recommendations() {
        let mut provider = ready_provider();
        provider.expect_nearby_search().returning(|_, _, _| {
            Ok(PlacesSearchResponse {
                status: PlacesStatus::Ok,
                results: vec![PlaceResult {
                    place_id: Some("louvre".to_string()),
                    name: Some("Louvre".to_string()),
                    vicinity: Some("Rue de Rivoli".to_string()),
                    types: vec!["museum".to_string()],
                    ..PlaceResult::default()
                }],
                error_message: None,
            })
        });
        provider.expect_text_search().returning(|_, _| {
            Ok(PlacesSearchResponse {
                status: PlacesStatus::ZeroResults,
                results: vec![],
                error_message: None,
            })
        });

        let mut model = MockRecommendationModel::new();
        model.expect_name().return_const("mock");
        model
            .expect_complete()
            .times(1)
            .returning(|_, _| Err(AppError::UpstreamCall("timeout".to_string())));

        let mut prefs = UserPreferences::new();
        prefs.like("museums");
        let mut flow = located_flow();
        let ticket = flow.begin_search(1500, Some(prefs)).unwrap();

        let results = run_search(
            &client(provider),
            &RecommendationService::new(Arc::new(model)),
            &ticket.request,
        )
        .await
        .unwrap();

        assert_eq!(results.places.len(), 1);
        assert_eq!(results.places[0].id, "louvre");
        let set = results.recommendations.unwrap();
        assert!(set.is_using_fallback);
    }

    #[tokio::test]
    async fn test_run_search_provider_error_propagates() {
        let mut provider = ready_provider();
        provider.expect_nearby_search().returning(|_, _, _| {
            Ok(PlacesSearchResponse {
                status: PlacesStatus::InvalidRequest,
                results: vec![],
                error_message: None,
            })
        });
        provider.expect_text_search().returning(|_, _| {
            Err(AppError::ProviderError("down".to_string()))
        });

        let model = MockRecommendationModel::new();
        let request = SearchRequest {
            location: paris(),
            radius_meters: 1500,
            preferences: None,
        };

        let outcome = run_search(
            &client(provider),
            &RecommendationService::new(Arc::new(model)),
            &request,
        )
        .await;
        assert!(matches!(outcome, Err(AppError::ProviderError(_))));
    }
}
