use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::{
    config::Config,
    db::PersistentStore,
    error::AppResult,
    middleware::SessionId,
    services::{
        providers::{google_places::GooglePlacesProvider, openai::OpenAiModel},
        ConfiguredPosition, GeolocationProvider, PlaceLookupClient, RecommendationService,
        RetryPolicy,
    },
};

use super::session::{Session, SessionRegistry};

pub const DEFAULT_SEARCH_RADIUS_METERS: u32 = 1500;
pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub places: Arc<PlaceLookupClient>,
    pub recommender: Arc<RecommendationService>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub store: Arc<dyn PersistentStore>,
    pub default_radius_meters: u32,
    pub geolocation_timeout: Duration,
    sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        places: Arc<PlaceLookupClient>,
        recommender: Arc<RecommendationService>,
        geolocation: Arc<dyn GeolocationProvider>,
        store: Arc<dyn PersistentStore>,
    ) -> Self {
        Self {
            places,
            recommender,
            geolocation,
            store,
            default_radius_meters: DEFAULT_SEARCH_RADIUS_METERS,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            sessions: Arc::new(SessionRegistry::new(
                DEFAULT_SESSION_IDLE_TIMEOUT,
                DEFAULT_MAX_SESSIONS,
            )),
        }
    }

    /// Wires the production providers from configuration
    pub fn from_config(config: &Config, store: Arc<dyn PersistentStore>) -> Self {
        let places = PlaceLookupClient::new(
            Arc::new(GooglePlacesProvider::new(
                config.google_maps_api_key.clone(),
                config.places_api_url.clone(),
            )),
            RetryPolicy {
                max_attempts: config.loader_max_attempts,
                interval: config.loader_retry_interval(),
            },
        );
        let recommender = RecommendationService::new(Arc::new(OpenAiModel::new(
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
            config.openai_model.clone(),
        )));
        let geolocation =
            ConfiguredPosition::new(config.default_latitude, config.default_longitude);

        Self::new(
            Arc::new(places),
            Arc::new(recommender),
            Arc::new(geolocation),
            store,
        )
        .with_search_radius(config.default_search_radius_meters)
        .with_geolocation_timeout(config.geolocation_timeout())
        .with_session_limits(config.session_idle_timeout(), config.max_sessions)
    }

    pub fn with_search_radius(mut self, radius_meters: u32) -> Self {
        self.default_radius_meters = radius_meters;
        self
    }

    pub fn with_geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.geolocation_timeout = timeout;
        self
    }

    pub fn with_session_limits(mut self, idle_timeout: Duration, max_sessions: usize) -> Self {
        self.sessions = Arc::new(SessionRegistry::new(idle_timeout, max_sessions));
        self
    }

    /// Returns the session, restoring it from the store on first use
    pub async fn session(&self, id: &SessionId) -> AppResult<Arc<Mutex<Session>>> {
        if let Some(session) = self.sessions.get(id.as_str()).await {
            return Ok(session);
        }

        let restored = Session::restore(self.store.as_ref(), id.as_str()).await?;
        Ok(self.sessions.insert(id.as_str(), restored).await)
    }
}
