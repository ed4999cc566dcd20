use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Google Maps Platform key used for Places requests
    pub google_maps_api_key: String,

    /// Places web service base URL
    #[serde(default = "default_places_api_url")]
    pub places_api_url: String,

    /// OpenAI API key for generated recommendations
    pub openai_api_key: String,

    /// OpenAI API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Chat model used for generated recommendations
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Redis connection URL; sessions are kept in memory when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Radius used when a nearby search does not name one
    #[serde(default = "default_search_radius_meters")]
    pub default_search_radius_meters: u32,

    /// Attempts made when loading the places capability
    #[serde(default = "default_loader_max_attempts")]
    pub loader_max_attempts: u32,

    /// Pause between capability load attempts
    #[serde(default = "default_loader_retry_interval_ms")]
    pub loader_retry_interval_ms: u64,

    #[serde(default = "default_geolocation_timeout_ms")]
    pub geolocation_timeout_ms: u64,

    /// In-memory sessions unused for this long are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    /// Upper bound on sessions held in memory
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Position reported by the server-side geolocation provider
    #[serde(default)]
    pub default_latitude: Option<f64>,

    #[serde(default)]
    pub default_longitude: Option<f64>,
}

fn default_places_api_url() -> String {
    "https://maps.googleapis.com/maps/api/place".to_string()
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_search_radius_meters() -> u32 {
    1500
}

fn default_loader_max_attempts() -> u32 {
    3
}

fn default_loader_retry_interval_ms() -> u64 {
    500
}

fn default_geolocation_timeout_ms() -> u64 {
    10_000
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

fn default_max_sessions() -> usize {
    10_000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn loader_retry_interval(&self) -> Duration {
        Duration::from_millis(self.loader_retry_interval_ms)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}
