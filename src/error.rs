use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::geolocation::GeolocationError;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Location required: set a location before searching or generating recommendations")]
    LocationRequired,

    #[error("Preferences required: select at least one category you like")]
    PreferencesRequired,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Places provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Places provider error: {0}")]
    ProviderError(String),

    #[error("Could not parse recommendations: {0}")]
    RecommendationParse(String),

    #[error("Recommendation backend call failed: {0}")]
    UpstreamCall(String),

    #[error("Geolocation failed: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::LocationRequired => "location_required",
            AppError::PreferencesRequired => "preferences_required",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::ProviderUnavailable(_) => "provider_unavailable",
            AppError::ProviderError(_) => "provider_error",
            AppError::RecommendationParse(_) => "recommendation_parse",
            AppError::UpstreamCall(_) => "upstream_call",
            AppError::Geolocation(_) => "geolocation",
            AppError::NotFound(_) => "not_found",
            AppError::Store(_) => "store",
            AppError::HttpClient(_) => "http_client",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether the caller should offer an explicit retry action
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ProviderUnavailable(_)
            | AppError::ProviderError(_)
            | AppError::RecommendationParse(_)
            | AppError::UpstreamCall(_)
            | AppError::HttpClient(_)
            | AppError::Store(_) => true,
            AppError::Geolocation(e) => !matches!(e, GeolocationError::PermissionDenied),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::LocationRequired
            | AppError::PreferencesRequired
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::Geolocation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProviderError(_)
            | AppError::RecommendationParse(_)
            | AppError::UpstreamCall(_)
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
