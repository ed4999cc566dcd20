use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{Coordinates, Location, CURRENT_LOCATION_NAME};

/// A fix reported by the platform geolocation capability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Location access was denied")]
    PermissionDenied,

    #[error("Location information is unavailable")]
    PositionUnavailable,

    #[error("Location request timed out")]
    Timeout,
}

/// Source of the device's current position
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Position, GeolocationError>;
}

/// Acquires the current position as a search location
///
/// The provider gets at most `timeout` to answer. A fix outside the valid
/// coordinate ranges is reported as unavailable rather than forwarded.
pub async fn locate(
    provider: &dyn GeolocationProvider,
    timeout: Duration,
) -> Result<Location, GeolocationError> {
    let position = match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Geolocation timed out");
            return Err(GeolocationError::Timeout);
        }
    };

    let coords = Coordinates::new(position.latitude, position.longitude).map_err(|e| {
        tracing::warn!(error = %e, "Geolocation returned an invalid position");
        GeolocationError::PositionUnavailable
    })?;

    tracing::debug!(
        lat = coords.lat,
        lng = coords.lng,
        accuracy = position.accuracy,
        "Position acquired"
    );

    Ok(Location {
        name: CURRENT_LOCATION_NAME.to_string(),
        coords,
    })
}

/// Server-side provider answering with a configured position
pub struct ConfiguredPosition {
    coords: Option<Coordinates>,
}

impl ConfiguredPosition {
    pub fn new(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        let coords = match (latitude, longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        };
        Self { coords }
    }
}

#[async_trait::async_trait]
impl GeolocationProvider for ConfiguredPosition {
    async fn current_position(&self) -> Result<Position, GeolocationError> {
        let coords = self.coords.ok_or(GeolocationError::PositionUnavailable)?;
        Ok(Position {
            latitude: coords.lat,
            longitude: coords.lng,
            accuracy: 0.0,
            timestamp: Utc::now(),
        })
    }
}
