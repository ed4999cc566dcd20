use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

/// Name given to positions that come from the geolocation provider
pub const CURRENT_LOCATION_NAME: &str = "Current Location";

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Creates a coordinate pair, rejecting values outside the valid ranges
    pub fn new(lat: f64, lng: f64) -> AppResult<Self> {
        let coords = Self { lat, lng };
        coords.validate()?;
        Ok(coords)
    }

    /// Checks `lat ∈ [-90, 90]` and `lng ∈ [-180, 180]`; NaN never passes
    pub fn validate(&self) -> AppResult<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::InvalidInput(format!(
                "Latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::InvalidInput(format!(
                "Longitude {} is outside [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// A named point a search is anchored to
///
/// Superseded rather than mutated: each search action carries its own `Location`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub name: String,
    pub coords: Coordinates,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> AppResult<Self> {
        let location = Self {
            name: name.into(),
            coords: Coordinates::new(lat, lng)?,
        };
        location.validate()?;
        Ok(location)
    }

    /// Validates a location that arrived through deserialization
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Location name cannot be empty".to_string(),
            ));
        }
        self.coords.validate()
    }
}
