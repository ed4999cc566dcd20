use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Stock image used whenever a source does not supply one
pub const DEFAULT_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1617339860293-978cf33cce43?q=80&w=1000";
pub const DEFAULT_NAME: &str = "Unknown Place";
pub const DEFAULT_LOCATION: &str = "Unknown location";
pub const DEFAULT_RATING: f64 = 4.0;
pub const DEFAULT_DESCRIPTION: &str = "Tourist attraction";
pub const DEFAULT_DURATION: &str = "1-2 hours";
pub const DEFAULT_PRICE: &str = "Varies";
pub const DEFAULT_TAG: &str = "Attraction";

/// Broad category a recommendation belongs to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Food,
    #[default]
    Attraction,
    Activity,
    Entertainment,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::Food => "food",
            RecommendationType::Attraction => "attraction",
            RecommendationType::Activity => "activity",
            RecommendationType::Entertainment => "entertainment",
        }
    }

    /// Case-insensitive lookup of a type name
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "food" => Some(RecommendationType::Food),
            "attraction" => Some(RecommendationType::Attraction),
            "activity" => Some(RecommendationType::Activity),
            "entertainment" => Some(RecommendationType::Entertainment),
            _ => None,
        }
    }

    /// Classifies provider category tags by keyword
    ///
    /// Food keywords win over activity keywords, which win over entertainment.
    pub fn classify<S: AsRef<str>>(categories: &[S]) -> Self {
        let matches_any = |keywords: &[&str]| {
            categories
                .iter()
                .any(|c| keywords.iter().any(|k| c.as_ref().contains(k)))
        };

        if matches_any(&["restaurant", "food", "cafe"]) {
            RecommendationType::Food
        } else if matches_any(&["activity", "park", "trail"]) {
            RecommendationType::Activity
        } else if matches_any(&["theater", "movie", "event"]) {
            RecommendationType::Entertainment
        } else {
            RecommendationType::Attraction
        }
    }
}

impl Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical attraction record shown to users
///
/// Every field is populated. Instances are built by the normalizer and never
/// mutated afterwards; itinerary operations move whole records around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub image: String,
    pub location: String,
    pub rating: f64,
    pub description: String,
    pub duration: String,
    pub price: String,
    pub tags: Vec<String>,
}

/// Output of the recommendation generator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationSet {
    pub recommendations: Vec<Recommendation>,
    /// Set when the rule-based catalog replaced the model output
    pub is_using_fallback: bool,
    /// Why the fallback was used, present only when `is_using_fallback` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl RecommendationSet {
    pub fn generated(recommendations: Vec<Recommendation>) -> Self {
        Self {
            recommendations,
            is_using_fallback: false,
            fallback_reason: None,
        }
    }

    pub fn fallback(recommendations: Vec<Recommendation>, reason: impl Into<String>) -> Self {
        Self {
            recommendations,
            is_using_fallback: true,
            fallback_reason: Some(reason.into()),
        }
    }
}
