use chrono::Utc;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Location, Recommendation, RecommendationSet, RecommendationType, UserPreferences},
    services::{fallback::fallback_recommendations, normalize::normalize, providers::RecommendationModel},
};

/// Number of recommendations the model is asked for
pub const RECOMMENDATION_COUNT: usize = 5;

const SYSTEM_PROMPT: &str =
    "You are a travel recommendation assistant that formats responses as clean JSON only.";

/// Generates personalized attraction recommendations
///
/// The model is asked for a strict JSON array. If the call itself fails for
/// any reason the rule-based catalog is returned instead, flagged with
/// `is_using_fallback`. A reply that arrives but cannot be parsed is a hard
/// `RecommendationParse` error.
pub struct RecommendationService {
    model: Arc<dyn RecommendationModel>,
}

impl RecommendationService {
    pub fn new(model: Arc<dyn RecommendationModel>) -> Self {
        Self { model }
    }

    pub async fn generate_recommendations(
        &self,
        preferences: &UserPreferences,
    ) -> AppResult<RecommendationSet> {
        // Rejections happen before any network call
        let location = preferences.validate()?;
        let prompt = build_prompt(location, preferences);

        tracing::info!(
            location = %location.name,
            likes = preferences.likes.len(),
            dislikes = preferences.dislikes.len(),
            custom_filters = preferences.custom_filters.len(),
            model = self.model.name(),
            "Generating recommendations"
        );

        let content = match self.model.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "Recommendation model call failed, using fallback catalog");
                let recommendations = fallback_recommendations(location, preferences);
                return Ok(RecommendationSet::fallback(recommendations, e.to_string()));
            }
        };

        let recommendations = parse_recommendations(&content, location).map_err(|e| {
            tracing::error!(error = %e, content = %content, "Unparseable model reply");
            e
        })?;

        tracing::info!(count = recommendations.len(), "Recommendations generated");

        Ok(RecommendationSet::generated(recommendations))
    }
}

/// Builds the user prompt describing the location and preference snapshot
pub fn build_prompt(location: &Location, preferences: &UserPreferences) -> String {
    let list = |items: &[String]| {
        if items.is_empty() {
            "none".to_string()
        } else {
            items.join(", ")
        }
    };

    format!(
        r#"You're an AI travel assistant for a travel app. Generate exactly {count} personalized attraction recommendations near {name} (latitude {lat}, longitude {lng}).

User's preferences:
- Likes: {likes}
- Dislikes: {dislikes}
- Custom filters: {custom}

Avoid anything related to the user's dislikes.

For each recommendation, provide:
1. name
2. type (one of: food, attraction, activity, entertainment)
3. description (2-3 sentences)
4. duration (e.g., "1 hour", "2-3 hours")
5. price (using $ symbols, e.g., "$", "$$", "$$$", or "Free")
6. location (neighborhood or street address)
7. tags (3-5 relevant tags)
8. bestFor (who will enjoy it most)

Format your response as a JSON array with these fields and no additional text:
[
  {{
    "name": "Attraction Name",
    "type": "attraction",
    "description": "Brief description",
    "duration": "1-2 hours",
    "price": "$$",
    "location": "Neighborhood",
    "tags": ["tag1", "tag2", "tag3"],
    "bestFor": "Families"
  }}
]"#,
        count = RECOMMENDATION_COUNT,
        name = location.name,
        lat = location.coords.lat,
        lng = location.coords.lng,
        likes = list(&preferences.likes),
        dislikes = list(&preferences.dislikes),
        custom = list(&preferences.custom_filters),
    )
}

/// Parses a model reply into recommendations
///
/// Accepts a bare array or an object with a `recommendations` array, with or
/// without a surrounding markdown code fence. Ids and images are always
/// synthesized here; whatever the model put in those fields is discarded.
pub fn parse_recommendations(content: &str, location: &Location) -> AppResult<Vec<Recommendation>> {
    let parsed: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AppError::RecommendationParse(format!("reply is not valid JSON: {}", e)))?;

    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("recommendations") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AppError::RecommendationParse(
                    "reply object has no recommendations array".to_string(),
                ))
            }
        },
        _ => {
            return Err(AppError::RecommendationParse(
                "reply is neither an array nor an object".to_string(),
            ))
        }
    };

    if items.is_empty() {
        return Err(AppError::RecommendationParse(
            "reply contained no recommendations".to_string(),
        ));
    }

    let timestamp = Utc::now().timestamp_millis();

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let Value::Object(mut fields) = item else {
                return Err(AppError::RecommendationParse(format!(
                    "recommendation {} is not an object",
                    index
                )));
            };

            fields.insert(
                "id".to_string(),
                Value::String(format!("ai-rec-{}-{}", timestamp, index)),
            );
            fields.remove("image");
            let has_location = fields
                .get("location")
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty());
            if !has_location {
                fields.insert("location".to_string(), Value::String(location.name.clone()));
            }

            let rec = normalize(&Value::Object(fields));
            let image = image_url(&location.name, rec.kind, rec.tags.first().map(String::as_str));
            Ok(Recommendation { image, ..rec })
        })
        .collect()
}

/// Deterministic stock-image URL for a location, type and tag
pub fn image_url(location_name: &str, kind: RecommendationType, tag: Option<&str>) -> String {
    let mut terms = vec![location_name, kind.as_str()];
    if let Some(tag) = tag {
        terms.push(tag);
    }

    let query = terms
        .iter()
        .map(|term| utf8_percent_encode(term.trim(), NON_ALPHANUMERIC).to_string())
        .collect::<Vec<_>>()
        .join(",");

    format!("https://source.unsplash.com/800x600/?{}", query)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
