//! The single boundary where untyped recommendation input becomes a
//! [`Recommendation`]. Place lookups and generated recommendations both pass
//! through here, so nothing downstream ever checks for a missing field.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::models::recommendation::{
    DEFAULT_DESCRIPTION, DEFAULT_DURATION, DEFAULT_IMAGE_URL, DEFAULT_LOCATION, DEFAULT_NAME,
    DEFAULT_PRICE, DEFAULT_RATING, DEFAULT_TAG,
};
use crate::models::{Recommendation, RecommendationType};

/// Normalizes one raw object
///
/// Total over any JSON value: non-objects normalize to an all-defaults record.
pub fn normalize(raw: &Value) -> Recommendation {
    normalize_indexed(raw, "rec", 0)
}

/// Normalizes a batch, generating `source-index-timestamp` ids where missing
pub fn normalize_all(raws: &[Value], source: &str) -> Vec<Recommendation> {
    raws.iter()
        .enumerate()
        .map(|(index, raw)| normalize_indexed(raw, source, index))
        .collect()
}

pub fn normalize_indexed(raw: &Value, source: &str, index: usize) -> Recommendation {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let id = id_field(fields).unwrap_or_else(|| fallback_id(source, index));

    Recommendation {
        id,
        name: text_field(fields, "name").unwrap_or_else(|| DEFAULT_NAME.to_string()),
        kind: text_field(fields, "type")
            .and_then(|t| RecommendationType::parse(&t))
            .unwrap_or_default(),
        image: text_field(fields, "image").unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        location: text_field(fields, "location").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        rating: rating_field(fields).unwrap_or(DEFAULT_RATING),
        description: text_field(fields, "description")
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        duration: text_field(fields, "duration").unwrap_or_else(|| DEFAULT_DURATION.to_string()),
        price: text_field(fields, "price").unwrap_or_else(|| DEFAULT_PRICE.to_string()),
        tags: tags_field(fields).unwrap_or_else(|| vec![DEFAULT_TAG.to_string()]),
    }
}

fn fallback_id(source: &str, index: usize) -> String {
    format!("{}-{}-{}", source, index, Utc::now().timestamp_millis())
}

/// A non-blank string, trimmed
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Ids may arrive as strings or numbers
fn id_field(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        _ => text_field(fields, "id"),
    }
}

/// Ratings may arrive as numbers or numeric strings; non-finite values are dropped
fn rating_field(fields: &Map<String, Value>) -> Option<f64> {
    let rating = match fields.get("rating")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    rating.is_finite().then_some(rating)
}

/// Tags from an array of strings or a comma-separated string
fn tags_field(fields: &Map<String, Value>) -> Option<Vec<String>> {
    let tags: Vec<String> = match fields.get("tags")? {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    (!tags.is_empty()).then_some(tags)
}
