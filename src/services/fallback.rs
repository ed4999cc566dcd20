use chrono::Utc;
use serde_json::json;

use crate::{
    models::{Location, Recommendation, RecommendationType, UserPreferences},
    services::{
        normalize::normalize_indexed,
        recommendations::{image_url, RECOMMENDATION_COUNT},
    },
};

/// One generic attraction that exists in almost any destination
struct Archetype {
    name: &'static str,
    kind: RecommendationType,
    description: &'static str,
    duration: &'static str,
    price: &'static str,
    rating: f64,
    tags: &'static [&'static str],
}

const CATALOG: &[Archetype] = &[
    Archetype {
        name: "Local History Museum",
        kind: RecommendationType::Attraction,
        description: "Discover the story of {location} through exhibits, artifacts and local archives.",
        duration: "2 hours",
        price: "$",
        rating: 4.5,
        tags: &["Museums", "Historical", "Culture", "Indoor"],
    },
    Archetype {
        name: "City Park & Gardens",
        kind: RecommendationType::Activity,
        description: "Green space in {location} with walking paths, gardens and room to unwind.",
        duration: "1-2 hours",
        price: "Free",
        rating: 4.6,
        tags: &["Parks", "Nature", "Outdoor", "Walking"],
    },
    Archetype {
        name: "Farmers & Artisan Market",
        kind: RecommendationType::Food,
        description: "Sample regional food and browse handmade goods from {location} vendors.",
        duration: "1 hour",
        price: "$$",
        rating: 4.4,
        tags: &["Restaurants", "Shopping", "Food", "Market"],
    },
    Archetype {
        name: "Community Arts Center",
        kind: RecommendationType::Entertainment,
        description: "Galleries, live performances and workshops showcasing artists from {location}.",
        duration: "2 hours",
        price: "$$",
        rating: 4.3,
        tags: &["Art", "Entertainment", "Performances", "Culture"],
    },
    Archetype {
        name: "Adventure Activity Center",
        kind: RecommendationType::Activity,
        description: "Guided tours, climbing and outdoor sports around {location} for all skill levels.",
        duration: "3 hours",
        price: "$$$",
        rating: 4.5,
        tags: &["Sports", "Tours", "Adventure", "Family-Friendly"],
    },
    // Reserves, used only when dislikes remove earlier entries
    Archetype {
        name: "Scenic Viewpoint",
        kind: RecommendationType::Activity,
        description: "Panoramic views over {location}, best around sunset.",
        duration: "1 hour",
        price: "Free",
        rating: 4.6,
        tags: &["Sightseeing", "Outdoor", "Photography"],
    },
    Archetype {
        name: "Historic Old Town Walk",
        kind: RecommendationType::Attraction,
        description: "Stroll the oldest streets of {location} and its landmark squares.",
        duration: "2 hours",
        price: "Free",
        rating: 4.5,
        tags: &["Historical", "Walking", "Architecture"],
    },
    Archetype {
        name: "Wellness Spa Retreat",
        kind: RecommendationType::Activity,
        description: "Thermal baths and treatments for a slower afternoon in {location}.",
        duration: "2-3 hours",
        price: "$$$",
        rating: 4.4,
        tags: &["Wellness", "Relaxation", "Indoor"],
    },
];

/// Rule-based recommendations for when the generative backend is unavailable
///
/// Archetypes whose tags match a dislike are left out and the next reserve
/// takes their place. Archetypes whose tags match a like get an extra sentence
/// saying so. Matching is case-insensitive.
pub fn fallback_recommendations(
    location: &Location,
    preferences: &UserPreferences,
) -> Vec<Recommendation> {
    let lowered = |items: &[String]| -> Vec<String> {
        items.iter().map(|i| i.trim().to_lowercase()).collect()
    };
    let likes = lowered(&preferences.likes);
    let dislikes = lowered(&preferences.dislikes);
    let timestamp = Utc::now().timestamp_millis();

    CATALOG
        .iter()
        .filter(|archetype| {
            !archetype
                .tags
                .iter()
                .any(|tag| dislikes.contains(&tag.to_lowercase()))
        })
        .take(RECOMMENDATION_COUNT)
        .enumerate()
        .map(|(index, archetype)| {
            let liked: Vec<&str> = archetype
                .tags
                .iter()
                .copied()
                .filter(|tag| likes.contains(&tag.to_lowercase()))
                .collect();

            let mut description = archetype.description.replace("{location}", &location.name);
            if !liked.is_empty() {
                description.push_str(&format!(
                    " A good match for your interest in {}.",
                    liked.join(" and ").to_lowercase()
                ));
            }

            let raw = json!({
                "id": format!("fallback-{}-{}", index, timestamp),
                "name": archetype.name,
                "type": archetype.kind.as_str(),
                "image": image_url(&location.name, archetype.kind, archetype.tags.first().copied()),
                "location": location.name,
                "rating": archetype.rating,
                "description": description,
                "duration": archetype.duration,
                "price": archetype.price,
                "tags": archetype.tags,
            });

            normalize_indexed(&raw, "fallback", index)
        })
        .collect()
}
