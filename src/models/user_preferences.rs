use serde::{Deserialize, Serialize};

use super::Location;
use crate::error::{AppError, AppResult};

/// An attraction category a user can like or dislike
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
}

/// Categories offered on the preferences screen
pub const CATEGORIES: &[Category] = &[
    Category { id: "museums", name: "Museums" },
    Category { id: "parks", name: "Parks & Nature" },
    Category { id: "restaurants", name: "Food & Drinks" },
    Category { id: "shopping", name: "Shopping" },
    Category { id: "entertainment", name: "Entertainment" },
    Category { id: "historical", name: "Historical Sites" },
    Category { id: "beaches", name: "Beaches" },
    Category { id: "nightlife", name: "Nightlife" },
    Category { id: "sports", name: "Sports" },
    Category { id: "wellness", name: "Spas & Wellness" },
    Category { id: "art", name: "Art Galleries" },
    Category { id: "tours", name: "Tours & Activities" },
];

/// Quick-filter ids that contribute to `likes` on the discover screen
pub const QUICK_FILTERS: &[&str] = &[
    "accessibility",
    "ratings",
    "weatherProof",
    "parking",
    "food",
    "outdoor",
    "adventure",
    "culture",
];

/// What a user wants recommendations for
///
/// `likes` and `dislikes` never share an entry; the toggles enforce it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default, alias = "customFilters")]
    pub custom_filters: Vec<String>,
}

impl UserPreferences {
    /// Creates empty user preferences
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(location: Location) -> Self {
        Self {
            location: Some(location),
            ..Self::default()
        }
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    /// Toggles a liked category, dropping it from dislikes first
    ///
    /// Returns whether the category is liked afterwards.
    pub fn like(&mut self, category: &str) -> bool {
        self.dislikes.retain(|c| c != category);
        toggle(&mut self.likes, category)
    }

    /// Toggles a disliked category, dropping it from likes first
    ///
    /// Returns whether the category is disliked afterwards.
    pub fn dislike(&mut self, category: &str) -> bool {
        self.likes.retain(|c| c != category);
        toggle(&mut self.dislikes, category)
    }

    /// Adds a free-text filter; blank and repeated filters are ignored
    pub fn add_custom_filter(&mut self, filter: &str) -> bool {
        let filter = filter.trim();
        if filter.is_empty() || self.custom_filters.iter().any(|f| f == filter) {
            return false;
        }
        self.custom_filters.push(filter.to_string());
        true
    }

    pub fn remove_custom_filter(&mut self, filter: &str) -> bool {
        let before = self.custom_filters.len();
        self.custom_filters.retain(|f| f != filter.trim());
        before != self.custom_filters.len()
    }

    /// Checks the preconditions for generating recommendations
    ///
    /// Location is checked before likes so the caller sees the first missing step.
    pub fn validate(&self) -> AppResult<&Location> {
        let location = self.location.as_ref().ok_or(AppError::LocationRequired)?;
        location.validate()?;
        if self.likes.is_empty() {
            return Err(AppError::PreferencesRequired);
        }
        Ok(location)
    }

    /// Repairs a snapshot that arrived from outside the toggles
    ///
    /// Duplicates are removed and a category present in both lists stays liked.
    pub fn sanitized(mut self) -> Self {
        dedup_in_place(&mut self.likes);
        dedup_in_place(&mut self.dislikes);
        let likes = self.likes.clone();
        self.dislikes.retain(|c| !likes.contains(c));
        let filters = std::mem::take(&mut self.custom_filters);
        for filter in filters {
            self.add_custom_filter(&filter);
        }
        self
    }
}

fn toggle(list: &mut Vec<String>, category: &str) -> bool {
    if list.iter().any(|c| c == category) {
        list.retain(|c| c != category);
        false
    } else {
        list.push(category.to_string());
        true
    }
}

fn dedup_in_place(list: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    list.retain(|c| seen.insert(c.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(prefs: &UserPreferences) {
        assert!(prefs.likes.iter().all(|c| !prefs.dislikes.contains(c)));
    }

    #[test]
    fn test_new_preferences() {
        let prefs = UserPreferences::new();
        assert!(prefs.location.is_none());
        assert!(prefs.likes.is_empty());
        assert!(prefs.dislikes.is_empty());
    }

    #[test]
    fn test_like_moves_category_out_of_dislikes() {
        let mut prefs = UserPreferences::new();
        prefs.dislike("museums");
        assert!(prefs.like("museums"));
        assert_eq!(prefs.likes, vec!["museums"]);
        assert!(prefs.dislikes.is_empty());
    }

    #[test]
    fn test_dislike_moves_category_out_of_likes() {
        let mut prefs = UserPreferences::new();
        prefs.like("parks");
        assert!(prefs.dislike("parks"));
        assert!(prefs.likes.is_empty());
        assert_eq!(prefs.dislikes, vec!["parks"]);
    }

    #[test]
    fn test_like_twice_toggles_off() {
        let mut prefs = UserPreferences::new();
        prefs.like("art");
        assert!(!prefs.like("art"));
        assert!(prefs.likes.is_empty());
    }

    #[test]
    fn test_lists_stay_disjoint_across_toggles() {
        let mut prefs = UserPreferences::new();
        for category in ["art", "parks", "art", "nightlife", "parks"] {
            prefs.like(category);
            assert_disjoint(&prefs);
            prefs.dislike(category);
            assert_disjoint(&prefs);
        }
    }

    #[test]
    fn test_custom_filters_unique_and_trimmed() {
        let mut prefs = UserPreferences::new();
        assert!(prefs.add_custom_filter("  kid friendly "));
        assert!(!prefs.add_custom_filter("kid friendly"));
        assert!(!prefs.add_custom_filter("   "));
        assert_eq!(prefs.custom_filters, vec!["kid friendly"]);
        assert!(prefs.remove_custom_filter("kid friendly"));
        assert!(!prefs.remove_custom_filter("kid friendly"));
    }

    #[test]
    fn test_validate_requires_location_first() {
        let prefs = UserPreferences::new();
        assert!(matches!(prefs.validate(), Err(AppError::LocationRequired)));
    }

    #[test]
    fn test_validate_requires_likes() {
        let prefs = UserPreferences::with_location(Location::new("Paris", 48.8566, 2.3522).unwrap());
        assert!(matches!(prefs.validate(), Err(AppError::PreferencesRequired)));
    }

    #[test]
    fn test_sanitized_resolves_overlap() {
        let prefs = UserPreferences {
            location: None,
            likes: vec!["art".into(), "art".into(), "parks".into()],
            dislikes: vec!["parks".into(), "nightlife".into()],
            custom_filters: vec!["quiet".into(), " quiet".into()],
        }
        .sanitized();

        assert_eq!(prefs.likes, vec!["art", "parks"]);
        assert_eq!(prefs.dislikes, vec!["nightlife"]);
        assert_eq!(prefs.custom_filters, vec!["quiet"]);
    }

    #[test]
    fn test_custom_filters_accept_camel_case() {
        let json = r#"{"likes": ["art"], "customFilters": ["vegan"]}"#;
        let prefs: UserPreferences = serde_json::from_str(json).unwrap();
        assert_eq!(prefs.custom_filters, vec!["vegan"]);
    }
}
