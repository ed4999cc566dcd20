use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Location, UserPreferences};

/// Quick-filter toggles plus the single-select icon filter
///
/// `selected` only ever holds active filters: toggling one off removes the
/// key. `likes()` is derived from these two inputs on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub selected: BTreeMap<String, bool>,
    #[serde(default, rename = "iconFilter")]
    pub icon_filter: Option<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a quick filter and returns whether it is now active
    pub fn toggle_filter(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        if self.selected.remove(id).is_some() {
            false
        } else {
            self.selected.insert(id.to_string(), true);
            true
        }
    }

    /// Replaces the whole toggle map, keeping only truthy entries
    pub fn set_filters(&mut self, filters: BTreeMap<String, bool>) {
        self.selected = filters
            .into_iter()
            .filter(|(id, on)| *on && !id.trim().is_empty())
            .map(|(id, on)| (id.trim().to_string(), on))
            .collect();
    }

    /// Selects an icon filter, or clears it with `None` or a blank id
    pub fn set_icon_filter(&mut self, id: Option<&str>) {
        self.icon_filter = id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    /// Active filter ids followed by the icon filter, without duplicates
    pub fn likes(&self) -> Vec<String> {
        let mut likes: Vec<String> = self
            .selected
            .iter()
            .filter(|(_, on)| **on)
            .map(|(id, _)| id.clone())
            .collect();

        if let Some(icon) = &self.icon_filter {
            if !likes.contains(icon) {
                likes.push(icon.clone());
            }
        }

        likes
    }

    /// Preference snapshot built from the filters alone
    pub fn preferences_for(&self, location: Option<Location>) -> UserPreferences {
        UserPreferences {
            location,
            likes: self.likes(),
            dislikes: Vec::new(),
            custom_filters: Vec::new(),
        }
    }
}
