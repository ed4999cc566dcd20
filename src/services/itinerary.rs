use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::Recommendation,
};

/// User-curated ordered list of recommendations, unique by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Itinerary {
    items: Vec<Recommendation>,
}

impl Itinerary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an itinerary from a stored list, dropping repeated ids
    pub fn from_items(items: Vec<Recommendation>) -> Self {
        let mut itinerary = Self::new();
        itinerary.merge_new_places(items);
        itinerary
    }

    pub fn items(&self) -> &[Recommendation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Appends an item unless its id is already present
    ///
    /// Returns `true` when the item was added.
    pub fn add(&mut self, item: Recommendation) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Removes every item with the given id, returning whether any was removed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Moves the item at `from` so it ends up at position `to`
    pub fn reorder(&mut self, from: usize, to: usize) -> AppResult<()> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(AppError::InvalidInput(format!(
                "reorder positions {} -> {} out of range for {} items",
                from, to, len
            )));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Appends found places whose ids are not already present
    ///
    /// Existing items keep their order. Returns the number of places added.
    pub fn merge_new_places(&mut self, found: impl IntoIterator<Item = Recommendation>) -> usize {
        let mut seen: HashSet<String> = self.items.iter().map(|item| item.id.clone()).collect();
        let before = self.items.len();

        for place in found {
            if seen.insert(place.id.clone()) {
                self.items.push(place);
            }
        }

        self.items.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::normalize::normalize;
    use serde_json::json;

    fn rec(id: &str) -> Recommendation {
        normalize(&json!({ "id": id, "name": format!("Place {}", id) }))
    }

    fn ids(itinerary: &Itinerary) -> Vec<&str> {
        itinerary.items().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut itinerary = Itinerary::new();
        assert!(itinerary.add(rec("abc")));
        assert!(!itinerary.add(rec("abc")));
        assert_eq!(itinerary.len(), 1);
    }

    #[test]
    fn test_remove_by_id() {
        let mut itinerary = Itinerary::from_items(vec![rec("a"), rec("b"), rec("c")]);
        assert!(itinerary.remove("b"));
        assert!(!itinerary.remove("missing"));
        assert_eq!(ids(&itinerary), vec!["a", "c"]);
    }

    #[test]
    fn test_reorder_moves_item() {
        let mut itinerary = Itinerary::from_items(vec![rec("a"), rec("b"), rec("c"), rec("d")]);
        itinerary.reorder(0, 2).unwrap();
        assert_eq!(ids(&itinerary), vec!["b", "c", "a", "d"]);

        itinerary.reorder(3, 0).unwrap();
        assert_eq!(ids(&itinerary), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_reorder_out_of_range() {
        let mut itinerary = Itinerary::from_items(vec![rec("a")]);
        assert!(matches!(itinerary.reorder(0, 1), Err(AppError::InvalidInput(_))));
        assert!(matches!(Itinerary::new().reorder(0, 0), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_reorder_is_permutation() {
        let original: Vec<String> = (0..6).map(|i| i.to_string()).collect();
        for from in 0..6 {
            for to in 0..6 {
                let mut itinerary =
                    Itinerary::from_items(original.iter().map(|id| rec(id)).collect());
                itinerary.reorder(from, to).unwrap();

                let mut after: Vec<&str> = ids(&itinerary);
                assert_eq!(after[to], original[from]);
                after.sort_unstable();
                assert_eq!(after, original.iter().map(String::as_str).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_merge_keeps_existing_order() {
        let mut itinerary = Itinerary::from_items(vec![rec("x"), rec("a"), rec("m")]);
        let added = itinerary.merge_new_places(vec![rec("a"), rec("z"), rec("x"), rec("b"), rec("z")]);

        assert_eq!(added, 2);
        assert_eq!(ids(&itinerary), vec!["x", "a", "m", "z", "b"]);
    }

    #[test]
    fn test_from_items_drops_duplicates() {
        let itinerary = Itinerary::from_items(vec![rec("a"), rec("a"), rec("b")]);
        assert_eq!(ids(&itinerary), vec!["a", "b"]);
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let itinerary = Itinerary::from_items(vec![rec("a")]);
        let value = serde_json::to_value(&itinerary).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["id"], "a");

        let back: Itinerary = serde_json::from_value(value).unwrap();
        assert_eq!(back, itinerary);
    }
}
