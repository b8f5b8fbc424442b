pub mod capability;

use hashbrown::HashMap;
use itemrando_game::Item;
use serde::{Deserialize, Serialize};

/// Collected-item ledger: item name to count.
///
/// Zero counts are never stored, so two multisets holding the same items compare equal
/// regardless of how they were built. `merge`, `diff` and `with_added` return new values and
/// leave the receiver untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMultiset {
    counts: HashMap<String, usize>,
}

impl ItemMultiset {
    pub fn new() -> Self {
        ItemMultiset::default()
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut out = ItemMultiset::new();
        for name in names {
            out.add_name(name.as_ref());
        }
        out
    }

    pub fn from_items(items: &[Item]) -> Self {
        let mut out = ItemMultiset::new();
        for item in items {
            out.add(item);
        }
        out
    }

    pub fn add(&mut self, item: &Item) {
        self.add_name(&item.name);
    }

    pub fn add_name(&mut self, name: &str) {
        self.add_count(name, 1);
    }

    pub fn add_count(&mut self, name: &str, count: usize) {
        if count == 0 {
            return;
        }
        *self.counts.entry(name.to_string()).or_insert(0) += count;
    }

    /// Removes one copy of `name`, returning whether there was one to remove.
    pub fn remove_one(&mut self, name: &str) -> bool {
        match self.counts.get_mut(name) {
            Some(c) if *c > 1 => {
                *c -= 1;
                true
            }
            Some(_) => {
                self.counts.remove(name);
                true
            }
            None => false,
        }
    }

    pub fn with_added(&self, item: &Item) -> ItemMultiset {
        let mut out = self.clone();
        out.add(item);
        out
    }

    pub fn merge(&self, other: &ItemMultiset) -> ItemMultiset {
        let mut out = self.clone();
        for (name, &count) in &other.counts {
            out.add_count(name, count);
        }
        out
    }

    /// Count difference, saturating at zero.
    pub fn diff(&self, other: &ItemMultiset) -> ItemMultiset {
        let mut out = ItemMultiset::new();
        for (name, &count) in &self.counts {
            let remaining = count.saturating_sub(other.count(name));
            out.add_count(name, remaining);
        }
        out
    }

    pub fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn has(&self, name: &str) -> bool {
        self.count(name) >= 1
    }

    pub fn has_count(&self, name: &str, count: usize) -> bool {
        self.count(name) >= count
    }

    /// Total number of items, counting duplicates.
    pub fn len(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn is_subset_of(&self, other: &ItemMultiset) -> bool {
        self.counts
            .iter()
            .all(|(name, &count)| other.count(name) >= count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Names in sorted order, for output that must not depend on hash order.
    pub fn names_sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.counts.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_semantics() {
        let a = ItemMultiset::from_names(&["Hammer", "KeyP1", "KeyP1"]);
        let b = ItemMultiset::from_names(&["KeyP1", "Lamp"]);

        let merged = a.merge(&b);
        assert_eq!(merged.count("KeyP1"), 3);
        assert_eq!(merged.len(), 5);
        assert_eq!(a.count("KeyP1"), 2);
        assert!(!a.has("Lamp"));

        let d = a.diff(&b);
        assert_eq!(d, ItemMultiset::from_names(&["Hammer", "KeyP1"]));
        assert!(b.diff(&merged).is_empty());

        let hammer = Item::new("Hammer", itemrando_game::ItemCategory::Unique);
        let added = b.with_added(&hammer);
        assert!(added.has("Hammer"));
        assert!(!b.has("Hammer"));
    }

    #[test]
    fn zero_counts_are_dropped() {
        let mut a = ItemMultiset::from_names(&["Lamp"]);
        assert!(a.remove_one("Lamp"));
        assert!(!a.remove_one("Lamp"));
        assert_eq!(a, ItemMultiset::new());
        assert!(a.is_subset_of(&ItemMultiset::new()));
    }

    #[test]
    fn unknown_names_read_as_zero() {
        let a = ItemMultiset::new();
        assert_eq!(a.count("Nonexistent"), 0);
        assert!(!a.has_count("Nonexistent", 1));
        assert!(a.has_count("Nonexistent", 0));
    }
}
