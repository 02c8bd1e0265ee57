//! Shared item pool and signed per-tick item deltas.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type ItemId = String;

/// Party-wide inventory shared by every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub items: BTreeMap<ItemId, i64>,
    #[serde(default)]
    pub discovered_item_ids: BTreeSet<ItemId>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style stock setter.
    pub fn with_item(mut self, item_id: &str, quantity: i64) -> Self {
        self.items.insert(item_id.to_string(), quantity);
        if quantity > 0 {
            self.discovered_item_ids.insert(item_id.to_string());
        }
        self
    }

    pub fn count(&self, item_id: &str) -> i64 {
        self.items.get(item_id).copied().unwrap_or(0).max(0)
    }

    pub fn has(&self, item_id: &str, quantity: i64) -> bool {
        self.count(item_id) >= quantity
    }

    /// Applies a signed change and records it in `delta`. Stock never drops below zero;
    /// the recorded change is the amount actually applied.
    pub fn apply(&mut self, item_id: &str, quantity: i64, delta: &mut ItemDelta) -> i64 {
        let current = self.count(item_id);
        let next = (current + quantity).max(0);
        let applied = next - current;
        if applied == 0 {
            return 0;
        }
        self.items.insert(item_id.to_string(), next);
        if applied > 0 {
            self.discovered_item_ids.insert(item_id.to_string());
        }
        delta.add(item_id, applied);
        applied
    }

    /// Snapshot of the listed item counts.
    pub fn snapshot(&self, item_ids: &[&str]) -> BTreeMap<ItemId, i64> {
        item_ids
            .iter()
            .map(|id| (id.to_string(), self.count(id)))
            .collect()
    }
}

/// Net inventory change produced by a tick, keyed by item id.
///
/// Callers report rewards and consumption from this instead of diffing
/// inventory snapshots, since runs may start and finish several times inside
/// one offline window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDelta {
    pub changes: BTreeMap<ItemId, i64>,
}

impl ItemDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item_id: &str, quantity: i64) {
        if quantity == 0 {
            return;
        }
        let entry = self.changes.entry(item_id.to_string()).or_insert(0);
        *entry += quantity;
        if *entry == 0 {
            self.changes.remove(item_id);
        }
    }

    pub fn merge(&mut self, other: &ItemDelta) {
        for (item_id, quantity) in &other.changes {
            self.add(item_id, *quantity);
        }
    }

    pub fn get(&self, item_id: &str) -> i64 {
        self.changes.get(item_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &i64)> {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_records_delta_and_discovery() {
        let mut inv = Inventory::new();
        let mut delta = ItemDelta::new();
        assert_eq!(inv.apply("iron_ore", 3, &mut delta), 3);
        assert_eq!(inv.count("iron_ore"), 3);
        assert!(inv.discovered_item_ids.contains("iron_ore"));
        assert_eq!(delta.get("iron_ore"), 3);
    }

    #[test]
    fn test_apply_never_goes_negative() {
        let mut inv = Inventory::new().with_item("food", 2);
        let mut delta = ItemDelta::new();
        assert_eq!(inv.apply("food", -5, &mut delta), -2);
        assert_eq!(inv.count("food"), 0);
        assert_eq!(delta.get("food"), -2);
    }

    #[test]
    fn test_delta_cancels_to_empty() {
        let mut delta = ItemDelta::new();
        delta.add("food", -1);
        delta.add("food", 1);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_merge_sums_per_item() {
        let mut a = ItemDelta::new();
        a.add("gold", 30);
        let mut b = ItemDelta::new();
        b.add("gold", 25);
        b.add("food", -2);
        a.merge(&b);
        assert_eq!(a.get("gold"), 55);
        assert_eq!(a.get("food"), -2);
    }
}
