//! Owned material quantities and the crafting toggle set.

use planner_core::{Ingredient, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The user's inventory. Absent quantities read as 0; quantities never go
/// below 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DepotLedger {
    #[serde(default)]
    quantities: BTreeMap<ItemId, u64>,
    #[serde(default)]
    items_being_crafted: BTreeSet<ItemId>,
}

impl DepotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantity(&self, id: &ItemId) -> u64 {
        self.quantities.get(id).copied().unwrap_or(0)
    }

    pub fn quantities(&self) -> &BTreeMap<ItemId, u64> {
        &self.quantities
    }

    pub fn is_crafting(&self, id: &ItemId) -> bool {
        self.items_being_crafted.contains(id)
    }

    pub fn items_being_crafted(&self) -> &BTreeSet<ItemId> {
        &self.items_being_crafted
    }

    pub fn increment(&mut self, id: &ItemId) {
        let q = self.quantities.entry(id.clone()).or_insert(0);
        *q = q.saturating_add(1);
    }

    pub fn decrement(&mut self, id: &ItemId) {
        self.debit(id, 1);
    }

    /// Absolute set; negative input is clamped to 0.
    pub fn set_quantity(&mut self, id: &ItemId, quantity: i64) {
        let clamped = u64::try_from(quantity).unwrap_or(0);
        self.quantities.insert(id.clone(), clamped);
    }

    /// Subtract `amount`, clamped at 0.
    pub fn debit(&mut self, id: &ItemId, amount: u64) {
        let q = self.quantities.entry(id.clone()).or_insert(0);
        *q = q.saturating_sub(amount);
    }

    /// Debit every listed ingredient.
    pub fn debit_all(&mut self, ingredients: &[Ingredient]) {
        for ingr in ingredients {
            self.debit(&ingr.id, ingr.quantity);
        }
    }

    /// Flip crafting membership. Returns the new membership.
    pub fn toggle_crafting(&mut self, id: &ItemId) -> bool {
        if self.items_being_crafted.remove(id) {
            false
        } else {
            self.items_being_crafted.insert(id.clone());
            true
        }
    }

    /// Consume one craft's ingredients and credit one unit of `id`.
    pub fn craft_once(&mut self, id: &ItemId, ingredients: &[Ingredient]) {
        self.debit_all(ingredients);
        self.increment(id);
    }

    /// Clear quantities and crafting flags.
    pub fn reset(&mut self) {
        self.quantities.clear();
        self.items_being_crafted.clear();
    }
}
