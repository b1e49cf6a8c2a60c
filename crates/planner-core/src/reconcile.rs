//! Owned-versus-needed views over aggregated totals.

use crate::{Catalog, CatalogError, ItemId, Totals};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Progress on one required material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStatus {
    pub item_id: ItemId,
    pub needed: u64,
    pub owned: u64,
    pub complete: bool,
}

/// One crafted item that consumes a given ingredient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngredientUse {
    /// The crafted item.
    pub crafted: ItemId,
    /// Units of the ingredient per craft.
    pub quantity: u64,
}

/// Result of simulating crafts from owned stock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CraftPlan {
    /// Crafts possible per crafted item.
    pub craftable: BTreeMap<ItemId, u64>,
    /// Totals after crediting the crafted output.
    pub remaining_needed: Totals,
}

fn owned_of(owned: &BTreeMap<ItemId, u64>, id: &ItemId) -> u64 {
    owned.get(id).copied().unwrap_or(0)
}

/// Needed, owned and completion for every item in `needed`.
pub fn material_statuses(needed: &Totals, owned: &BTreeMap<ItemId, u64>) -> Vec<MaterialStatus> {
    needed
        .iter()
        .map(|(id, &n)| {
            let o = owned_of(owned, id);
            MaterialStatus {
                item_id: id.clone(),
                needed: n,
                owned: o,
                complete: o >= n,
            }
        })
        .collect()
}

/// Statuses without the currency item, incomplete first, then highest tier,
/// then by name.
pub fn required_materials(
    needed: &Totals,
    owned: &BTreeMap<ItemId, u64>,
    catalog: &Catalog,
) -> Result<Vec<MaterialStatus>, CatalogError> {
    let mut keyed = Vec::new();
    for status in material_statuses(needed, owned) {
        if status.item_id.is_currency() {
            continue;
        }
        let item = catalog.item(&status.item_id)?;
        keyed.push((status.complete, std::cmp::Reverse(item.tier), item.name.clone(), status));
    }
    keyed.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));
    Ok(keyed.into_iter().map(|(_, _, _, s)| s).collect())
}

/// For each ingredient, the crafted items in `needed` that consume it.
pub fn ingredient_usage(
    needed: &Totals,
    crafting: &BTreeSet<ItemId>,
    catalog: &Catalog,
) -> Result<BTreeMap<ItemId, Vec<IngredientUse>>, CatalogError> {
    let mut usage: BTreeMap<ItemId, Vec<IngredientUse>> = BTreeMap::new();
    for id in crafting.iter().filter(|id| needed.contains_key(*id)) {
        for ingr in &catalog.item(id)?.ingredients {
            usage.entry(ingr.id.clone()).or_default().push(IngredientUse {
                crafted: id.clone(),
                quantity: ingr.quantity,
            });
        }
    }
    Ok(usage)
}

/// Simulate crafting needed items from owned stock.
///
/// Crafted items are processed lowest tier first so crafted intermediates
/// become available to higher tiers. Currency is not a limiting ingredient.
pub fn craft_plan(
    needed: &Totals,
    owned: &BTreeMap<ItemId, u64>,
    crafting: &BTreeSet<ItemId>,
    catalog: &Catalog,
) -> Result<CraftPlan, CatalogError> {
    let mut stock = owned.clone();
    let mut remaining = needed.clone();
    let mut craftable = BTreeMap::new();

    let mut order = Vec::new();
    for id in crafting {
        let item = catalog.item(id)?;
        if item.is_craftable() && needed.get(id).copied().unwrap_or(0) > 0 {
            order.push(item);
        }
    }
    order.sort_by(|a, b| (a.tier, &a.id).cmp(&(b.tier, &b.id)));

    for item in order {
        let ingredients: Vec<_> = item
            .ingredients
            .iter()
            .filter(|i| !i.id.is_currency())
            .collect();
        let still_needed = remaining.get(&item.id).copied().unwrap_or(0);
        let count = ingredients
            .iter()
            .map(|i| owned_of(&stock, &i.id) / i.quantity.max(1))
            .min()
            .unwrap_or(0)
            .min(still_needed);
        if count == 0 {
            continue;
        }
        for ingr in &ingredients {
            let have = stock.entry(ingr.id.clone()).or_insert(0);
            *have = have.saturating_sub(ingr.quantity.saturating_mul(count));
        }
        let made = stock.entry(item.id.clone()).or_insert(0);
        *made = made.saturating_add(count);
        let left = still_needed - count;
        if left == 0 {
            remaining.remove(&item.id);
        } else {
            remaining.insert(item.id.clone(), left);
        }
        craftable.insert(item.id.clone(), count);
    }

    Ok(CraftPlan {
        craftable,
        remaining_needed: remaining,
    })
}
