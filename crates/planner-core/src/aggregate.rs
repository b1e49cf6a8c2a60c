//! Goal-to-ingredient aggregation.

use crate::{goal_ingredients, Catalog, CatalogError, GoalRef, ItemId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Total quantity needed per item. Zero totals are never stored.
pub type Totals = BTreeMap<ItemId, u64>;

/// How far demand for crafted items is pushed down into their ingredients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Expansion {
    /// Expand crafted items directly demanded by goals, one level deep.
    #[default]
    SingleLevel,
    /// Expand through every crafted level, parents before their ingredients.
    Recursive,
}

fn add(totals: &mut Totals, id: &ItemId, quantity: u64) {
    if quantity == 0 {
        return;
    }
    let entry = totals.entry(id.clone()).or_insert(0);
    *entry = entry.saturating_add(quantity);
}

/// Sum material requirements for all `goals`.
///
/// Items in `crafting` that are craftable have their demand additionally
/// added as demand for their sub-ingredients. The crafted item itself stays
/// in the totals.
pub fn aggregate<'a, G, I>(
    goals: I,
    catalog: &Catalog,
    crafting: &BTreeSet<ItemId>,
    expansion: Expansion,
) -> Result<Totals, CatalogError>
where
    G: GoalRef + 'a + ?Sized,
    I: IntoIterator<Item = &'a G>,
{
    let mut totals = Totals::new();
    let mut n_goals = 0usize;
    for goal in goals {
        for ingr in goal_ingredients(goal, catalog)? {
            add(&mut totals, &ingr.id, ingr.quantity);
        }
        n_goals += 1;
    }

    match expansion {
        Expansion::SingleLevel => {
            let direct: Vec<(ItemId, u64)> =
                totals.iter().map(|(id, q)| (id.clone(), *q)).collect();
            for (id, needed) in direct {
                if !crafting.contains(&id) {
                    continue;
                }
                for sub in &catalog.item(&id)?.ingredients {
                    add(&mut totals, &sub.id, sub.quantity.saturating_mul(needed));
                }
            }
        }
        Expansion::Recursive => {
            for id in crafting_order(catalog, crafting)? {
                let needed = totals.get(&id).copied().unwrap_or(0);
                if needed == 0 {
                    continue;
                }
                for sub in &catalog.item(&id)?.ingredients {
                    add(&mut totals, &sub.id, sub.quantity.saturating_mul(needed));
                }
            }
        }
    }
    debug!(goals = n_goals, items = totals.len(), ?expansion, "aggregated goals");
    Ok(totals)
}

/// Crafted, craftable items ordered so every item precedes the crafted items
/// among its ingredients.
fn crafting_order(
    catalog: &Catalog,
    crafting: &BTreeSet<ItemId>,
) -> Result<Vec<ItemId>, CatalogError> {
    fn visit(
        catalog: &Catalog,
        crafting: &BTreeSet<ItemId>,
        id: &ItemId,
        path: &mut BTreeSet<ItemId>,
        done: &mut BTreeSet<ItemId>,
        post: &mut Vec<ItemId>,
    ) -> Result<(), CatalogError> {
        if done.contains(id) {
            return Ok(());
        }
        if !path.insert(id.clone()) {
            return Err(CatalogError::CraftingCycle(id.clone()));
        }
        for sub in &catalog.item(id)?.ingredients {
            if crafting.contains(&sub.id) {
                visit(catalog, crafting, &sub.id, path, done, post)?;
            }
        }
        path.remove(id);
        done.insert(id.clone());
        post.push(id.clone());
        Ok(())
    }

    let mut path = BTreeSet::new();
    let mut done = BTreeSet::new();
    let mut post = Vec::new();
    for id in crafting {
        visit(catalog, crafting, id, &mut path, &mut done, &mut post)?;
    }
    post.reverse();
    Ok(post)
}

/// Item-wise sum of two totals.
pub fn merge_sum(a: &Totals, b: &Totals) -> Totals {
    let mut out = a.clone();
    for (id, q) in b {
        add(&mut out, id, *q);
    }
    out
}
