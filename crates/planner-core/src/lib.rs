#![deny(warnings)]

//! Catalog model and goal resolution for the operator planner.
//!
//! This crate defines the read-only catalog (operators and items), the
//! stable goal-type encoding persisted by the ledgers, and the pure functions
//! that turn goals into material totals.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

pub mod aggregate;
pub mod reconcile;

pub use aggregate::{aggregate, merge_sum, Expansion, Totals};
pub use reconcile::{
    craft_plan, ingredient_usage, material_statuses, required_materials, CraftPlan,
    IngredientUse, MaterialStatus,
};

/// Id of the in-game currency item (LMD).
pub const CURRENCY_ITEM_ID: &str = "4001";
/// Display tier assigned to the currency item.
pub const CURRENCY_TIER: u8 = 4;

/// Unique identifier for an item, e.g. "30012".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Whether this is the currency item.
    pub fn is_currency(&self) -> bool {
        self.0 == CURRENCY_ITEM_ID
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for an operator, e.g. "char_002_amiya".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub String);

impl From<&str> for OperatorId {
    fn from(s: &str) -> Self {
        OperatorId(s.to_string())
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A quantity of one item, as part of a cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Item consumed.
    #[serde(alias = "itemId")]
    pub id: ItemId,
    /// Units consumed (> 0 in a valid catalog).
    pub quantity: u64,
}

impl Ingredient {
    pub fn new(id: impl Into<String>, quantity: u64) -> Self {
        Self {
            id: ItemId(id.into()),
            quantity,
        }
    }
}

/// The cost of one upgrade step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeCost {
    pub ingredients: Vec<Ingredient>,
}

/// Mastery cost table for a single skill.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Mastery 1..=3 costs, in order.
    pub masteries: Vec<UpgradeCost>,
}

/// A playable character with its upgrade cost tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: OperatorId,
    pub name: String,
    /// Rarity tier in [3, 6].
    pub rarity: u8,
    /// Elite 1 and Elite 2 promotion costs.
    #[serde(default)]
    pub elite: Vec<UpgradeCost>,
    /// Up to three skills with mastery costs.
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Skill rank 1→2 through 6→7 costs.
    #[serde(default)]
    pub skill_levels: Vec<UpgradeCost>,
}

/// A material. Items with a non-empty ingredient list are craftable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub tier: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<Ingredient>,
    /// Units produced per craft.
    #[serde(default, rename = "yield", skip_serializing_if = "Option::is_none")]
    pub yield_count: Option<u32>,
}

impl Item {
    /// Whether the item can be produced from lower-tier materials.
    pub fn is_craftable(&self) -> bool {
        !self.ingredients.is_empty()
    }
}

/// Stable goal encoding. Discriminants are persisted and must never be
/// reassigned; new variants take the next free value.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OperatorGoalType {
    Elite1 = 0,
    Elite2 = 1,
    Skill1Mastery1 = 2,
    Skill1Mastery2 = 3,
    Skill1Mastery3 = 4,
    Skill2Mastery1 = 5,
    Skill2Mastery2 = 6,
    Skill2Mastery3 = 7,
    Skill3Mastery1 = 8,
    Skill3Mastery2 = 9,
    Skill3Mastery3 = 10,
    SkillLevel1To2 = 11,
    SkillLevel2To3 = 12,
    SkillLevel3To4 = 13,
    SkillLevel4To5 = 14,
    SkillLevel5To6 = 15,
    SkillLevel6To7 = 16,
}

/// Which cost table, and which entry of it, a goal reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeStep {
    /// Index into `Operator::elite`.
    Elite(usize),
    /// Indices into `Operator::skills[skill].masteries[level]`.
    Mastery { skill: usize, level: usize },
    /// Index into `Operator::skill_levels`.
    SkillLevel(usize),
}

impl OperatorGoalType {
    /// Every variant in encoding order.
    pub const ALL: [OperatorGoalType; 17] = [
        Self::Elite1,
        Self::Elite2,
        Self::Skill1Mastery1,
        Self::Skill1Mastery2,
        Self::Skill1Mastery3,
        Self::Skill2Mastery1,
        Self::Skill2Mastery2,
        Self::Skill2Mastery3,
        Self::Skill3Mastery1,
        Self::Skill3Mastery2,
        Self::Skill3Mastery3,
        Self::SkillLevel1To2,
        Self::SkillLevel2To3,
        Self::SkillLevel3To4,
        Self::SkillLevel4To5,
        Self::SkillLevel5To6,
        Self::SkillLevel6To7,
    ];

    /// Cost table location for this goal.
    ///
    /// No wildcard arm: a new variant does not compile until mapped here.
    pub fn step(self) -> UpgradeStep {
        use OperatorGoalType::*;
        match self {
            Elite1 => UpgradeStep::Elite(0),
            Elite2 => UpgradeStep::Elite(1),
            Skill1Mastery1 => UpgradeStep::Mastery { skill: 0, level: 0 },
            Skill1Mastery2 => UpgradeStep::Mastery { skill: 0, level: 1 },
            Skill1Mastery3 => UpgradeStep::Mastery { skill: 0, level: 2 },
            Skill2Mastery1 => UpgradeStep::Mastery { skill: 1, level: 0 },
            Skill2Mastery2 => UpgradeStep::Mastery { skill: 1, level: 1 },
            Skill2Mastery3 => UpgradeStep::Mastery { skill: 1, level: 2 },
            Skill3Mastery1 => UpgradeStep::Mastery { skill: 2, level: 0 },
            Skill3Mastery2 => UpgradeStep::Mastery { skill: 2, level: 1 },
            Skill3Mastery3 => UpgradeStep::Mastery { skill: 2, level: 2 },
            SkillLevel1To2 => UpgradeStep::SkillLevel(0),
            SkillLevel2To3 => UpgradeStep::SkillLevel(1),
            SkillLevel3To4 => UpgradeStep::SkillLevel(2),
            SkillLevel4To5 => UpgradeStep::SkillLevel(3),
            SkillLevel5To6 => UpgradeStep::SkillLevel(4),
            SkillLevel6To7 => UpgradeStep::SkillLevel(5),
        }
    }

    /// Human-readable label. Labels may change; the integer may not.
    pub fn label(self) -> &'static str {
        use OperatorGoalType::*;
        match self {
            Elite1 => "Elite 1",
            Elite2 => "Elite 2",
            Skill1Mastery1 => "Skill 1 Mastery 1",
            Skill1Mastery2 => "Skill 1 Mastery 2",
            Skill1Mastery3 => "Skill 1 Mastery 3",
            Skill2Mastery1 => "Skill 2 Mastery 1",
            Skill2Mastery2 => "Skill 2 Mastery 2",
            Skill2Mastery3 => "Skill 2 Mastery 3",
            Skill3Mastery1 => "Skill 3 Mastery 1",
            Skill3Mastery2 => "Skill 3 Mastery 2",
            Skill3Mastery3 => "Skill 3 Mastery 3",
            SkillLevel1To2 => "Skill Level 1 → 2",
            SkillLevel2To3 => "Skill Level 2 → 3",
            SkillLevel3To4 => "Skill Level 3 → 4",
            SkillLevel4To5 => "Skill Level 4 → 5",
            SkillLevel5To6 => "Skill Level 5 → 6",
            SkillLevel6To7 => "Skill Level 6 → 7",
        }
    }
}

impl From<OperatorGoalType> for u8 {
    fn from(goal: OperatorGoalType) -> u8 {
        goal as u8
    }
}

impl TryFrom<u8> for OperatorGoalType {
    type Error = GoalError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        OperatorGoalType::ALL
            .iter()
            .copied()
            .find(|g| *g as u8 == value)
            .ok_or(GoalError::UnrecognizedGoalType(value))
    }
}

impl fmt::Display for OperatorGoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors decoding goal values.
#[derive(Debug, Error, PartialEq)]
pub enum GoalError {
    /// Integer outside the known goal encodings.
    #[error("unrecognized goal type: {0}")]
    UnrecognizedGoalType(u8),
}

/// Identity of a goal: one upgrade step of one operator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorGoal {
    pub operator_id: OperatorId,
    pub goal: OperatorGoalType,
}

impl OperatorGoal {
    pub fn new(operator_id: impl Into<String>, goal: OperatorGoalType) -> Self {
        Self {
            operator_id: OperatorId(operator_id.into()),
            goal,
        }
    }
}

/// Anything that names an operator goal; lets ledger entries carrying extra
/// state feed the aggregator directly.
pub trait GoalRef {
    fn operator_id(&self) -> &OperatorId;
    fn goal_type(&self) -> OperatorGoalType;
}

impl GoalRef for OperatorGoal {
    fn operator_id(&self) -> &OperatorId {
        &self.operator_id
    }
    fn goal_type(&self) -> OperatorGoalType {
        self.goal
    }
}

/// Catalog lookup and validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("operator not found: {0}")]
    UnknownOperator(OperatorId),
    #[error("item not found: {0}")]
    UnknownItem(ItemId),
    /// The operator has no cost entry for this goal.
    #[error("operator {operator} has no cost for {goal}")]
    MissingUpgradeCost {
        operator: OperatorId,
        goal: OperatorGoalType,
    },
    #[error("duplicate operator id: {0}")]
    DuplicateOperator(OperatorId),
    #[error("duplicate item id: {0}")]
    DuplicateItem(ItemId),
    /// Rarity outside [3, 6].
    #[error("operator {0} has rarity {1} outside [3, 6]")]
    RarityOutOfRange(OperatorId, u8),
    /// A cost table is longer than the goal encoding can address.
    #[error("operator {operator} has {len} {table} entries (max {max})")]
    CostTableTooLong {
        operator: OperatorId,
        table: &'static str,
        len: usize,
        max: usize,
    },
    /// An ingredient with zero quantity.
    #[error("zero-quantity ingredient {0}")]
    ZeroQuantity(ItemId),
    /// A craftable item (transitively) requires itself.
    #[error("crafting cycle through item {0}")]
    CraftingCycle(ItemId),
}

/// Read-only operator and item reference data, keyed by id.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    operators: BTreeMap<OperatorId, Operator>,
    items: BTreeMap<ItemId, Item>,
}

impl Catalog {
    /// Build and validate a catalog.
    pub fn new(operators: Vec<Operator>, items: Vec<Item>) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        for item in items {
            if catalog.items.contains_key(&item.id) {
                return Err(CatalogError::DuplicateItem(item.id));
            }
            catalog.items.insert(item.id.clone(), item);
        }
        for op in operators {
            if catalog.operators.contains_key(&op.id) {
                return Err(CatalogError::DuplicateOperator(op.id));
            }
            catalog.operators.insert(op.id.clone(), op);
        }
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    pub fn operator(&self, id: &OperatorId) -> Result<&Operator, CatalogError> {
        self.operators
            .get(id)
            .ok_or_else(|| CatalogError::UnknownOperator(id.clone()))
    }

    pub fn item(&self, id: &ItemId) -> Result<&Item, CatalogError> {
        self.items
            .get(id)
            .ok_or_else(|| CatalogError::UnknownItem(id.clone()))
    }

    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.operators.values()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }
}

/// Resolve the ordered ingredient list for one goal.
pub fn goal_ingredients<'c, G: GoalRef + ?Sized>(
    goal: &G,
    catalog: &'c Catalog,
) -> Result<&'c [Ingredient], CatalogError> {
    let op = catalog.operator(goal.operator_id())?;
    let cost = match goal.goal_type().step() {
        UpgradeStep::Elite(i) => op.elite.get(i),
        UpgradeStep::Mastery { skill, level } => {
            op.skills.get(skill).and_then(|s| s.masteries.get(level))
        }
        UpgradeStep::SkillLevel(i) => op.skill_levels.get(i),
    };
    cost.map(|c| c.ingredients.as_slice())
        .ok_or_else(|| CatalogError::MissingUpgradeCost {
            operator: op.id.clone(),
            goal: goal.goal_type(),
        })
}

fn validate_ingredients(catalog: &Catalog, ingredients: &[Ingredient]) -> Result<(), CatalogError> {
    for ingr in ingredients {
        if ingr.quantity == 0 {
            return Err(CatalogError::ZeroQuantity(ingr.id.clone()));
        }
        catalog.item(&ingr.id)?;
    }
    Ok(())
}

fn check_len(
    op: &Operator,
    table: &'static str,
    len: usize,
    max: usize,
) -> Result<(), CatalogError> {
    if len > max {
        return Err(CatalogError::CostTableTooLong {
            operator: op.id.clone(),
            table,
            len,
            max,
        });
    }
    Ok(())
}

/// Validate an operator's shape and ingredient references.
pub fn validate_operator(catalog: &Catalog, op: &Operator) -> Result<(), CatalogError> {
    if !(3..=6).contains(&op.rarity) {
        return Err(CatalogError::RarityOutOfRange(op.id.clone(), op.rarity));
    }
    check_len(op, "elite", op.elite.len(), 2)?;
    check_len(op, "skill", op.skills.len(), 3)?;
    check_len(op, "skill level", op.skill_levels.len(), 6)?;
    for cost in &op.elite {
        validate_ingredients(catalog, &cost.ingredients)?;
    }
    for skill in &op.skills {
        check_len(op, "mastery", skill.masteries.len(), 3)?;
        for cost in &skill.masteries {
            validate_ingredients(catalog, &cost.ingredients)?;
        }
    }
    for cost in &op.skill_levels {
        validate_ingredients(catalog, &cost.ingredients)?;
    }
    Ok(())
}

/// Validate the whole catalog, including that no craftable item depends on
/// itself through its ingredients.
pub fn validate_catalog(catalog: &Catalog) -> Result<(), CatalogError> {
    for item in catalog.items() {
        validate_ingredients(catalog, &item.ingredients)?;
    }
    for op in catalog.operators() {
        validate_operator(catalog, op)?;
    }

    let mut done: BTreeSet<&ItemId> = BTreeSet::new();
    for item in catalog.items() {
        let mut path: BTreeSet<&ItemId> = BTreeSet::new();
        check_acyclic(catalog, &item.id, &mut path, &mut done)?;
    }
    Ok(())
}

fn check_acyclic<'c>(
    catalog: &'c Catalog,
    id: &'c ItemId,
    path: &mut BTreeSet<&'c ItemId>,
    done: &mut BTreeSet<&'c ItemId>,
) -> Result<(), CatalogError> {
    if done.contains(id) {
        return Ok(());
    }
    if !path.insert(id) {
        return Err(CatalogError::CraftingCycle(id.clone()));
    }
    for ingr in &catalog.item(id)?.ingredients {
        check_acyclic(catalog, &ingr.id, path, done)?;
    }
    path.remove(id);
    done.insert(id);
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn item(id: &str, tier: u8, ingredients: Vec<Ingredient>) -> Item {
        Item {
            id: ItemId::from(id),
            name: format!("Item {id}"),
            tier,
            yield_count: if ingredients.is_empty() { None } else { Some(1) },
            ingredients,
        }
    }

    pub fn cost(ingredients: Vec<Ingredient>) -> UpgradeCost {
        UpgradeCost { ingredients }
    }

    /// Amiya with distinct single-item costs per table so tests can tell
    /// which entry was resolved.
    pub fn amiya() -> Operator {
        Operator {
            id: OperatorId::from("char_002_amiya"),
            name: "Amiya".to_string(),
            rarity: 5,
            elite: vec![
                cost(vec![Ingredient::new(CURRENCY_ITEM_ID, 25000), Ingredient::new("30012", 5)]),
                cost(vec![Ingredient::new("30013", 2)]),
            ],
            skills: (0..3)
                .map(|s| Skill {
                    masteries: (0..3)
                        .map(|m| cost(vec![Ingredient::new("30011", 10 * (s + 1) + m + 1)]))
                        .collect(),
                })
                .collect(),
            skill_levels: (0..6)
                .map(|l| cost(vec![Ingredient::new("30012", 100 + l)]))
                .collect(),
        }
    }

    pub fn catalog() -> Catalog {
        Catalog::new(
            vec![amiya()],
            vec![
                item(CURRENCY_ITEM_ID, CURRENCY_TIER, vec![]),
                item("30011", 1, vec![]),
                item("30012", 2, vec![]),
                item("30013", 3, vec![Ingredient::new("30012", 3)]),
                item(
                    "30014",
                    4,
                    vec![Ingredient::new(CURRENCY_ITEM_ID, 300), Ingredient::new("30013", 4), Ingredient::new("30011", 1)],
                ),
            ],
        )
        .unwrap()
    }
}
