#![deny(warnings)]

//! Catalog data pipeline: turns raw item/formula records into catalog items
//! and loads the generated catalog file.

use planner_core::{
    Catalog, CatalogError, Ingredient, Item, ItemId, Operator, CURRENCY_ITEM_ID, CURRENCY_TIER,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed catalog data: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// The generated catalog file consumed at startup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    pub operators: Vec<Operator>,
    pub items: Vec<Item>,
}

impl CatalogFile {
    pub fn into_catalog(self) -> Result<Catalog, PipelineError> {
        Ok(Catalog::new(self.operators, self.items)?)
    }
}

/// A workshop formula from the game's building data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopFormula {
    /// Currency charged per craft.
    #[serde(default)]
    pub gold_cost: Option<u64>,
    /// Units produced per craft.
    pub count: u32,
    pub costs: Vec<Ingredient>,
}

/// An item as found in the raw source data, before formulas are attached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: ItemId,
    pub name: String,
    pub tier: u8,
    #[serde(default)]
    pub formula: Option<WorkshopFormula>,
}

/// Raw pipeline input.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SourceData {
    pub operators: Vec<Operator>,
    pub items: Vec<SourceItem>,
}

/// The currency item entry.
pub fn currency_item() -> Item {
    Item {
        id: ItemId::from(CURRENCY_ITEM_ID),
        name: "LMD".to_string(),
        tier: CURRENCY_TIER,
        ingredients: vec![],
        yield_count: None,
    }
}

/// Build a catalog item. A non-zero gold cost becomes a leading currency
/// ingredient.
pub fn item_from_source(source: SourceItem) -> Item {
    let Some(formula) = source.formula else {
        return Item {
            id: source.id,
            name: source.name,
            tier: source.tier,
            ingredients: vec![],
            yield_count: None,
        };
    };
    let mut ingredients = Vec::with_capacity(formula.costs.len() + 1);
    if let Some(gold) = formula.gold_cost.filter(|g| *g > 0) {
        ingredients.push(Ingredient {
            id: ItemId::from(CURRENCY_ITEM_ID),
            quantity: gold,
        });
    }
    ingredients.extend(formula.costs);
    Item {
        id: source.id,
        name: source.name,
        tier: source.tier,
        ingredients,
        yield_count: Some(formula.count),
    }
}

/// Turn raw source data into the catalog file, adding the currency item if
/// the source lacks it.
pub fn build_catalog_file(source: SourceData) -> CatalogFile {
    let mut items: Vec<Item> = source.items.into_iter().map(item_from_source).collect();
    if !items.iter().any(|i| i.id.is_currency()) {
        items.insert(0, currency_item());
    }
    CatalogFile {
        operators: source.operators,
        items,
    }
}

pub fn parse_catalog(text: &str) -> Result<Catalog, PipelineError> {
    let file: CatalogFile = serde_json::from_str(text)?;
    file.into_catalog()
}

/// Load and validate the generated catalog file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, PipelineError> {
    let text = fs::read_to_string(path.as_ref())?;
    let catalog = parse_catalog(&text)?;
    info!(
        path = %path.as_ref().display(),
        operators = catalog.operators().count(),
        items = catalog.items().count(),
        "catalog loaded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn source(id: &str, formula: Option<WorkshopFormula>) -> SourceItem {
        SourceItem {
            id: ItemId::from(id),
            name: format!("Item {id}"),
            tier: 3,
            formula,
        }
    }

    #[test]
    fn gold_cost_becomes_leading_ingredient() {
        let item = item_from_source(source(
            "30013",
            Some(WorkshopFormula {
                gold_cost: Some(300),
                count: 1,
                costs: vec![Ingredient::new("30012", 3)],
            }),
        ));
        assert_eq!(
            item.ingredients,
            vec![Ingredient::new(CURRENCY_ITEM_ID, 300), Ingredient::new("30012", 3)]
        );
        assert_eq!(item.yield_count, Some(1));
        assert!(item.is_craftable());
    }

    #[test]
    fn zero_or_absent_gold_adds_nothing() {
        for gold in [None, Some(0)] {
            let item = item_from_source(source(
                "30013",
                Some(WorkshopFormula {
                    gold_cost: gold,
                    count: 2,
                    costs: vec![Ingredient::new("30012", 3)],
                }),
            ));
            assert_eq!(item.ingredients, vec![Ingredient::new("30012", 3)]);
        }
    }

    #[test]
    fn raw_items_have_no_ingredients() {
        let item = item_from_source(source("30012", None));
        assert!(!item.is_craftable());
        assert_eq!(item.yield_count, None);
    }

    #[test]
    fn built_catalog_validates() {
        let data: SourceData = serde_json::from_str(
            r#"{
              "operators": [{
                "id": "char_002_amiya", "name": "Amiya", "rarity": 5,
                "elite": [{"ingredients": [{"id": "4001", "quantity": 25000}, {"id": "30012", "quantity": 5}]}],
                "skills": [], "skillLevels": []
              }],
              "items": [
                {"id": "30012", "name": "Orirock Cube", "tier": 2},
                {"id": "30013", "name": "Orirock Cluster", "tier": 3,
                 "formula": {"goldCost": 200, "count": 1, "costs": [{"id": "30012", "quantity": 5}]}}
              ]
            }"#,
        )
        .unwrap();
        let file = build_catalog_file(data);
        assert!(file.items[0].id.is_currency());
        let text = serde_json::to_string(&file).unwrap();
        let catalog = parse_catalog(&text).unwrap();
        assert_eq!(catalog.item(&ItemId::from("30013")).unwrap().ingredients.len(), 2);
        assert_eq!(catalog.item(&ItemId::from(CURRENCY_ITEM_ID)).unwrap().tier, CURRENCY_TIER);
    }

    #[test]
    fn load_catalog_reports_invalid_references() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"operators": [], "items": [{"id": "a", "name": "A", "tier": 1,
                "ingredients": [{"id": "b", "quantity": 1}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            load_catalog(&path),
            Err(PipelineError::Catalog(CatalogError::UnknownItem(_)))
        ));
        assert!(matches!(
            load_catalog(dir.path().join("missing.json")),
            Err(PipelineError::Io(_))
        ));
    }

    proptest! {
        #[test]
        fn currency_leads_iff_gold_positive(gold in 0u64..10_000, n in 1usize..4) {
            let costs: Vec<Ingredient> = (0..n).map(|k| Ingredient::new(format!("3001{k}"), 1)).collect();
            let item = item_from_source(source("x", Some(WorkshopFormula { gold_cost: Some(gold), count: 1, costs })));
            prop_assert_eq!(item.ingredients[0].id.is_currency(), gold > 0);
            prop_assert_eq!(item.ingredients.len(), n + usize::from(gold > 0));
        }
    }
}
