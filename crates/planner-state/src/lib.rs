#![deny(warnings)]

//! Goal and depot ledgers behind a single dispatch channel.
//!
//! All mutations go through [`Planner::dispatch`], which takes `&mut self`:
//! actions apply one at a time in call order and every compound action
//! (crafting, completing a goal, remote replacement) is observed whole.

use planner_core::{
    aggregate, goal_ingredients, Catalog, CatalogError, Expansion, Ingredient, ItemId,
    OperatorGoal, OperatorGoalType, OperatorId, Totals,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod depot;
pub mod goals;
pub mod sync;

pub use depot::DepotLedger;
pub use goals::{GoalLedger, GoalsState, OperatorGoalState};
pub use sync::{Reconciliation, RemoteProfile, SyncState, STATE_VERSION};

/// Errors raised by ledger operations.
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Two ledger entries share an identity.
    #[error("duplicate goal {goal} for operator {operator}")]
    DuplicateGoal {
        operator: OperatorId,
        goal: OperatorGoalType,
    },
    #[error("item {0} is not craftable")]
    NotCraftable(ItemId),
    #[error("invalid remote payload: {0}")]
    InvalidRemotePayload(String),
}

/// Every state mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    AddGoals(Vec<OperatorGoal>),
    DeleteGoal(OperatorGoal),
    /// Debit `ingredients` and remove `goal`. The ingredient list is the
    /// caller's snapshot taken before dispatch.
    CompleteGoal {
        goal: OperatorGoal,
        ingredients: Vec<Ingredient>,
    },
    ToggleFocus(OperatorGoal),
    ReorderGoal {
        old_index: usize,
        new_index: usize,
    },
    ClearGoals,
    ReplaceGoalsFromRemote(GoalLedger),
    IncrementItemQuantity(ItemId),
    DecrementItemQuantity(ItemId),
    SetItemQuantity {
        item_id: ItemId,
        quantity: i64,
    },
    ToggleItemCrafting(ItemId),
    CraftItemOnce {
        item_id: ItemId,
        ingredients: Vec<Ingredient>,
    },
    ResetDepot,
    ReplaceDepotFromRemote(DepotLedger),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddGoals(_) => "goals/addGoals",
            Action::DeleteGoal(_) => "goals/deleteGoal",
            Action::CompleteGoal { .. } => "goals/completeGoal",
            Action::ToggleFocus(_) => "goals/toggleFocus",
            Action::ReorderGoal { .. } => "goals/reorderGoal",
            Action::ClearGoals => "goals/clearGoals",
            Action::ReplaceGoalsFromRemote(_) => "goals/replaceGoalsFromRemote",
            Action::IncrementItemQuantity(_) => "depot/incrementItemQuantity",
            Action::DecrementItemQuantity(_) => "depot/decrementItemQuantity",
            Action::SetItemQuantity { .. } => "depot/setItemQuantity",
            Action::ToggleItemCrafting(_) => "depot/toggleItemCrafting",
            Action::CraftItemOnce { .. } => "depot/craftItemOnce",
            Action::ResetDepot => "depot/resetAll",
            Action::ReplaceDepotFromRemote(_) => "depot/replaceDepotFromRemote",
        }
    }

    /// Whether the action came from the remote copy rather than the user.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Action::ReplaceGoalsFromRemote(_) | Action::ReplaceDepotFromRemote(_)
        )
    }
}

/// The planner store: catalog plus both ledgers.
#[derive(Clone, Debug)]
pub struct Planner {
    catalog: Arc<Catalog>,
    goals: GoalLedger,
    depot: DepotLedger,
    sync: SyncState,
}

impl Planner {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_state(catalog, GoalLedger::new(), DepotLedger::new())
    }

    pub fn with_state(catalog: Arc<Catalog>, goals: GoalLedger, depot: DepotLedger) -> Self {
        Self {
            catalog,
            goals,
            depot,
            sync: SyncState::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_arc(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    pub fn goals(&self) -> &GoalLedger {
        &self.goals
    }

    pub fn depot(&self) -> &DepotLedger {
        &self.depot
    }

    pub fn sync(&self) -> &SyncState {
        &self.sync
    }

    pub fn mark_clean(&mut self) {
        self.sync.mark_clean();
    }

    /// Apply one action. Catalog references are checked before anything is
    /// mutated, so a failed dispatch leaves state unchanged.
    pub fn dispatch(&mut self, action: Action) -> Result<(), StateError> {
        self.check(&action)?;
        debug!(action = action.name(), "dispatch");
        if !action.is_remote() {
            self.sync.mark_dirty();
        }
        match action {
            Action::AddGoals(goals) => {
                self.goals.add_goals(goals);
            }
            Action::DeleteGoal(goal) => {
                self.goals.delete_goal(&goal);
            }
            Action::CompleteGoal { goal, ingredients } => {
                if self.goals.contains(&goal) {
                    self.depot.debit_all(&ingredients);
                    self.goals.delete_goal(&goal);
                }
            }
            Action::ToggleFocus(goal) => {
                self.goals.toggle_focus(&goal);
            }
            Action::ReorderGoal {
                old_index,
                new_index,
            } => {
                self.goals.reorder_goal(old_index, new_index);
            }
            Action::ClearGoals => self.goals.clear(),
            Action::ReplaceGoalsFromRemote(goals) => self.goals = goals,
            Action::IncrementItemQuantity(id) => self.depot.increment(&id),
            Action::DecrementItemQuantity(id) => self.depot.decrement(&id),
            Action::SetItemQuantity { item_id, quantity } => {
                self.depot.set_quantity(&item_id, quantity)
            }
            Action::ToggleItemCrafting(id) => {
                self.depot.toggle_crafting(&id);
            }
            Action::CraftItemOnce {
                item_id,
                ingredients,
            } => self.depot.craft_once(&item_id, &ingredients),
            Action::ResetDepot => self.depot.reset(),
            Action::ReplaceDepotFromRemote(depot) => self.depot = depot,
        }
        Ok(())
    }

    fn check(&self, action: &Action) -> Result<(), StateError> {
        let catalog = &self.catalog;
        let check_items = |ingredients: &[Ingredient]| -> Result<(), CatalogError> {
            for ingr in ingredients {
                catalog.item(&ingr.id)?;
            }
            Ok(())
        };
        match action {
            Action::AddGoals(goals) => {
                for g in goals {
                    goal_ingredients(g, catalog)?;
                }
            }
            Action::CompleteGoal { ingredients, .. } => check_items(ingredients)?,
            Action::ReplaceGoalsFromRemote(goals) => {
                for g in goals.iter() {
                    goal_ingredients(g, catalog)?;
                }
            }
            Action::IncrementItemQuantity(id)
            | Action::DecrementItemQuantity(id)
            | Action::ToggleItemCrafting(id)
            | Action::SetItemQuantity { item_id: id, .. } => {
                catalog.item(id)?;
            }
            Action::CraftItemOnce {
                item_id,
                ingredients,
            } => {
                catalog.item(item_id)?;
                check_items(ingredients)?;
            }
            Action::ReplaceDepotFromRemote(depot) => {
                for id in depot.quantities().keys().chain(depot.items_being_crafted()) {
                    catalog.item(id)?;
                }
            }
            Action::DeleteGoal(_)
            | Action::ToggleFocus(_)
            | Action::ReorderGoal { .. }
            | Action::ClearGoals
            | Action::ResetDepot => {}
        }
        Ok(())
    }

    /// Material totals for the whole goal ledger.
    pub fn needed(&self, expansion: Expansion) -> Result<Totals, StateError> {
        Ok(aggregate(
            self.goals.iter(),
            &self.catalog,
            self.depot.items_being_crafted(),
            expansion,
        )?)
    }

    /// Resolve `goal`'s cost, then debit it and remove the goal in one
    /// dispatch. Returns whether the goal was present.
    pub fn complete_goal(&mut self, goal: &OperatorGoal) -> Result<bool, StateError> {
        if !self.goals.contains(goal) {
            return Ok(false);
        }
        let ingredients = goal_ingredients(goal, &self.catalog)?.to_vec();
        self.dispatch(Action::CompleteGoal {
            goal: goal.clone(),
            ingredients,
        })?;
        Ok(true)
    }

    /// Craft one unit of `item_id` using its catalog recipe.
    pub fn craft_item(&mut self, item_id: &ItemId) -> Result<(), StateError> {
        let item = self.catalog.item(item_id)?;
        if !item.is_craftable() {
            return Err(StateError::NotCraftable(item_id.clone()));
        }
        let ingredients = item.ingredients.clone();
        self.dispatch(Action::CraftItemOnce {
            item_id: item_id.clone(),
            ingredients,
        })
    }

    /// Payload to mirror to the remote profile.
    pub fn remote_payload(&self) -> RemoteProfile {
        RemoteProfile {
            goals: self.goals.clone(),
            depot: self.depot.clone(),
            version: STATE_VERSION,
        }
    }

    /// Reconcile with a freshly fetched remote profile: a remote at least as
    /// new as local replaces both ledgers, otherwise local wins and is marked
    /// for upload.
    pub fn apply_remote(&mut self, profile: RemoteProfile) -> Result<Reconciliation, StateError> {
        if profile.version < STATE_VERSION {
            warn!(
                remote = profile.version,
                local = STATE_VERSION,
                "remote profile is older than local state; keeping local"
            );
            self.sync.mark_dirty();
            return Ok(Reconciliation::KeptLocal);
        }
        let goals = Action::ReplaceGoalsFromRemote(profile.goals);
        let depot = Action::ReplaceDepotFromRemote(profile.depot);
        self.check(&goals)?;
        self.check(&depot)?;
        self.dispatch(goals)?;
        self.dispatch(depot)?;
        info!(
            remote = profile.version,
            goals = self.goals.len(),
            "accepted remote profile"
        );
        Ok(Reconciliation::AcceptedRemote)
    }
}
